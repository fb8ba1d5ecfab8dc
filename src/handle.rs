use super::{
    errors::SpawnError,
    result::{ResultStore, SpawnResult, TaskIndex},
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;
use tracing::warn;


/// Handle на запущенную задачу батча, знает номер своей задачи
pub struct UnitHandle {
    index: TaskIndex,
    inner: JoinHandle<()>,
}

impl UnitHandle {

    pub fn new
    (
        index: TaskIndex,
        inner: JoinHandle<()>,
    ) -> Self {
        Self {
            index,
            inner
        }
    }
}

impl Future for UnitHandle {
    type Output = (TaskIndex, SpawnResult<()>);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll(cx) {
            Poll::Ready(res) => Poll::Ready((this.index, res.map_err(SpawnError::from_join))),
            Poll::Pending => Poll::Pending,
        }
    }
}


/// Ждет завершения всех задач батча в порядке их завершения.
///
/// Если задача завершилась аварийно (паника вне обертки, abort), ошибка
/// записывается в хранилище по ее номеру. Возвращает число таких задач.
pub async fn join_units<T, I>(handles: I, store: &ResultStore<T>) -> usize
where
    I: IntoIterator<Item = UnitHandle>,
{
    let mut pending: FuturesUnordered<UnitHandle> = handles.into_iter().collect();
    let mut abnormal = 0;

    while let Some((index, outcome)) = pending.next().await {
        if let Err(e) = outcome {
            warn!(index, error = %e, "unit terminated abnormally");
            store.record(index, Err(e));
            abnormal += 1;
        }
    }
    abnormal
}
