use super::{
    errors::{panic_message, SpawnError},
    handle::UnitHandle,
    model::{ActivityGauge, PoolCounters},
    pool::Isolation,
    result::{ResultStore, SpawnResult, TaskIndex},
    task::Callable,
};
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use tokio::sync::Semaphore;
use tracing::{debug, warn};


/// Ресурсы батча, общие для всех его задач
pub(crate) struct BatchShared<T> {
    pub(crate) limiter: Arc<Semaphore>,
    pub(crate) store: Arc<ResultStore<T>>,
    pub(crate) gauge: Arc<ActivityGauge>,
    pub(crate) counters: Arc<PoolCounters>,
    pub(crate) isolation: Isolation,
}

impl<T> Clone for BatchShared<T> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            store: self.store.clone(),
            gauge: self.gauge.clone(),
            counters: self.counters.clone(),
            isolation: self.isolation,
        }
    }
}


/// Обертка над исполняемой функцией для одной задачи.
///
/// Берет слот семафора, вызывает функцию, пишет результат в хранилище по своему номеру
/// и освобождает слот. Permit освобождается на любом пути выхода, в том числе при панике.
pub(crate) struct ExecutionUnit<C, A>
where
    C: Callable<A>,
{
    index: TaskIndex,
    callable: Arc<C>,
    arg: Option<A>,
    shared: BatchShared<C::Output>,
}

impl<C, A> ExecutionUnit<C, A>
where
    C: Callable<A>,
    A: Send + 'static,
{
    pub(crate) fn new
    (
        index: TaskIndex,
        callable: Arc<C>,
        arg: Option<A>,
        shared: BatchShared<C::Output>,
    ) -> Self {
        Self {
            index,
            callable,
            arg,
            shared,
        }
    }

    pub(crate) fn launch(self) -> UnitHandle {
        let index = self.index;
        UnitHandle::new(index, tokio::spawn(self.run()))
    }

    async fn run(self) {
        let Self { index, callable, arg, shared } = self;

        let permit = match shared.limiter.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                warn!(index, "limiter closed before unit could run");
                shared.store.record(index, Err(SpawnError::SemaphoreClosed));
                return;
            }
        };

        debug!(index, "unit acquired slot");
        let outcome = invoke(callable, arg, &shared).await;

        if let Err(e) = &outcome {
            warn!(index, error = %e, "unit failed");
        }
        shared.store.record(index, outcome);

        drop(permit);
        debug!(index, "unit released slot");
    }
}


async fn invoke<C, A>(
    callable: Arc<C>,
    arg: Option<A>,
    shared: &BatchShared<C::Output>,
) -> SpawnResult<C::Output>
where
    C: Callable<A>,
    A: Send + 'static,
{
    let gauge = shared.gauge.clone();
    let counters = shared.counters.clone();

    let call = move || {
        let _batch_active = gauge.enter();
        let _pool_active = counters.active.enter();
        catch_unwind(AssertUnwindSafe(|| callable.call(arg)))
            .unwrap_or_else(|payload| Err(SpawnError::Panic(panic_message(&*payload))))
    };

    match shared.isolation {
        Isolation::BlockingThread => tokio::task::spawn_blocking(call)
            .await
            .unwrap_or_else(|join_err| Err(SpawnError::from_join(join_err))),
        Isolation::InlineTask => call(),
    }
}
