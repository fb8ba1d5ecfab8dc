use super::errors::SpawnError;
use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use crossbeam::queue::SegQueue;
use tracing::warn;


pub type SpawnResult<T> = Result<T, SpawnError>;

/// Номер задачи: позиция в списке задач
pub type TaskIndex = usize;


/// Общее хранилище результатов батча.
///
/// Задачи пишут в него конкурентно, каждая ровно один раз и в свой ключ.
/// Порядок записей соответствует порядку завершения задач.
pub struct ResultStore<T> {
    entries: SegQueue<(TaskIndex, SpawnResult<T>)>,
    written: Box<[AtomicBool]>,
}

impl<T> ResultStore<T> {
    pub fn new(batch_size: usize) -> Self {
        Self {
            entries: SegQueue::new(),
            written: (0..batch_size).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.written.len()
    }

    /// Записывает результат задачи. Повторная запись по тому же номеру отбрасывается.
    pub fn record(&self, index: TaskIndex, outcome: SpawnResult<T>) -> bool {
        let Some(slot) = self.written.get(index) else {
            warn!(index, batch_size = self.batch_size(), "result for unknown task index dropped");
            return false;
        };
        if slot.swap(true, Ordering::AcqRel) {
            warn!(index, "duplicate result dropped");
            return false;
        }
        self.entries.push((index, outcome));
        true
    }

    pub fn is_recorded(&self, index: TaskIndex) -> bool {
        self.written
            .get(index)
            .is_some_and(|slot| slot.load(Ordering::Acquire))
    }

    /// Забирает все записи. Задачи, не оставившие результата, помечаются `SpawnError::Lost`.
    /// Вызывать только после завершения всех задач батча.
    pub fn finalize(&self, elapsed: Duration, peak_concurrency: usize) -> BatchResult<T> {
        let batch_size = self.batch_size();
        let mut values = Vec::with_capacity(batch_size);
        let mut failures = BTreeMap::new();

        while let Some((index, outcome)) = self.entries.pop() {
            match outcome {
                Ok(value) => values.push((index, value)),
                Err(e) => {
                    failures.insert(index, e);
                }
            }
        }

        for index in 0..batch_size {
            if !self.is_recorded(index) {
                warn!(index, "unit finished without a result");
                failures.insert(index, SpawnError::Lost);
            }
        }

        let stats = BatchStats {
            batch_size,
            completed: values.len(),
            failed: failures.len(),
            peak_concurrency,
            elapsed,
        };
        BatchResult::new(values, failures, stats)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub batch_size: usize,
    pub completed: usize,
    pub failed: usize,
    pub peak_concurrency: usize,
    pub elapsed: Duration,
}


/// Результат батча вида {номер_задачи: результат_выполнения_задачи}.
///
/// Успешные результаты идут в порядке завершения задач, не в порядке номеров.
/// Упавшие задачи в это отображение не попадают и доступны через [`BatchResult::failures`].
#[derive(Debug, Clone)]
pub struct BatchResult<T> {
    values: Vec<(TaskIndex, T)>,
    positions: HashMap<TaskIndex, usize>,
    failures: BTreeMap<TaskIndex, SpawnError>,
    stats: BatchStats,
}

impl<T> BatchResult<T> {
    fn new(
        values: Vec<(TaskIndex, T)>,
        failures: BTreeMap<TaskIndex, SpawnError>,
        stats: BatchStats,
    ) -> Self {
        let positions = values
            .iter()
            .enumerate()
            .map(|(pos, (index, _))| (*index, pos))
            .collect();
        Self { values, positions, failures, stats }
    }

    #[inline]
    pub fn get(&self, index: TaskIndex) -> Option<&T> {
        self.positions.get(&index).map(|&pos| &self.values[pos].1)
    }

    #[inline]
    pub fn contains_key(&self, index: TaskIndex) -> bool {
        self.positions.contains_key(&index)
    }

    /// Число успешных результатов
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.stats.batch_size
    }

    /// Все задачи батча завершились успешно
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.values.len() == self.stats.batch_size
    }

    pub fn keys(&self) -> impl Iterator<Item = TaskIndex> + '_ {
        self.values.iter().map(|(index, _)| *index)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.values.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskIndex, &T)> + '_ {
        self.values.iter().map(|(index, value)| (*index, value))
    }

    pub fn failures(&self) -> &BTreeMap<TaskIndex, SpawnError> {
        &self.failures
    }

    pub fn failure(&self, index: TaskIndex) -> Option<&SpawnError> {
        self.failures.get(&index)
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// Результаты, упорядоченные по номеру задачи
    pub fn into_map(self) -> BTreeMap<TaskIndex, T> {
        self.values.into_iter().collect()
    }
}

impl<T> IntoIterator for BatchResult<T> {
    type Item = (TaskIndex, T);
    type IntoIter = std::vec::IntoIter<(TaskIndex, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
