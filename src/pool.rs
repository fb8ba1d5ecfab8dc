use super::{
    errors::ConfigError,
    handle::{join_units, UnitHandle},
    model::{ActivityGauge, BatchState, PoolCounters, PoolMetrics},
    result::{BatchResult, ResultStore},
    task::{Callable, TaskBatch},
    unit::{BatchShared, ExecutionUnit},
};
use std::{
    env::VarError,
    str::FromStr,
    sync::{
        atomic::Ordering,
        Arc,
    },
    time::Instant,
};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};


pub const DEFAULT_CONCURRENCY_LIMIT: usize = 3;

pub const CONCURRENCY_ENV: &str = "PARALLEL_WORKER_CONCURRENCY";
pub const ISOLATION_ENV: &str = "PARALLEL_WORKER_ISOLATION";


/// Где исполняется вызов функции
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Isolation {
    /// Отдельный поток из blocking-пула tokio. Подходит для CPU-bound функций.
    #[default]
    BlockingThread,
    /// Прямо в async-задаче. Функция не должна надолго блокировать поток.
    InlineTask,
}

impl FromStr for Isolation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" | "blocking_thread" | "thread" => Ok(Isolation::BlockingThread),
            "inline" | "inline_task" | "task" => Ok(Isolation::InlineTask),
            other => Err(ConfigError::InvalidIsolation(other.to_string())),
        }
    }
}


/// Конфигурация пула
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub concurrency_limit: usize,
    pub isolation: Isolation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            isolation: Isolation::BlockingThread,
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        Self {
            concurrency_limit: num_cpus::get(),
            isolation: Isolation::BlockingThread,
        }
    }

    pub fn io_bound() -> Self {
        Self {
            concurrency_limit: num_cpus::get() * 2,
            isolation: Isolation::BlockingThread,
        }
    }

    /// Значения по умолчанию, переопределенные переменными окружения
    /// `PARALLEL_WORKER_CONCURRENCY` и `PARALLEL_WORKER_ISOLATION`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = env_value(CONCURRENCY_ENV)? {
            config.concurrency_limit = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnvValue {
                    var: CONCURRENCY_ENV,
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = env_value(ISOLATION_ENV)? {
            config.isolation = raw.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::InvalidConcurrencyLimit(self.concurrency_limit));
        }
        if self.concurrency_limit > Semaphore::MAX_PERMITS {
            return Err(ConfigError::ConcurrencyLimitTooLarge {
                limit: self.concurrency_limit,
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(())
    }
}


/// Значение переменной окружения; не-UTF-8 значение считается ошибкой, а не отсутствием
fn env_value(var: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => Ok(Some(raw)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(ConfigError::InvalidEnvValue {
            var,
            value: raw.to_string_lossy().into_owned(),
        }),
    }
}


/// Отвечает за распараллеливание неконкурирующих задач.
///
/// Например, есть 1000 задач, пул создан с `concurrency_limit = 5`.
/// Одновременно выполняется не более 5 задач, остальные ждут слота семафора.
/// На выходе отображение {номер_задачи: результат_выполнения_задачи}.
#[derive(Clone)]
pub struct WorkerPool {
    config: Config,
    counters: Arc<PoolCounters>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            config: Config::default(),
            counters: Arc::new(PoolCounters::default()),
        }
    }
}

impl WorkerPool {
    pub fn new(concurrency_limit: usize) -> Result<Self, ConfigError> {
        let config = Config {
            concurrency_limit,
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            counters: Arc::new(PoolCounters::default()),
        })
    }

    #[inline]
    pub fn concurrency_limit(&self) -> usize {
        self.config.concurrency_limit
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        self.counters.snapshot()
    }

    /// Исполняет функцию над каждым элементом списка задач.
    ///
    /// Если список пуст или не задан, функция исполняется без аргументов
    /// столько раз, сколько слотов у пула. Возвращает управление только после
    /// завершения всех задач; ошибки отдельных задач лежат в результате, а не
    /// прерывают батч.
    pub async fn start<C, A>(&self, callable: C, tasks: impl Into<TaskBatch<A>>) -> BatchResult<C::Output>
    where
        C: Callable<A>,
        A: Send + 'static,
    {
        let limit = self.config.concurrency_limit;
        let tasks = tasks.into();
        let synthesized = tasks.is_empty();
        let tasks = tasks.or_synthesize(limit).into_inner();
        let batch_size = tasks.len();
        let batch_id = self.counters.batches_started.fetch_add(1, Ordering::Relaxed) + 1;

        info!(batch_id, batch_size, limit, synthesized, "batch started");
        let started_at = Instant::now();
        let mut state = BatchState::Idle;

        let shared = BatchShared {
            limiter: Arc::new(Semaphore::new(limit)),
            store: Arc::new(ResultStore::new(batch_size)),
            gauge: Arc::new(ActivityGauge::new()),
            counters: self.counters.clone(),
            isolation: self.config.isolation,
        };
        let callable = Arc::new(callable);

        transition(batch_id, &mut state, BatchState::Launching);
        let handles: Vec<UnitHandle> = tasks
            .into_iter()
            .enumerate()
            .map(|(index, arg)| {
                ExecutionUnit::new(index, callable.clone(), arg, shared.clone()).launch()
            })
            .collect();
        self.counters.total_spawned.fetch_add(batch_size, Ordering::Relaxed);

        transition(batch_id, &mut state, BatchState::Running);
        // Новых задач больше не будет, только ждем завершения запущенных
        transition(batch_id, &mut state, BatchState::Draining);
        let abnormal = join_units(handles, &*shared.store).await;
        if abnormal > 0 {
            warn!(batch_id, abnormal, "some units terminated abnormally");
        }

        transition(batch_id, &mut state, BatchState::Done);
        let result = shared.store.finalize(started_at.elapsed(), shared.gauge.peak());
        let stats = result.stats();

        self.counters.completed.fetch_add(stats.completed, Ordering::Relaxed);
        self.counters.failed.fetch_add(stats.failed, Ordering::Relaxed);
        self.counters.batches_completed.fetch_add(1, Ordering::Relaxed);

        info!(
            batch_id,
            completed = stats.completed,
            failed = stats.failed,
            peak_concurrency = stats.peak_concurrency,
            elapsed = ?stats.elapsed,
            "batch finished"
        );
        result
    }
}


fn transition(batch_id: usize, state: &mut BatchState, to: BatchState) {
    let from = *state;
    debug_assert_eq!(from.next(), Some(to), "illegal batch state transition");
    debug!(batch_id, from = ?from, to = ?to, "batch state");
    *state = to;
}
