//! Пул для параллельного выполнения неконкурирующих задач
//!
//! # Features
//! - Ограничение числа одновременно выполняемых задач (семафор на батч)
//! - Изоляция паник: падение одной задачи не портит результаты других
//! - Результат в виде отображения {номер_задачи: результат}
//! - Запуск без списка задач: функция исполняется по числу слотов
//! - Метрики пула и статистика по каждому батчу

pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod result;
pub mod task;
mod unit;

pub use errors::{ConfigError, SpawnError};
pub use pool::{Config, Isolation, WorkerPool};
pub use result::{BatchResult, BatchStats, ResultStore, SpawnResult, TaskIndex};
pub use task::{fallible, nullary, optional, unary, Callable, TaskBatch};
