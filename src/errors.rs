use thiserror::Error;

/// Ошибка выполнения отдельной задачи. Хранится в результате батча по номеру задачи.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("task panicked: {0}")]
    Panic(String),

    #[error("task failed: {0}")]
    Failed(String),

    #[error("callable expects {expected} argument(s), task provided {provided}")]
    ArityMismatch { expected: usize, provided: usize },

    #[error("unit join failed: {0}")]
    JoinFailed(String),

    #[error("concurrency limiter closed")]
    SemaphoreClosed,

    #[error("unit terminated without reporting a result")]
    Lost,
}

impl SpawnError {
    pub(crate) fn from_join(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            SpawnError::Panic(panic_message(&*err.into_panic()))
        } else {
            SpawnError::JoinFailed(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("concurrency limit must be positive, got {0}")]
    InvalidConcurrencyLimit(usize),

    #[error("concurrency limit {limit} exceeds the maximum of {max}")]
    ConcurrencyLimitTooLarge { limit: usize, max: usize },

    #[error("unknown isolation mode: {0}")]
    InvalidIsolation(String),

    #[error("invalid value {value:?} in {var}")]
    InvalidEnvValue { var: &'static str, value: String },
}

/// Достает текст из payload паники (`&str` или `String`)
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
