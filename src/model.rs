use std::sync::atomic::{AtomicUsize, Ordering};


#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub active_units: usize,
    pub peak_active_units: usize,
    pub total_spawned: usize,
    pub completed_units: usize,
    pub failed_units: usize,
    pub batches_completed: usize,
}

impl PoolMetrics {
    /// Доля занятых слотов относительно лимита пула
    pub fn utilization(&self, concurrency_limit: usize) -> f64 {
        if concurrency_limit == 0 {
            return 0.0;
        }
        self.active_units as f64 / concurrency_limit as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_units + self.failed_units;
        if total == 0 {
            return 1.0;
        }
        self.completed_units as f64 / total as f64
    }
}


/// Жизненный цикл одного вызова `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BatchState {
    Idle,
    Launching,
    Running,
    Draining,
    Done,
}

impl BatchState {
    pub fn next(self) -> Option<BatchState> {
        match self {
            BatchState::Idle => Some(BatchState::Launching),
            BatchState::Launching => Some(BatchState::Running),
            BatchState::Running => Some(BatchState::Draining),
            BatchState::Draining => Some(BatchState::Done),
            BatchState::Done => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == BatchState::Done
    }
}


/// Счетчик задач внутри вызова функции: текущее значение и пик
#[derive(Debug, Default)]
pub struct ActivityGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ActivityGauge {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        GaugeGuard { gauge: self }
    }

    #[inline]
    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    #[inline]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }
}

pub struct GaugeGuard<'a> {
    gauge: &'a ActivityGauge,
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::AcqRel);
    }
}


/// Накопительные счетчики пула
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub(crate) active: ActivityGauge,
    pub(crate) total_spawned: AtomicUsize,
    pub(crate) completed: AtomicUsize,
    pub(crate) failed: AtomicUsize,
    pub(crate) batches_started: AtomicUsize,
    pub(crate) batches_completed: AtomicUsize,
}

impl PoolCounters {
    pub(crate) fn snapshot(&self) -> PoolMetrics {
        PoolMetrics {
            active_units: self.active.current(),
            peak_active_units: self.active.peak(),
            total_spawned: self.total_spawned.load(Ordering::Relaxed),
            completed_units: self.completed.load(Ordering::Relaxed),
            failed_units: self.failed.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
        }
    }
}
