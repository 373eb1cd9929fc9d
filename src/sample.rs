use crate::config::AccessMode;
use std::fmt::Display;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Open,
    Compute,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Open => "open",
            Phase::Compute => "compute",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One timed phase of one strategy run. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingSample {
    pub mode: AccessMode,
    pub phase: Phase,
    pub duration: Duration,
}

impl TimingSample {
    pub fn new(mode: AccessMode, phase: Phase, duration: Duration) -> Self {
        Self {
            mode,
            phase,
            duration,
        }
    }
}

impl Display for TimingSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}: {:.6}s",
            self.mode,
            self.phase,
            self.duration.as_secs_f64()
        )
    }
}
