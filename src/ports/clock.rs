use chrono::{DateTime, Utc};

/// Source of "now" for everything time-dependent: SLA clocks, `age_hours`
/// conditions, execution timestamps. Injected so breach logic is testable
/// without real delays.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
