use chrono::{DateTime, Utc};

/// Represents an entity responsible for providing the current time across the
/// application. This allows timer logic to be tested without sleeping.
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
