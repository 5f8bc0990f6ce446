use std::sync::Mutex;

use arbor::services::Clock;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Clock that returns whatever the test last set.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock at `hh:mm` on 2026-01-01 (UTC).
    pub fn at(hour: u32, minute: u32) -> Self {
        Self::new(time(hour, minute))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// `hh:mm` on 2026-01-01 (UTC).
pub fn time(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, hour, minute, 0).unwrap()
}
