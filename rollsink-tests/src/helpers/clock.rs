//! Deterministic clocks for scenario tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone as _, Utc};
use rollsink::NowFn;

/// Noon UTC of `date` (`YYYY-MM-DD`).
pub fn instant_at(date: &str) -> DateTime<Utc> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("test date is well-formed");
    Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
}

/// A clock frozen at noon UTC of `date`.
pub fn frozen_clock(date: &str) -> NowFn {
    let instant = instant_at(date);
    Arc::new(move || instant)
}

/// A clock tests can advance mid-run, e.g. across midnight.
pub struct SteppingClock {
    instant: Mutex<DateTime<Utc>>,
}

impl SteppingClock {
    pub fn starting_at(date: &str) -> Arc<Self> {
        Arc::new(Self {
            instant: Mutex::new(instant_at(date)),
        })
    }

    pub fn advance_to(&self, date: &str) {
        *self.instant.lock().unwrap() = instant_at(date);
    }

    pub fn now_fn(self: &Arc<Self>) -> NowFn {
        let clock = Arc::clone(self);
        Arc::new(move || *clock.instant.lock().unwrap())
    }
}
