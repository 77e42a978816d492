use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, Utc};

/// Wall-clock source injected into the timer so tests can pin "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Local wall-clock time, used for target end times and day boundaries.
    fn local_now(&self) -> NaiveDateTime;

    fn start_of_day(&self) -> NaiveDateTime {
        self.local_now().date().and_time(NaiveTime::MIN)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, NaiveDateTime, Utc};

    use super::Clock;

    /// Clock frozen at a single instant; local time equals UTC.
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock(pub DateTime<Utc>);

    impl FixedClock {
        pub fn at(rfc3339: &str) -> Self {
            let instant = DateTime::parse_from_rfc3339(rfc3339)
                .expect("valid rfc3339 timestamp")
                .with_timezone(&Utc);
            Self(instant)
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }

        fn local_now(&self) -> NaiveDateTime {
            self.0.naive_utc()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixedClock;
    use super::Clock;

    #[test]
    fn start_of_day_is_local_midnight() {
        let clock = FixedClock::at("2026-10-18T14:30:12Z");
        let midnight = clock.start_of_day();
        assert_eq!(midnight.to_string(), "2026-10-18 00:00:00");
    }
}
