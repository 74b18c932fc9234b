use core::time::Duration;
use std::time::Instant;

use crate::{Error, Result, TimeSource};

/// How the generator polls the clock while waiting out an exhausted sequence.
///
/// Every strategy keeps the state lock held; they differ only in how much CPU
/// the waiting thread burns.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SpinStrategy {
    /// Busy-poll with [`core::hint::spin_loop`].
    Spin,
    /// Yield the thread between polls.
    #[default]
    Yield,
    /// Sleep between polls.
    Sleep {
        /// Sleep length in microseconds.
        micros: u64,
    },
}

impl SpinStrategy {
    fn pause(self) {
        match self {
            Self::Spin => core::hint::spin_loop(),
            Self::Yield => std::thread::yield_now(),
            Self::Sleep { micros } => std::thread::sleep(Duration::from_micros(micros)),
        }
    }
}

/// Blocks until `time` reports a timestamp strictly after `last` and returns
/// it.
///
/// # Errors
///
/// Returns [`Error::OverflowWaitTimedOut`] if `timeout` elapses first.
pub(crate) fn wait_past<T>(
    time: &T,
    last: i64,
    strategy: SpinStrategy,
    timeout: Option<Duration>,
) -> Result<i64>
where
    T: TimeSource + ?Sized,
{
    let started = Instant::now();
    loop {
        let now = time.current_millis();
        if now > last {
            return Ok(now);
        }
        if let Some(limit) = timeout {
            let waited = started.elapsed();
            if waited >= limit {
                return Err(Error::OverflowWaitTimedOut { waited });
            }
        }
        strategy.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct Ticking {
        reads: AtomicI64,
    }

    impl TimeSource for Ticking {
        // Advances one millisecond every 10 reads.
        fn current_millis(&self) -> i64 {
            self.reads.fetch_add(1, Ordering::Relaxed) / 10
        }
    }

    struct Frozen;

    impl TimeSource for Frozen {
        fn current_millis(&self) -> i64 {
            5
        }
    }

    #[test]
    fn returns_first_reading_past_last() {
        let time = Ticking {
            reads: AtomicI64::new(0),
        };
        for strategy in [
            SpinStrategy::Spin,
            SpinStrategy::Yield,
            SpinStrategy::Sleep { micros: 1 },
        ] {
            let last = time.current_millis();
            let next = wait_past(&time, last, strategy, None).unwrap();
            assert_eq!(next, last + 1);
        }
    }

    #[test]
    fn returns_immediately_when_already_past() {
        assert_eq!(wait_past(&Frozen, 4, SpinStrategy::Spin, None), Ok(5));
    }

    #[test]
    fn times_out_on_frozen_clock() {
        let err = wait_past(
            &Frozen,
            5,
            SpinStrategy::Sleep { micros: 100 },
            Some(Duration::from_millis(2)),
        )
        .unwrap_err();
        match err {
            Error::OverflowWaitTimedOut { waited } => {
                assert!(waited >= Duration::from_millis(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
