use core::time::Duration;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

/// Custom epoch: Monday, January 1, 2024 00:00:00 UTC
///
/// Fixed at build time. Moving it would reorder every id issued before the
/// change against every id issued after it.
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(CUSTOM_EPOCH_MILLIS as u64);

pub(crate) const CUSTOM_EPOCH_MILLIS: i64 = 1_704_067_200_000;

/// A source of timestamps, in **milliseconds** relative to [`CUSTOM_EPOCH`].
///
/// This abstraction allows plugging in the real system clock or a mocked time
/// source in tests. Implementations are not required to be monotonic: the
/// generator detects and rejects backward movement.
///
/// # Example
///
/// ```
/// use flakegen::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> i64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since [`CUSTOM_EPOCH`].
    fn current_millis(&self) -> i64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> i64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> i64 {
        (**self).current_millis()
    }
}

/// Wall-clock time source backed by [`SystemTime`].
///
/// The wall clock can step backwards (NTP corrections, VM pauses); readings
/// taken before the Unix epoch come back negative rather than clamped so the
/// generator can refuse them.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> i64 {
        let unix_millis = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_millis())
                .map_or(i64::MIN, |millis| -millis),
        };
        unix_millis.saturating_sub(CUSTOM_EPOCH_MILLIS)
    }
}
