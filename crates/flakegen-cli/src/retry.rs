use core::time::Duration;

use flakegen::{Error, FlakeId, Generator, TimeSource};
use tracing::warn;

/// Bounded retry with exponential back-off for backward clock movement.
///
/// Only [`Error::ClockMovedBackwards`] is retried; every other error is
/// returned on the first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

pub fn generate_with_retry<T>(generator: &Generator<T>, policy: RetryPolicy) -> flakegen::Result<FlakeId>
where
    T: TimeSource,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 0;
    loop {
        match generator.generate() {
            Err(Error::ClockMovedBackwards { now, last }) if attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    attempt,
                    now,
                    last,
                    backoff_ms = backoff.as_millis() as u64,
                    "clock moved backwards, retrying"
                );
                std::thread::sleep(backoff);
                backoff = backoff.saturating_mul(2);
            }
            result => return result,
        }
    }
}
