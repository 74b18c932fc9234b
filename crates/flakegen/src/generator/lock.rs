use core::{cmp::Ordering, time::Duration};
use std::sync::Arc;

use parking_lot::Mutex;
#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{SpinStrategy, wait_past};
use crate::{
    Error, FlakeId, GeneratorConfig, IdGenStatus, IdentityProvider, Result, SystemClock,
    TimeSource, resolve_node_id, validate_node_id,
};

/// Mutable generator state, read and written as one unit per request.
#[derive(Debug)]
struct State {
    last_timestamp: i64,
    sequence: u16,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The `(last_timestamp, sequence)` pair sits behind a single
/// [`parking_lot::Mutex`]; every request reads the clock, decides and mutates
/// the state inside that one critical section. Cloning a generator yields a
/// handle onto the same state, so clones act as one logical generator.
///
/// ## Guarantees
/// - Ids issued by one generator are unique and, in call order, strictly
///   increasing while the clock does not move backwards.
/// - A clock that moves backwards is reported as
///   [`Error::ClockMovedBackwards`], never papered over.
/// - When 4096 ids are issued within one millisecond, [`Generator::generate`]
///   blocks (holding the lock) until the clock advances.
///
/// Uniqueness across processes requires every generator sharing an id space
/// to have a distinct node id.
pub struct Generator<T = SystemClock>
where
    T: TimeSource,
{
    state: Arc<Mutex<State>>,
    node_id: u16,
    time: T,
    spin: SpinStrategy,
    overflow_timeout: Option<Duration>,
}

impl<T> Generator<T>
where
    T: TimeSource,
{
    /// `last_timestamp` before the first id is issued.
    pub const NO_TIMESTAMP: i64 = -1;

    /// Creates a new [`Generator`] with the given node id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNodeId`] if `node_id` is outside `[0, 1023]`.
    ///
    /// # Example
    /// ```
    /// use flakegen::{Generator, SystemClock};
    ///
    /// let generator = Generator::new(7, SystemClock).unwrap();
    /// let id = generator.generate().unwrap();
    /// assert_eq!(id.node_id(), 7);
    /// ```
    pub fn new(node_id: i64, time: T) -> Result<Self> {
        let node_id = validate_node_id(node_id)?;
        Ok(Self::from_components(Self::NO_TIMESTAMP, node_id, 0, time))
    }

    /// Creates a generator from a [`GeneratorConfig`], resolving the node id
    /// explicitly or through `provider`.
    ///
    /// # Errors
    ///
    /// Any error from [`resolve_node_id`]. No generator is created on failure.
    pub fn from_config<P>(config: &GeneratorConfig, time: T, provider: &P) -> Result<Self>
    where
        P: IdentityProvider + ?Sized,
    {
        let node_id = resolve_node_id(config.node_id, provider)?;
        Ok(Self::from_components(Self::NO_TIMESTAMP, node_id, 0, time)
            .with_spin(config.spin)
            .with_overflow_timeout(config.overflow_timeout()))
    }

    /// Creates a generator preloaded with explicit state.
    ///
    /// Useful for tests and benchmarks that need to start from a given
    /// timestamp or an exhausted sequence. Prefer [`Self::new`] otherwise.
    pub fn from_components(last_timestamp: i64, node_id: u16, sequence: u16, time: T) -> Self {
        debug_assert!(node_id <= FlakeId::MAX_NODE_ID, "node_id overflow");
        debug_assert!(sequence <= FlakeId::MAX_SEQUENCE, "sequence overflow");
        Self {
            state: Arc::new(Mutex::new(State {
                last_timestamp,
                sequence,
            })),
            node_id,
            time,
            spin: SpinStrategy::default(),
            overflow_timeout: None,
        }
    }

    /// Sets how the overflow wait polls the clock.
    pub fn with_spin(mut self, spin: SpinStrategy) -> Self {
        self.spin = spin;
        self
    }

    /// Bounds the overflow wait. `None` waits for as long as the clock takes.
    pub fn with_overflow_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.overflow_timeout = timeout;
        self
    }

    /// The node id embedded in every id from this generator.
    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Generates the next id, blocking through sequence exhaustion.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if the clock reads earlier than the
    ///   last issued timestamp
    /// - [`Error::TimestampOutOfRange`] if the clock reading does not fit
    ///   41 bits
    /// - [`Error::OverflowWaitTimedOut`] if an overflow timeout is set and
    ///   the clock stalls past it
    ///
    /// The generator state is unchanged on every error.
    ///
    /// # Example
    /// ```
    /// use flakegen::{Error, Generator, SystemClock};
    ///
    /// let generator = Generator::new(0, SystemClock).unwrap();
    /// let first = generator.generate().unwrap();
    /// let second = generator.generate().unwrap();
    /// assert!(first < second);
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self), fields(node_id = self.node_id)))]
    pub fn generate(&self) -> Result<FlakeId> {
        let mut state = self.state.lock();
        let now = self.checked_now()?;

        match now.cmp(&state.last_timestamp) {
            Ordering::Equal => {
                let sequence = (state.sequence + 1) & FlakeId::MAX_SEQUENCE;
                if sequence == 0 {
                    // Exhausted: wait for the next millisecond with the lock
                    // held, and commit only once it arrives.
                    let now = self.cold_wait_next_millis(state.last_timestamp)?;
                    state.last_timestamp = now;
                }
                state.sequence = sequence;
            }
            Ordering::Greater => {
                state.last_timestamp = now;
                state.sequence = 0;
            }
            Ordering::Less => return Err(Self::cold_clock_behind(now, state.last_timestamp)),
        }

        Ok(self.compose(&state))
    }

    /// Attempts to generate the next id without blocking.
    ///
    /// Returns [`IdGenStatus::Pending`] when the sequence is exhausted for the
    /// current millisecond; the state is left untouched so the caller can
    /// back off and poll again.
    ///
    /// # Errors
    ///
    /// [`Error::ClockMovedBackwards`] or [`Error::TimestampOutOfRange`], as
    /// for [`Self::generate`].
    ///
    /// # Example
    /// ```
    /// use flakegen::{Generator, IdGenStatus, SystemClock};
    ///
    /// let generator = Generator::new(3, SystemClock).unwrap();
    /// let id = loop {
    ///     match generator.poll_id().unwrap() {
    ///         IdGenStatus::Ready { id } => break id,
    ///         IdGenStatus::Pending { .. } => std::thread::yield_now(),
    ///     }
    /// };
    /// assert_eq!(id.node_id(), 3);
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self), fields(node_id = self.node_id)))]
    pub fn poll_id(&self) -> Result<IdGenStatus> {
        let mut state = self.state.lock();
        let now = self.checked_now()?;

        match now.cmp(&state.last_timestamp) {
            Ordering::Equal => {
                if state.sequence < FlakeId::MAX_SEQUENCE {
                    state.sequence += 1;
                } else {
                    return Ok(IdGenStatus::Pending {
                        yield_until: state.last_timestamp + 1,
                    });
                }
            }
            Ordering::Greater => {
                state.last_timestamp = now;
                state.sequence = 0;
            }
            Ordering::Less => return Err(Self::cold_clock_behind(now, state.last_timestamp)),
        }

        Ok(IdGenStatus::Ready {
            id: self.compose(&state),
        })
    }

    fn compose(&self, state: &State) -> FlakeId {
        FlakeId::from_components(state.last_timestamp, self.node_id, state.sequence)
    }

    fn checked_now(&self) -> Result<i64> {
        check_timestamp(self.time.current_millis())
    }

    #[cold]
    #[inline(never)]
    fn cold_wait_next_millis(&self, last: i64) -> Result<i64> {
        wait_past(&self.time, last, self.spin, self.overflow_timeout).and_then(check_timestamp)
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: i64, last: i64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(now, last, "clock moved backwards, refusing to generate id");
        Error::ClockMovedBackwards { now, last }
    }
}

fn check_timestamp(timestamp: i64) -> Result<i64> {
    if (0..=FlakeId::MAX_TIMESTAMP).contains(&timestamp) {
        Ok(timestamp)
    } else {
        Err(Error::TimestampOutOfRange { timestamp })
    }
}

impl<T> Clone for Generator<T>
where
    T: TimeSource + Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            node_id: self.node_id,
            time: self.time.clone(),
            spin: self.spin,
            overflow_timeout: self.overflow_timeout,
        }
    }
}

impl<T> core::fmt::Debug for Generator<T>
where
    T: TimeSource,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Generator")
            .field("node_id", &self.node_id)
            .field("spin", &self.spin)
            .field("overflow_timeout", &self.overflow_timeout)
            .finish_non_exhaustive()
    }
}
