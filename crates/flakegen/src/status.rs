use crate::FlakeId;

/// Represents the result of polling for a new ID.
///
/// This type models the outcome of [`Generator::poll_id`]:
///
/// - [`IdGenStatus::Ready`] indicates a new ID was successfully generated.
/// - [`IdGenStatus::Pending`] means the sequence is exhausted for the current
///   millisecond and no ID can be issued until the clock reaches
///   `yield_until`.
///
/// This allows non-blocking generation loops and caller-chosen back-off.
///
/// [`Generator::poll_id`]: crate::Generator::poll_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: FlakeId,
    },
    /// No ID could be generated because the sequence has been exhausted for the
    /// current tick.
    Pending {
        /// The next timestamp (inclusive) at which you may resume generating
        /// IDs.
        yield_until: i64,
    },
}

impl IdGenStatus {
    /// Returns the ID if one was issued.
    pub fn ready(self) -> Option<FlakeId> {
        match self {
            Self::Ready { id } => Some(id),
            Self::Pending { .. } => None,
        }
    }
}
