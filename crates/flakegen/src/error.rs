use core::time::Duration;

use crate::FlakeId;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `flakegen` can emit.
///
/// Construction errors ([`Error::InvalidNodeId`], [`Error::NoSuitableIdentity`],
/// [`Error::InterfaceLookup`]) are fatal to that construction attempt: no
/// generator is created. Generation errors leave the generator state exactly
/// as it was, so the caller may retry, back off or escalate.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The supplied node id does not fit the 10-bit node field.
    #[error("invalid node id {node_id}: must be between 0 and {max}", max = FlakeId::MAX_NODE_ID)]
    InvalidNodeId { node_id: i64 },

    /// Automatic derivation found no up, non-loopback interface with a
    /// hardware address. Fall back to an explicit node id.
    #[error("no suitable network interface found to derive a node id")]
    NoSuitableIdentity,

    /// The operating system refused to enumerate network interfaces.
    #[error("failed to enumerate network interfaces: {reason}")]
    InterfaceLookup { reason: String },

    /// The clock reported a time earlier than the last issued timestamp.
    #[error("clock moved backwards (now {now}, last {last}), refusing to generate id")]
    ClockMovedBackwards { now: i64, last: i64 },

    /// The clock reading does not fit the 41-bit timestamp field, either
    /// because it precedes the custom epoch or because the field is exhausted.
    #[error("timestamp {timestamp} is outside the representable range")]
    TimestampOutOfRange { timestamp: i64 },

    /// The sequence was exhausted and the clock did not advance within the
    /// configured overflow timeout.
    #[error("clock did not advance within {waited:?} after sequence exhaustion")]
    OverflowWaitTimedOut { waited: Duration },

    /// A raw value has the reserved sign bit set.
    #[error("raw value {raw} is not a valid id: reserved bit is set")]
    InvalidId { raw: i64 },

    /// Text could not be parsed as an id.
    #[error("failed to parse id: {reason}")]
    ParseId { reason: String },
}
