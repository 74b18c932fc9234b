use core::{fmt, str::FromStr};

use crate::{CUSTOM_EPOCH_MILLIS, Error, Result};

/// The three fields of a [`FlakeId`], as returned by [`FlakeId::decompose`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Components {
    /// Milliseconds since [`CUSTOM_EPOCH`](crate::CUSTOM_EPOCH).
    pub timestamp: i64,
    /// Generator instance that issued the id.
    pub node_id: u16,
    /// Ordinal within the millisecond for that node.
    pub sequence: u16,
}

/// A 64-bit Snowflake ID.
///
/// - 1 bit reserved (always zero, so the value is a non-negative `i64`)
/// - 41 bits timestamp (ms since [`CUSTOM_EPOCH`])
/// - 10 bits node ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21          12 11             0
///              +--------------+----------------+--------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | node ID (10) | sequence (12) |
///              +--------------+----------------+--------------+---------------+
///              |<----------- MSB --------- 64 bits --------- LSB ------------>|
/// ```
///
/// The layout is a wire contract: changing any width breaks ordering and
/// capacity assumptions of every consumer that parses these ids.
///
/// [`CUSTOM_EPOCH`]: crate::CUSTOM_EPOCH
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlakeId {
    id: i64,
}

impl FlakeId {
    /// Width of the timestamp field.
    pub const TIMESTAMP_BITS: u32 = 41;

    /// Width of the node ID field.
    pub const NODE_ID_BITS: u32 = 10;

    /// Width of the sequence field.
    pub const SEQUENCE_BITS: u32 = 12;

    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: i64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Bitmask for extracting the 10-bit node ID field. Occupies bits 12
    /// through 21.
    pub const NODE_ID_MASK: i64 = (1 << Self::NODE_ID_BITS) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: i64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 22).
    pub const TIMESTAMP_SHIFT: u32 = Self::NODE_ID_BITS + Self::SEQUENCE_BITS;

    /// Number of bits to shift the node ID to its correct position (bit 12).
    pub const NODE_ID_SHIFT: u32 = Self::SEQUENCE_BITS;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u32 = 0;

    /// Largest timestamp offset the layout can carry (about 69 years).
    pub const MAX_TIMESTAMP: i64 = Self::TIMESTAMP_MASK;

    /// Largest node ID (1023).
    pub const MAX_NODE_ID: u16 = Self::NODE_ID_MASK as u16;

    /// Largest sequence value (4095).
    pub const MAX_SEQUENCE: u16 = Self::SEQUENCE_MASK as u16;

    /// Packs the three fields into an id. Each field is masked to its width.
    pub const fn from_components(timestamp: i64, node_id: u16, sequence: u16) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let node_id = (node_id as i64 & Self::NODE_ID_MASK) << Self::NODE_ID_SHIFT;
        let sequence = (sequence as i64 & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | node_id | sequence,
        }
    }

    /// Wraps a raw value without validation. See [`FlakeId::is_valid`].
    pub const fn from_raw(raw: i64) -> Self {
        Self { id: raw }
    }

    /// Returns the packed integer.
    pub const fn to_raw(&self) -> i64 {
        self.id
    }

    /// Extracts the timestamp from the packed ID.
    pub const fn timestamp(&self) -> i64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the node ID from the packed ID.
    pub const fn node_id(&self) -> u16 {
        ((self.id >> Self::NODE_ID_SHIFT) & Self::NODE_ID_MASK) as u16
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u16 {
        ((self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK) as u16
    }

    /// Splits the id into its fields; the exact inverse of
    /// [`FlakeId::from_components`].
    pub const fn decompose(&self) -> Components {
        Components {
            timestamp: self.timestamp(),
            node_id: self.node_id(),
            sequence: self.sequence(),
        }
    }

    /// Returns `true` when the reserved bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id >= 0
    }

    /// Milliseconds since the Unix epoch at which this id was issued.
    pub const fn unix_millis(&self) -> i64 {
        self.timestamp() + CUSTOM_EPOCH_MILLIS
    }

    /// Returns the ID as a zero-padded 19-digit string, which sorts
    /// lexicographically in the same order as the numeric value.
    pub fn to_padded_string(&self) -> String {
        format!("{:019}", self.id)
    }
}

/// Splits a raw id into its fields.
pub const fn decompose(id: i64) -> Components {
    FlakeId::from_raw(id).decompose()
}

impl From<Components> for FlakeId {
    fn from(components: Components) -> Self {
        Self::from_components(components.timestamp, components.node_id, components.sequence)
    }
}

impl From<FlakeId> for i64 {
    fn from(id: FlakeId) -> Self {
        id.to_raw()
    }
}

impl TryFrom<i64> for FlakeId {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        let id = Self::from_raw(raw);
        if !id.is_valid() {
            return Err(Error::InvalidId { raw });
        }
        Ok(id)
    }
}

impl FromStr for FlakeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw: i64 = s.trim().parse().map_err(|e: core::num::ParseIntError| Error::ParseId {
            reason: e.to_string(),
        })?;
        Self::try_from(raw)
    }
}

impl fmt::Display for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlakeId")
            .field("raw", &format_args!("0x{:016x}", self.id))
            .field("timestamp", &self.timestamp())
            .field("node_id", &self.node_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_and_bounds() {
        let ts = FlakeId::MAX_TIMESTAMP;
        let node = FlakeId::MAX_NODE_ID;
        let seq = FlakeId::MAX_SEQUENCE;

        let id = FlakeId::from_components(ts, node, seq);
        assert_eq!(id.timestamp(), ts);
        assert_eq!(id.node_id(), node);
        assert_eq!(id.sequence(), seq);
        assert_eq!(id.to_raw(), i64::MAX);
        assert!(id.is_valid());
    }

    #[test]
    fn layout_constants() {
        assert_eq!(FlakeId::MAX_NODE_ID, 1023);
        assert_eq!(FlakeId::MAX_SEQUENCE, 4095);
        assert_eq!(FlakeId::MAX_TIMESTAMP, 2_199_023_255_551);
        assert_eq!(FlakeId::TIMESTAMP_SHIFT, 22);
        assert_eq!(FlakeId::NODE_ID_SHIFT, 12);
        assert_eq!(
            1 + FlakeId::TIMESTAMP_BITS + FlakeId::NODE_ID_BITS + FlakeId::SEQUENCE_BITS,
            64
        );
    }

    #[test]
    fn packs_most_significant_first() {
        let id = FlakeId::from_components(1, 1, 1);
        assert_eq!(id.to_raw(), (1 << 22) | (1 << 12) | 1);
    }

    #[test]
    fn decompose_inverts_packing() {
        let samples = [
            (0, 0, 0),
            (1, 7, 0),
            (1_234_567, 512, 4095),
            (FlakeId::MAX_TIMESTAMP, 0, 1),
            (FlakeId::MAX_TIMESTAMP - 1, FlakeId::MAX_NODE_ID, 2048),
        ];
        for (timestamp, node_id, sequence) in samples {
            let id = FlakeId::from_components(timestamp, node_id, sequence);
            assert_eq!(
                decompose(id.to_raw()),
                Components {
                    timestamp,
                    node_id,
                    sequence
                }
            );
            assert_eq!(FlakeId::from(id.decompose()), id);
        }
    }

    #[test]
    fn fields_do_not_bleed_into_neighbours() {
        let id = FlakeId::from_components(0, 0x7ff, 0x1fff);
        assert_eq!(id.timestamp(), 0);
        assert_eq!(id.node_id(), 0x3ff);
        assert_eq!(id.sequence(), 0xfff);
    }

    #[test]
    fn ordering_follows_timestamp_then_sequence() {
        let a = FlakeId::from_components(10, 900, 4095);
        let b = FlakeId::from_components(11, 0, 0);
        let c = FlakeId::from_components(11, 0, 1);
        assert!(a < b && b < c);
        assert!(a.to_raw() < b.to_raw());
    }

    #[test]
    fn reserved_bit_is_rejected() {
        assert_eq!(
            FlakeId::try_from(-1),
            Err(Error::InvalidId { raw: -1 })
        );
        assert!(!FlakeId::from_raw(i64::MIN).is_valid());
        assert!(FlakeId::try_from(0).is_ok());
    }

    #[test]
    fn parse_and_display() {
        let id = FlakeId::from_components(99, 3, 4);
        let text = id.to_string();
        assert_eq!(text.parse::<FlakeId>().unwrap(), id);
        assert_eq!(id.to_padded_string().len(), 19);
        assert_eq!(id.to_padded_string().parse::<FlakeId>().unwrap(), id);
        assert!(matches!("abc".parse::<FlakeId>(), Err(Error::ParseId { .. })));
        assert!(matches!(
            "-5".parse::<FlakeId>(),
            Err(Error::InvalidId { raw: -5 })
        ));
    }

    #[test]
    fn padded_strings_sort_like_numbers() {
        let small = FlakeId::from_components(1, 0, 0);
        let large = FlakeId::from_components(1_000_000, 0, 0);
        assert!(small.to_padded_string() < large.to_padded_string());
    }

    #[test]
    fn unix_millis_adds_epoch() {
        let id = FlakeId::from_components(5, 0, 0);
        assert_eq!(id.unix_millis(), 1_704_067_200_005);
    }

    #[test]
    fn debug_shows_fields() {
        let id = FlakeId::from_components(42, 7, 3);
        let debug = format!("{id:?}");
        assert!(debug.contains("timestamp: 42"));
        assert!(debug.contains("node_id: 7"));
        assert!(debug.contains("sequence: 3"));
    }
}
