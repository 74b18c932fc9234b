//! Serde support for [`FlakeId`].
//!
//! By default a [`FlakeId`] serializes as its native `i64`. JSON consumers
//! that parse numbers as doubles lose precision above 2^53; for them use
//! [`as_string`]:
//!
//! ```
//! use flakegen::{FlakeId, serde_ext::as_string};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Row {
//!     #[serde(with = "as_string")]
//!     id: FlakeId,
//! }
//! ```
//!
//! Both forms reject values with the reserved bit set on decode.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::FlakeId;

impl Serialize for FlakeId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_raw().serialize(s)
    }
}

impl<'de> Deserialize<'de> for FlakeId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = i64::deserialize(d)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

pub mod as_string {
    use super::{Deserializer, Serializer};
    use crate::FlakeId;

    /// Serialize an id as its decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &FlakeId, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_str(id)
    }

    /// Deserialize an id from its decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The underlying deserializer fails
    /// - The string is not a decimal integer
    /// - The value has the reserved bit set
    pub fn deserialize<'de, D>(d: D) -> Result<FlakeId, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DecimalVisitor;

        impl serde::de::Visitor<'_> for DecimalVisitor {
            type Value = FlakeId;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a decimal id string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        d.deserialize_str(DecimalVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    #[derive(PartialEq, Eq, Debug, Serialize, Deserialize)]
    struct NativeRow {
        event_id: FlakeId,
    }

    #[derive(PartialEq, Eq, Debug, Serialize, Deserialize)]
    struct StringRow {
        #[serde(with = "as_string")]
        event_id: FlakeId,
    }

    #[test]
    fn native_roundtrip() {
        let row = NativeRow {
            event_id: FlakeId::from_components(1, 2, 3),
        };
        let json = serde_json::to_string(&row).expect("serialize");
        assert_eq!(json, r#"{"event_id":4202499}"#);
        let back: NativeRow = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, row);
    }

    #[test]
    fn native_rejects_reserved_bit() {
        let err = serde_json::from_value::<NativeRow>(json!({ "event_id": -1 }))
            .expect_err("should fail");
        assert_eq!(err.to_string(), Error::InvalidId { raw: -1 }.to_string());
    }

    #[test]
    fn string_roundtrip() {
        let row = StringRow {
            event_id: FlakeId::from_components(FlakeId::MAX_TIMESTAMP, 1023, 4095),
        };
        let json = serde_json::to_string(&row).expect("serialize");
        assert_eq!(json, r#"{"event_id":"9223372036854775807"}"#);
        let back: StringRow = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, row);
    }

    #[test]
    fn string_rejects_garbage() {
        assert!(serde_json::from_value::<StringRow>(json!({ "event_id": "12x" })).is_err());
        assert!(serde_json::from_value::<StringRow>(json!({ "event_id": 12 })).is_err());
    }
}
