pub(crate) mod byte_array_hex {
    /// Serialize (via Serde) a byte array as a lowercase hex string.
    pub fn serialize<S: serde::Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(hex::encode(bytes).as_str())
    }

    /// Deserialize (via Serde) a byte array from a hex string.
    pub fn deserialize<'de, D: serde::Deserializer<'de>>(des: D) -> Result<Vec<u8>, D::Error> {
        struct HexVisitor;
        impl<'de> serde::de::Visitor<'de> for HexVisitor {
            type Value = Vec<u8>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "A hex string.")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error, {
                let r = hex::decode(v).map_err(serde::de::Error::custom)?;
                Ok(r)
            }
        }
        des.deserialize_str(HexVisitor)
    }
}

pub(crate) mod hash_hex {
    use crate::types::HASH_LENGTH;

    /// Serialize (via Serde) a 32 byte hash as a hex string without prefix.
    pub fn serialize<S: serde::Serializer>(
        bytes: &[u8; HASH_LENGTH],
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        super::byte_array_hex::serialize(bytes, ser)
    }

    /// Deserialize (via Serde) a 32 byte hash from a hex string.
    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        des: D,
    ) -> Result<[u8; HASH_LENGTH], D::Error> {
        let bytes = super::byte_array_hex::deserialize(des)?;
        let len = bytes.len();
        bytes.try_into().map_err(|_| {
            serde::de::Error::custom(format!("Expected 32 bytes, but got {}.", len))
        })
    }
}

pub(crate) mod timestamp_rfc3339 {
    use serde::Deserialize;

    /// Serialize (via Serde) milliseconds since the Unix epoch as an RFC 3339
    /// string with millisecond precision, e.g., `2024-05-01T12:00:00.000Z`.
    pub fn serialize<S: serde::Serializer>(millis: &u64, ser: S) -> Result<S::Ok, S::Error> {
        let dt = i64::try_from(*millis)
            .ok()
            .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
            .ok_or_else(|| serde::ser::Error::custom("Timestamp out of range."))?;
        ser.serialize_str(&dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    }

    /// Deserialize (via Serde) an RFC 3339 string into milliseconds since the
    /// Unix epoch.
    pub fn deserialize<'de, D: serde::Deserializer<'de>>(des: D) -> Result<u64, D::Error> {
        let s = String::deserialize(des)?;
        let dt = chrono::DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom)?;
        u64::try_from(dt.timestamp_millis())
            .map_err(|_| serde::de::Error::custom("Timestamps before 1970 are not supported."))
    }
}
