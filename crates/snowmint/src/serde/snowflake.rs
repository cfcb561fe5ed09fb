use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::SnowflakeId;

pub mod as_native {
    use super::{Deserialize, Deserializer, Serialize, Serializer};
    use crate::SnowflakeId;

    /// Serialize a snowflake ID as its native signed integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &SnowflakeId, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        id.to_i64().serialize(s)
    }

    /// Deserialize a snowflake ID from its native signed integer.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The underlying deserializer fails
    /// - The value is negative (reserved bit set)
    pub fn deserialize<'de, D>(d: D) -> Result<SnowflakeId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = i64::deserialize(d)?;
        SnowflakeId::try_from(n).map_err(serde::de::Error::custom)
    }
}

pub mod as_string {
    use super::{Deserialize, Deserializer, Serializer};
    use crate::SnowflakeId;
    use std::borrow::Cow;

    /// Serialize a snowflake ID as a decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &SnowflakeId, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_str(id)
    }

    /// Deserialize a snowflake ID from a decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The underlying deserializer fails
    /// - The string is not a decimal `i64`
    /// - The value is negative (reserved bit set)
    pub fn deserialize<'de, D>(d: D) -> Result<SnowflakeId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Cow::<'de, str>::deserialize(d)?;
        let n: i64 = s.parse().map_err(serde::de::Error::custom)?;
        SnowflakeId::try_from(n).map_err(serde::de::Error::custom)
    }
}

impl Serialize for SnowflakeId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        as_native::serialize(self, s)
    }
}

impl<'de> Deserialize<'de> for SnowflakeId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        as_native::deserialize(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: SnowflakeId,
        #[serde(with = "as_string")]
        public_id: SnowflakeId,
    }

    #[test]
    fn native_and_string_forms() {
        let id = SnowflakeId::from_components(100, 1, 2, 3);
        let row = Row { id, public_id: id };

        let json = serde_json::to_string(&row).unwrap();
        let raw = id.to_i64();
        assert_eq!(json, format!(r#"{{"id":{raw},"public_id":"{raw}"}}"#));
        assert_eq!(serde_json::from_str::<Row>(&json).unwrap(), row);
    }

    #[test]
    fn negative_values_are_rejected() {
        assert!(serde_json::from_str::<SnowflakeId>("-1").is_err());
        assert!(serde_json::from_str::<Row>(r#"{"id":1,"public_id":"-5"}"#).is_err());
        assert!(serde_json::from_str::<Row>(r#"{"id":1,"public_id":"abc"}"#).is_err());
    }
}
