use std::fmt;
use std::str::FromStr;

use serde::{de, de::Visitor, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Error, ErrorKind, Result};

/// A Discord snowflake ID, carried on the wire as a decimal string.
///
/// The zero snowflake denotes a null or absent ID.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Parses a decimal string into a snowflake.
    ///
    /// The input must be a non-empty run of at most 20 ASCII digits whose
    /// value fits in 64 bits.
    pub fn parse(value: &str) -> Result<Snowflake> {
        if value.is_empty() || value.len() > 20 {
            return Err(Error::new(
                ErrorKind::InvalidFormat,
                format!("snowflake must be 1-20 digits, got {:?}", value),
            ));
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::new(
                ErrorKind::InvalidFormat,
                format!("snowflake contains a non-digit: {:?}", value),
            ));
        }
        value
            .parse::<u64>()
            .map(Snowflake)
            .map_err(|_| Error::new(ErrorKind::InvalidFormat, format!("snowflake overflows u64: {:?}", value)))
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Snowflake {
    fn from(u: u64) -> Self {
        Snowflake(u)
    }
}

impl From<Snowflake> for u64 {
    fn from(s: Snowflake) -> Self {
        s.0
    }
}

impl FromStr for Snowflake {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Snowflake::parse(s)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

struct SnowflakeVisitor;

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a snowflake as a decimal string")
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Snowflake::parse(value)
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(value), &self))
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Snowflake, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::Snowflake;

    #[test]
    fn round_trip() {
        for id in [0u64, 1, 1 << 63, u64::MAX] {
            let formatted = Snowflake(id).to_string();
            assert_eq!(Snowflake::parse(&formatted).unwrap(), Snowflake(id));
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Snowflake::parse("").is_err());
        assert!(Snowflake::parse("abc").is_err());
        assert!(Snowflake::parse("12x4").is_err());
        assert!(Snowflake::parse("-1").is_err());
        // 21 digits
        assert!(Snowflake::parse("123456789012345678901").is_err());
        // 20 digits but over 2^64 - 1
        assert!(Snowflake::parse("18446744073709551616").is_err());
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let json = serde_json::to_string(&Snowflake(80351110224678912)).unwrap();
        assert_eq!(json, "\"80351110224678912\"");
        let back: Snowflake = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Snowflake(80351110224678912));

        assert!(serde_json::from_str::<Snowflake>("80351110224678912").is_err());
        assert!(serde_json::from_str::<Snowflake>("\"\"").is_err());
    }
}
