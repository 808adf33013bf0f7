//! Serde adapters for the formats used in consensus configuration files.

/// `u64` represented as a decimal string, the convention for integer values
/// in preset and configuration files.
pub mod string_or_native {
    use core::fmt;

    use serde::{de::Visitor, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        struct StringOrNativeVisitor;

        impl Visitor<'_> for StringOrNativeVisitor {
            type Value = u64;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a u64 or a decimal string")
            }

            fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<u64, E> {
                Ok(value)
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<u64, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(StringOrNativeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(PartialEq, Debug, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "crate::string_or_native")]
        value: u64,
    }

    #[test]
    fn u64_serializes_to_a_decimal_string() {
        let wrapper = Wrapper { value: 32_000_000_000 };
        let json = serde_json::to_string(&wrapper).expect("serializable");

        assert_eq!(json, r#"{"value":"32000000000"}"#);
        assert_eq!(
            serde_json::from_str::<Wrapper>(&json).expect("deserializable"),
            wrapper,
        );
    }

    #[test]
    fn u64_deserializes_from_a_native_integer() {
        assert_eq!(
            serde_json::from_str::<Wrapper>(r#"{"value":8}"#).expect("deserializable"),
            Wrapper { value: 8 },
        );
    }
}
