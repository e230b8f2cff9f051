//! Serde helpers encoding 128-bit integers as decimal strings.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &i128, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<i128, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum I128Input {
        String(String),
        Number(i64),
    }

    match I128Input::deserialize(deserializer)? {
        I128Input::String(raw) => raw.parse::<i128>().map_err(D::Error::custom),
        I128Input::Number(value) => Ok(value as i128),
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Wrapper {
        #[serde(with = "super")]
        amount: i128,
    }

    #[test]
    fn test_large_values_survive_as_strings() {
        let wrapper = Wrapper { amount: i128::MAX - 7 };
        let json = serde_json::to_string(&wrapper).unwrap();
        assert!(json.contains('"'));
        let parsed: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, wrapper);
    }

    #[test]
    fn test_deserialize_accepts_number() {
        let parsed: Wrapper = serde_json::from_str(r#"{"amount":-1337}"#).unwrap();
        assert_eq!(parsed.amount, -1337);
    }
}
