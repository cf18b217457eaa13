//! Lenient field helpers for the JSON sections
//!
//! Servers written in loosely typed languages are not consistent about scalar
//! types: `bSuccess` is historically an integer, `returnFd` is sometimes sent
//! as a number and numeric fields may arrive quoted. These helpers accept any
//! reasonable scalar form while always writing one canonical form.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};
use serde_json::Value;

/// Render a JSON scalar as the string a loosely typed peer would have meant
pub(crate) fn scalar_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// `Option<String>` that also accepts numbers and booleans
pub mod string_opt {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(scalar_to_string(value))),
        }
    }
}

/// `Option<bool>` that also accepts integers and numeric strings
pub mod bool_opt {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::Number(n)) => Ok(Some(n.as_f64().map(|v| v != 0.0).unwrap_or(false))),
            Some(Value::String(s)) => match s.trim() {
                "" | "0" | "false" => Ok(Some(false)),
                "1" | "true" => Ok(Some(true)),
                other => Err(de::Error::custom(format!("expected a boolean, got '{}'", other))),
            },
            Some(other) => Err(de::Error::custom(format!("expected a boolean, got {}", other))),
        }
    }
}

/// `Option<bool>` written as `0`/`1` on the wire
pub mod bool_as_int_opt {
    use super::*;

    pub fn serialize<S>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(b) => serializer.serialize_u8(u8::from(*b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        super::bool_opt::deserialize(deserializer)
    }
}

/// Optional integer that also accepts quoted numbers
pub mod number_opt {
    use super::*;
    use std::str::FromStr;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.to_string().parse().map(Some).map_err(de::Error::custom),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
            Some(other) => Err(de::Error::custom(format!("expected a number, got {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(default, with = "bool_as_int_opt", skip_serializing_if = "Option::is_none")]
        flag: Option<bool>,
        #[serde(default, deserialize_with = "string_opt::deserialize")]
        text: Option<String>,
        #[serde(default, deserialize_with = "number_opt::deserialize")]
        count: Option<i64>,
    }

    #[test]
    fn test_bool_written_as_int() {
        let sample = Sample {
            flag: Some(true),
            text: None,
            count: None,
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"flag":1,"text":null,"count":null}"#);
    }

    #[test]
    fn test_bool_accepts_every_form() {
        for (input, expected) in [("1", true), ("0", false), ("true", true), (r#""1""#, true)] {
            let json = format!(r#"{{"flag":{}}}"#, input);
            let sample: Sample = serde_json::from_str(&json).unwrap();
            assert_eq!(sample.flag, Some(expected), "input {}", input);
        }
    }

    #[test]
    fn test_string_accepts_numbers() {
        let sample: Sample = serde_json::from_str(r#"{"text":0}"#).unwrap();
        assert_eq!(sample.text.as_deref(), Some("0"));
    }

    #[test]
    fn test_number_accepts_quoted() {
        let sample: Sample = serde_json::from_str(r#"{"count":"-3"}"#).unwrap();
        assert_eq!(sample.count, Some(-3));

        assert!(serde_json::from_str::<Sample>(r#"{"count":"x"}"#).is_err());
    }
}
