//! Execution parameters
//!
//! Execution parameters are handed to the script or URL an event triggers.
//! They are addressed both by name (`addParam`) and by position
//! (`addScriptParam`), and both views operate on the same ordered list: a
//! positional index always counts every entry, named or not.
//!
//! On the wire a purely positional list is a JSON array. As soon as one entry
//! is named the list is written as a JSON object in which positional entries
//! are keyed by their index, and an object key equal to its own index is read
//! back as a positional entry. A named entry whose key equals its own index or
//! the index of a positional entry cannot be told apart from a positional one
//! and fails to serialize.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::{self, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParamError;
use crate::serde_utils::scalar_to_string;

/// A single execution parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecParam {
    /// Name for keyed parameters, `None` for positional ones
    pub key: Option<String>,
    /// Parameter value
    pub value: String,
}

impl ExecParam {
    /// Create a named parameter
    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    /// Create a positional parameter
    pub fn positional(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }
}

/// Ordered association list of execution parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecParams {
    entries: Vec<ExecParam>,
}

impl ExecParams {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, named and positional
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in order
    pub fn iter(&self) -> impl Iterator<Item = &ExecParam> {
        self.entries.iter()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|p| p.key.as_deref() == Some(key))
    }

    // Named access

    /// Set a named parameter, replacing the value in place if the key exists
    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => self.entries[i].value = value,
            None => self.entries.push(ExecParam::keyed(key, value)),
        }
    }

    /// Value of a named parameter
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].value.as_str())
    }

    /// Value of a named parameter converted to `T`
    pub fn get_param_as<T>(&self, key: &str) -> Result<T, ParamError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let value = self
            .get_param(key)
            .ok_or_else(|| ParamError::MissingKey(key.to_string()))?;
        convert(value)
    }

    /// True if a parameter with this key exists
    pub fn exists_param(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Remove a named parameter and return its value
    pub fn remove_param(&mut self, key: &str) -> Option<String> {
        self.position(key).map(|i| self.entries.remove(i).value)
    }

    // Positional access

    /// Append a positional parameter
    pub fn add_script_param(&mut self, value: impl Into<String>) {
        self.entries.push(ExecParam::positional(value));
    }

    /// Insert a positional parameter at the front of the list
    pub fn prepend_script_param(&mut self, value: impl Into<String>) {
        self.entries.insert(0, ExecParam::positional(value));
    }

    /// Value at `index`
    pub fn get_script_param(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|p| p.value.as_str())
    }

    /// Value at `index` converted to `T`
    pub fn get_script_param_as<T>(&self, index: usize) -> Result<T, ParamError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let value = self
            .get_script_param(index)
            .ok_or(ParamError::IndexOutOfRange {
                index,
                len: self.len(),
            })?;
        convert(value)
    }

    /// Replace the value at `index`; `index == len()` appends
    pub fn set_script_param(
        &mut self,
        index: usize,
        value: impl Into<String>,
    ) -> Result<(), ParamError> {
        let len = self.len();
        match index {
            i if i < len => {
                self.entries[i].value = value.into();
                Ok(())
            }
            i if i == len => {
                self.add_script_param(value);
                Ok(())
            }
            _ => Err(ParamError::IndexOutOfRange { index, len }),
        }
    }

    /// Remove the entry at `index` and return its value
    pub fn remove_script_param(&mut self, index: usize) -> Option<String> {
        (index < self.len()).then(|| self.entries.remove(index).value)
    }

    /// Remove and return the first entry
    pub fn shift_script_param(&mut self) -> Option<String> {
        self.remove_script_param(0)
    }

    /// Number of positional entries
    pub fn script_param_len(&self) -> usize {
        self.entries.iter().filter(|p| p.key.is_none()).count()
    }

    fn is_positional_only(&self) -> bool {
        self.entries.iter().all(|p| p.key.is_none())
    }

    /// First named entry whose key would read back as a positional index:
    /// its own index, or the index of a positional entry
    fn index_key_collision(&self) -> Option<&str> {
        self.entries.iter().enumerate().find_map(|(i, param)| {
            let key = param.key.as_deref()?;
            let collides = key == i.to_string()
                || self
                    .entries
                    .iter()
                    .enumerate()
                    .any(|(j, other)| other.key.is_none() && key == j.to_string());
            collides.then_some(key)
        })
    }
}

fn convert<T>(value: &str) -> Result<T, ParamError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ParamError::Invalid {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl<K, V> FromIterator<(K, V)> for ExecParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.add_param(k, v);
        }
        params
    }
}

impl Serialize for ExecParams {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_positional_only() {
            return serializer.collect_seq(self.entries.iter().map(|p| &p.value));
        }
        if let Some(key) = self.index_key_collision() {
            return Err(ser::Error::custom(format!(
                "execParams key '{}' collides with a positional index",
                key
            )));
        }

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (i, param) in self.entries.iter().enumerate() {
            match &param.key {
                Some(key) => map.serialize_entry(key, &param.value)?,
                None => map.serialize_entry(&i.to_string(), &param.value)?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExecParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = match Value::deserialize(deserializer)? {
            Value::Null => Vec::new(),
            Value::Array(values) => values
                .into_iter()
                .map(|v| ExecParam::positional(scalar_to_string(v)))
                .collect(),
            Value::Object(map) => map
                .into_iter()
                .enumerate()
                .map(|(i, (key, v))| {
                    let value = scalar_to_string(v);
                    if key == i.to_string() {
                        ExecParam::positional(value)
                    } else {
                        ExecParam::keyed(key, value)
                    }
                })
                .collect(),
            other => {
                return Err(de::Error::custom(format!(
                    "execParams must be an object or an array, got {}",
                    other
                )))
            }
        };
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_access() {
        let mut params = ExecParams::new();
        params.add_param("queue", "default");
        params.add_param("cmd", "updateworkers");
        params.add_param("queue", "other");

        assert_eq!(params.len(), 2);
        assert_eq!(params.get_param("queue"), Some("other"));
        assert!(params.exists_param("cmd"));
        assert_eq!(params.remove_param("cmd").as_deref(), Some("updateworkers"));
        assert!(!params.exists_param("cmd"));
        assert_eq!(params.get_param("missing"), None);
    }

    #[test]
    fn test_positional_access() {
        let mut params = ExecParams::new();
        params.add_script_param("b");
        params.add_script_param("c");
        params.prepend_script_param("a");

        assert_eq!(params.get_script_param(0), Some("a"));
        assert_eq!(params.get_script_param(2), Some("c"));
        assert_eq!(params.script_param_len(), 3);

        params.set_script_param(1, "B").unwrap();
        assert_eq!(params.get_script_param(1), Some("B"));
        params.set_script_param(3, "d").unwrap();
        assert!(params.set_script_param(9, "x").is_err());

        assert_eq!(params.shift_script_param().as_deref(), Some("a"));
        assert_eq!(params.remove_script_param(0).as_deref(), Some("B"));
        assert_eq!(params.remove_script_param(5), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_mixed_views_share_one_list() {
        let mut params = ExecParams::new();
        params.add_param("first", "1");
        params.add_script_param("second");
        params.prepend_script_param("zero");

        assert_eq!(params.get_script_param(1), Some("1"));
        assert_eq!(params.remove_script_param(1).as_deref(), Some("1"));
        assert!(!params.exists_param("first"));
    }

    #[test]
    fn test_typed_getters() {
        let params: ExecParams = [("workers", "4"), ("ratio", "0.5"), ("name", "x")]
            .into_iter()
            .collect();

        assert_eq!(params.get_param_as::<u32>("workers").unwrap(), 4);
        assert_eq!(params.get_param_as::<f32>("ratio").unwrap(), 0.5);
        assert!(matches!(
            params.get_param_as::<u32>("name"),
            Err(ParamError::Invalid { .. })
        ));
        assert!(matches!(
            params.get_param_as::<u32>("nope"),
            Err(ParamError::MissingKey(_))
        ));
        assert_eq!(params.get_script_param_as::<i64>(0).unwrap(), 4);
    }

    #[test]
    fn test_positional_serializes_as_array() {
        let mut params = ExecParams::new();
        params.add_script_param("a");
        params.add_script_param("b");
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn test_named_serializes_as_object_in_order() {
        let params: ExecParams = [("param1", "4"), ("param2", "param2"), ("param3", "3")]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"param1":"4","param2":"param2","param3":"3"}"#
        );
    }

    #[test]
    fn test_mixed_roundtrip() {
        let mut params = ExecParams::new();
        params.add_script_param("pos0");
        params.add_param("name", "value");
        params.add_script_param("pos2");

        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"0":"pos0","name":"value","2":"pos2"}"#);

        let decoded: ExecParams = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, params);
    }

    #[test]
    fn test_numeric_keys_that_read_back_positional_are_rejected() {
        let mut own_index = ExecParams::new();
        own_index.add_param("0", "x");
        assert!(serde_json::to_string(&own_index).is_err());

        let mut positional_index = ExecParams::new();
        positional_index.add_script_param("a");
        positional_index.add_param("0", "b");
        assert!(serde_json::to_string(&positional_index).is_err());
    }

    #[test]
    fn test_numeric_key_at_other_index_roundtrips() {
        let mut params = ExecParams::new();
        params.add_param("name", "value");
        params.add_param("0", "x");
        params.add_script_param("pos");

        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"name":"value","0":"x","2":"pos"}"#);

        let decoded: ExecParams = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, params);
        assert_eq!(decoded.get_param("0"), Some("x"));
    }

    #[test]
    fn test_deserialize_scalars_as_strings() {
        let params: ExecParams = serde_json::from_str(r#"{"n":4,"b":true}"#).unwrap();
        assert_eq!(params.get_param("n"), Some("4"));
        assert_eq!(params.get_param("b"), Some("true"));

        assert!(serde_json::from_str::<ExecParams>("42").is_err());
    }
}
