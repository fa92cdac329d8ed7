//! Free-form application settings
//!
//! Preconfigured applications vary wildly in the settings they accept, so
//! they are carried as an ordered map of scalar values rather than typed
//! structs. Empty strings are treated as "unset": they are dropped when the
//! map is serialized. Every other value, including `false`, `0` and `null`,
//! is kept.

use crate::error::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// A single scalar setting value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl SettingValue {
    /// Whether this value is dropped on serialization
    pub fn is_empty_string(&self) -> bool {
        matches!(self, Self::String(s) if s.is_empty())
    }

    /// Convert from a JSON value, `None` for arrays and objects
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => Some(Self::Number(n.clone())),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for SettingValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// Ordered map of application settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct AppSettings(BTreeMap<String, SettingValue>);

impl AppSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SettingValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<SettingValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All entries in key order, empty strings included
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.0.iter()
    }

    /// Entries that survive serialization
    pub fn retained(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.0.iter().filter(|(_, v)| !v.is_empty_string())
    }

    /// Build from a JSON object, skipping nested arrays and objects
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut settings = Self::new();
        for (key, value) in object {
            match SettingValue::from_json(value) {
                Some(v) => settings.insert(key.clone(), v),
                None => log::debug!("Skipping non-scalar setting {key}"),
            }
        }
        settings
    }

    /// Parse a JSON object string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value {
            serde_json::Value::Object(object) => Ok(Self::from_json_object(&object)),
            other => Err(Error::InvalidResponse(format!(
                "settings must be a JSON object, got {other}"
            ))),
        }
    }

    /// Serialize to a compact JSON object string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for AppSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let retained: Vec<_> = self.retained().collect();
        let mut map = serializer.serialize_map(Some(retained.len()))?;
        for (key, value) in retained {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl FromIterator<(String, SettingValue)> for AppSettings {
    fn from_iter<I: IntoIterator<Item = (String, SettingValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strings_omitted_on_serialize() {
        let mut settings = AppSettings::new();
        settings.insert("url", "https://example.com");
        settings.insert("blank", "");
        settings.insert("enabled", false);
        settings.insert("count", 0);
        settings.insert("missing", SettingValue::Null);

        let json = settings.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"count":0,"enabled":false,"missing":null,"url":"https://example.com"}"#
        );
        // The in-memory map still holds the empty string
        assert_eq!(settings.len(), 5);
    }

    #[test]
    fn test_from_json_skips_nested_values() {
        let settings =
            AppSettings::from_json(r#"{"a":"x","b":[1,2],"c":{"d":1},"e":true,"f":""}"#).unwrap();
        assert_eq!(settings.get("a"), Some(&SettingValue::from("x")));
        assert!(settings.get("b").is_none());
        assert!(settings.get("c").is_none());
        assert_eq!(settings.get("e").and_then(SettingValue::as_bool), Some(true));
        assert!(settings.get("f").is_some_and(SettingValue::is_empty_string));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(AppSettings::from_json("[1,2,3]").is_err());
        assert!(AppSettings::from_json("not json").is_err());
    }

    #[test]
    fn test_keys_serialize_in_order() {
        let settings: AppSettings = [
            ("zeta".to_string(), SettingValue::from("z")),
            ("alpha".to_string(), SettingValue::from("a")),
        ]
        .into_iter()
        .collect();
        assert_eq!(settings.to_json().unwrap(), r#"{"alpha":"a","zeta":"z"}"#);
    }

    #[test]
    fn test_deserialize_from_toml_style_values() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"port":8443,"secure":true,"name":"x"}"#).unwrap();
        assert_eq!(settings.len(), 3);
        assert_eq!(settings.get("name").and_then(SettingValue::as_str), Some("x"));
    }
}
