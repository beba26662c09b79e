use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Configuration handed to plugin constructors: the deployment's global
/// conf overlaid by the filter section's local conf.
///
/// Values may arrive typed (YAML numbers, lists) or as strings (env
/// overrides), so the typed getters accept both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginConfig {
    values: Map<String, Value>,
}

impl PluginConfig {
    pub fn new(global: &Map<String, Value>, local: &Map<String, Value>) -> Self {
        let mut values = global.clone();
        for (k, v) in local {
            values.insert(k.clone(), v.clone());
        }
        Self { values }
    }

    /// Config from a JSON object; anything else yields an empty config.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.values.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// List value; a string is split on commas.
    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        match self.values.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Deserialize the whole config into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        Ok(serde_json::from_value(Value::Object(self.values.clone()))?)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}
