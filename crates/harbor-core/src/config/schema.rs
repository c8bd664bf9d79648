//! Package configuration schema (`config.json`).

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::merge::{ConfigMap, transform_value};
use crate::error::{HarborError, Result};

/// One node of the recursive configuration schema.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSchemaGroup {
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub additional_properties: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, ConfigSchemaGroup>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub minimum: Option<Value>,
    #[serde(default)]
    pub default: Option<Value>,
}

impl ConfigSchemaGroup {
    /// Parse a schema document. Empty input yields an empty schema.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(raw)
            .map_err(|e| HarborError::upstream("parse config schema", "config.json", e))
    }

    /// Defaults declared by this node's properties.
    ///
    /// A property with a default contributes its coerced default; an `object`
    /// property without one contributes its nested defaults; anything else is
    /// left out.
    pub fn default_config(&self) -> ConfigMap {
        let mut defaults = ConfigMap::new();
        for (name, group) in &self.properties {
            if let Some(default) = &group.default {
                defaults.insert(name.clone(), transform_value(default.clone(), &group.kind));
            } else if group.kind == "object" {
                defaults.insert(name.clone(), Value::Object(group.default_config()));
            }
        }
        defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "type": "object",
        "properties": {
            "mesos": {
                "type": "object",
                "properties": {
                    "master": {"type": "string", "default": "zk://master.mesos:2181/mesos"},
                    "principal": {"type": "string"}
                }
            },
            "kafka": {
                "type": "object",
                "properties": {
                    "cpus": {"type": "number", "default": 0.5, "minimum": 0.1},
                    "instances": {"type": "integer", "default": 3},
                    "brokers": {"type": "array", "default": ["a", "b"]}
                },
                "required": ["cpus"]
            },
            "empty": {"type": "object"},
            "flag": {"type": "boolean"}
        }
    }"#;

    #[test]
    fn defaults_are_extracted_recursively() {
        let schema = ConfigSchemaGroup::parse(SCHEMA.as_bytes()).unwrap();
        assert_eq!(schema.properties["kafka"].required, vec!["cpus"]);
        assert_eq!(
            Value::Object(schema.default_config()),
            json!({
                "mesos": {"master": "zk://master.mesos:2181/mesos"},
                "kafka": {"cpus": "0.50", "instances": "3", "brokers": "[\"a\",\"b\"]"},
                "empty": {}
            })
        );
    }

    #[test]
    fn blank_schema_is_empty() {
        let schema = ConfigSchemaGroup::parse(b"  ").unwrap();
        assert!(schema.default_config().is_empty());
    }

    #[test]
    fn malformed_schema_is_upstream() {
        assert!(ConfigSchemaGroup::parse(b"{\"properties\": []}").is_err());
    }
}
