//! Structural merge and scalar coercion over configuration trees.

use serde_json::{Map, Value};
use tracing::warn;

/// A configuration object keyed by option name.
pub type ConfigMap = Map<String, Value>;

/// Coerce a value for template substitution.
///
/// Arrays become their compact JSON text. Numbers declared `integer` are
/// truncated and printed base-10; numbers declared `number` get two decimals.
/// Strings pass through, so coercion is idempotent under repeated merging.
pub fn transform_value(value: Value, declared_type: &str) -> Value {
    match value {
        Value::Array(items) => match serde_json::to_string(&items) {
            Ok(text) => Value::String(text),
            Err(e) => {
                warn!(error = %e, "could not serialise array config value");
                Value::Array(items)
            }
        },
        Value::Number(n) => match (declared_type, n.as_f64()) {
            ("integer", Some(f)) => Value::String(format!("{}", f.trunc() as i64)),
            ("number", Some(f)) => Value::String(format!("{:.2}", f)),
            _ => Value::Number(n),
        },
        other => other,
    }
}

/// Right-biased recursive merge of `overlay` into `base`.
///
/// Where both sides hold an object the merge recurses; otherwise the overlay
/// value replaces the base value after coercion.
pub fn merge_config(mut base: ConfigMap, overlay: &ConfigMap) -> ConfigMap {
    for (key, value) in overlay {
        let merged = match (base.remove(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                Value::Object(merge_config(existing, incoming))
            }
            _ => transform_value(value.clone(), ""),
        };
        base.insert(key.clone(), merged);
    }
    base
}

/// Look up a dotted path such as `mantl.load-balancer`.
pub fn lookup<'a>(config: &'a ConfigMap, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(config.get(first)?, |node, segment| node.get(segment))
}

pub fn lookup_str<'a>(config: &'a ConfigMap, path: &str) -> Option<&'a str> {
    lookup(config, path).and_then(Value::as_str)
}
