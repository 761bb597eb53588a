//! Flatten a YAML config document into the uppercase-snake key namespace.
//!
//! Mappings nest with `__`; sequences of scalars join with commas so list
//! options can equally come from an environment variable. Nested sequences or
//! mappings inside sequences are not flattened (they stay reachable through
//! [`Layers::tree`](crate::Layers::tree) for per-agent extras).

use std::collections::HashMap;
use std::path::Path;

use serde_yaml::Value;

use crate::LoadError;

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn flatten_into(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(key) = k.as_str() else { continue };
                let key = key.to_uppercase().replace(['-', '.'], "_");
                let full = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}__{key}")
                };
                flatten_into(&full, v, out);
            }
        }
        Value::Sequence(items) => {
            let joined: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            if joined.len() == items.len() && !prefix.is_empty() {
                out.insert(prefix.to_string(), joined.join(","));
            }
        }
        other => {
            if prefix.is_empty() {
                return;
            }
            if let Some(s) = scalar_to_string(other) {
                out.insert(prefix.to_string(), s);
            }
        }
    }
}

/// Reads and flattens one YAML file. Missing file → empty map and `Null` tree;
/// unreadable or invalid file → [`LoadError`].
pub fn load_flattened(path: &Path) -> Result<(HashMap<String, String>, Value), LoadError> {
    if !path.is_file() {
        return Ok((HashMap::new(), Value::Null));
    }
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let tree: Value = serde_yaml::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut out = HashMap::new();
    flatten_into("", &tree, &mut out);
    Ok((out, tree))
}
