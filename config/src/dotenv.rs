//! `.env` parsing for the layer stack.
//!
//! One `KEY=VALUE` pair per line, with the shapes shell users actually write:
//! blank lines and `#` comment lines are skipped, an `export ` prefix is
//! accepted, keys and values are trimmed, and one layer of surrounding quotes
//! is stripped (double quotes honor `\"`; single quotes are literal). No
//! multiline values, no variable expansion.

use std::collections::HashMap;
use std::path::Path;

/// Parses one line into a key/value pair. `None` for blanks, comments, and
/// anything that is not a `KEY=VALUE` shape.
fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line
        .strip_prefix("export ")
        .map(str::trim_start)
        .unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), unquote(value.trim())))
}

/// Strips one layer of matching surrounding quotes. Double-quoted values
/// unescape `\"`; single-quoted values are taken verbatim; anything else is
/// returned as-is.
fn unquote(value: &str) -> String {
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return inner.replace("\\\"", "\"");
        }
        if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            return inner.to_string();
        }
    }
    value.to_string()
}

/// Loads `.env` from `dir` into a map. Missing file returns an empty map.
pub fn load_env_map(dir: &Path) -> std::io::Result<HashMap<String, String>> {
    let path = dir.join(".env");
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(content.lines().filter_map(parse_line).collect())
}
