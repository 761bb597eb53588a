//! Knowledge document parsing: `---`-delimited header plus markdown body.
//!
//! The header is a block of `key: value` lines between two `---` lines at the
//! top of the file. `name` and `description` are recognized; every other key
//! is kept as an extra. A file without a leading `---` is all body.

use std::collections::BTreeMap;

/// Parsed header fields of a knowledge document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentHeader {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Remaining header keys, in key order.
    pub extras: BTreeMap<String, String>,
}

/// Splits a document into header and body. Returns a default header when the
/// file does not start with a `---` line or the closing delimiter is missing
/// (the whole text is then the body).
pub fn parse_document(text: &str) -> (DocumentHeader, String) {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return (DocumentHeader::default(), text.to_string()),
    }

    let mut header = DocumentHeader::default();
    let mut consumed = 0usize;
    let mut closed = false;
    for line in lines {
        consumed += 1;
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().to_string();
        match key {
            "name" => header.name = Some(value),
            "description" => header.description = Some(value),
            "" => {}
            _ => {
                header.extras.insert(key.to_string(), value);
            }
        }
    }

    if !closed {
        return (DocumentHeader::default(), text.to_string());
    }

    // Body starts after the closing delimiter line.
    let body: String = text
        .lines()
        .skip(1 + consumed)
        .collect::<Vec<_>>()
        .join("\n");
    (header, body)
}

impl DocumentHeader {
    /// Re-emits the header block, `name` first, then `description`, then the
    /// extras in key order. Round-trips the key/value pairs of
    /// [`parse_document`] (order-insensitive except `name` first).
    pub fn emit(&self) -> String {
        let mut out = String::from("---\n");
        if let Some(ref name) = self.name {
            out.push_str(&format!("name: {}\n", name));
        }
        if let Some(ref description) = self.description {
            out.push_str(&format!("description: {}\n", description));
        }
        for (k, v) in &self.extras {
            out.push_str(&format!("{}: {}\n", k, v));
        }
        out.push_str("---\n");
        out
    }
}
