//! The document tree handed to the normalizer.
//!
//! Parsing is delegated to `serde_json`, built with `preserve_order` so object
//! keys keep their document order and `arbitrary_precision` so numbers keep
//! their lexical text. The parser's nesting limit is switched off, and the
//! parsed tree is moved into [`Value`] (the only shape the rest of the crate
//! looks at) without recursion.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::borrow::Cow;
use std::io::{BufRead, Write};

/// A parsed JSON document node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Ordered `(key, value)` pairs; keys are unique within one object.
    Object(Vec<(String, Value)>),
    Array(Vec<Value>),
    String(String),
    /// Original lexical text of the number, e.g. `1.50` or `1e3`.
    Number(String),
    Bool(bool),
    Null,
}

impl Value {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Text form of a scalar, `None` for containers.
    ///
    /// Strings and numbers come back verbatim, booleans as `true`/`false`
    /// and null as the empty string.
    pub fn stringify(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) | Value::Number(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Bool(true) => Some(Cow::Borrowed("true")),
            Value::Bool(false) => Some(Cow::Borrowed("false")),
            Value::Null => Some(Cow::Borrowed("")),
            Value::Object(_) | Value::Array(_) => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
        }
    }

    /// Write an indented dump of the tree, one node per line.
    pub fn write_tree<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        // (label, node, depth); explicit stack so deep documents don't recurse
        let mut stack: Vec<(Option<&str>, &Value, usize)> = vec![(None, self, 0)];

        while let Some((label, node, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            if let Some(key) = label {
                writeln!(out, "{indent}{key}:")?;
            }
            let indent = if label.is_some() {
                "  ".repeat(depth + 1)
            } else {
                indent
            };
            let child_depth = if label.is_some() { depth + 2 } else { depth + 1 };

            match node {
                Value::Object(fields) => {
                    writeln!(out, "{indent}OBJECT:")?;
                    for (key, value) in fields.iter().rev() {
                        stack.push((Some(key.as_str()), value, child_depth));
                    }
                }
                Value::Array(items) => {
                    writeln!(out, "{indent}ARRAY:")?;
                    for item in items.iter().rev() {
                        stack.push((None, item, child_depth));
                    }
                }
                Value::String(s) => writeln!(out, "{indent}STRING: \"{s}\"")?,
                Value::Number(n) => writeln!(out, "{indent}NUMBER: {n}")?,
                Value::Bool(b) => writeln!(out, "{indent}BOOLEAN: {b}")?,
                Value::Null => writeln!(out, "{indent}NULL")?,
            }
        }

        Ok(())
    }
}

impl Drop for Value {
    // the derived drop would recurse once per nesting level
    fn drop(&mut self) {
        let mut pending = match self {
            Value::Object(fields) if !fields.is_empty() => {
                fields.drain(..).map(|(_, v)| v).collect::<Vec<_>>()
            }
            Value::Array(items) if !items.is_empty() => std::mem::take(items),
            _ => return,
        };

        while let Some(mut value) = pending.pop() {
            match &mut value {
                Value::Object(fields) => pending.extend(fields.drain(..).map(|(_, v)| v)),
                Value::Array(items) => pending.append(items),
                _ => {}
            }
        }
    }
}

/// A container being rebuilt from parser output: converted children so far,
/// plus the ones still to visit.
enum Builder {
    Object {
        fields: Vec<(String, Value)>,
        pending: serde_json::map::IntoIter,
        key: String,
    },
    Array {
        items: Vec<Value>,
        pending: std::vec::IntoIter<serde_json::Value>,
    },
}

impl Builder {
    fn next_child(&mut self) -> Option<serde_json::Value> {
        match self {
            Builder::Object { pending, key, .. } => pending.next().map(|(k, v)| {
                *key = k;
                v
            }),
            Builder::Array { pending, .. } => pending.next(),
        }
    }

    fn push(&mut self, value: Value) {
        match self {
            Builder::Object { fields, key, .. } => fields.push((std::mem::take(key), value)),
            Builder::Array { items, .. } => items.push(value),
        }
    }

    fn finish(self) -> Value {
        match self {
            Builder::Object { fields, .. } => Value::Object(fields),
            Builder::Array { items, .. } => Value::Array(items),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        let mut stack: Vec<Builder> = Vec::new();
        let mut current = value;

        loop {
            let mut done = match current {
                serde_json::Value::Object(map) => {
                    stack.push(Builder::Object {
                        fields: Vec::with_capacity(map.len()),
                        pending: map.into_iter(),
                        key: String::new(),
                    });
                    None
                }
                serde_json::Value::Array(items) => {
                    stack.push(Builder::Array {
                        items: Vec::with_capacity(items.len()),
                        pending: items.into_iter(),
                    });
                    None
                }
                serde_json::Value::String(s) => Some(Value::String(s)),
                serde_json::Value::Number(n) => Some(Value::Number(n.to_string())),
                serde_json::Value::Bool(b) => Some(Value::Bool(b)),
                serde_json::Value::Null => Some(Value::Null),
            };

            // hand finished nodes upwards until a container has a child left
            loop {
                let Some(top) = stack.last_mut() else {
                    return done.unwrap_or(Value::Null);
                };
                if let Some(value) = done.take() {
                    top.push(value);
                }
                match top.next_child() {
                    Some(child) => {
                        current = child;
                        break;
                    }
                    None => done = stack.pop().map(Builder::finish),
                }
            }
        }
    }
}

/// Parse one JSON text with no nesting limit.
fn parse_unbounded(bytes: &[u8]) -> Result<Value> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    deserializer.disable_recursion_limit();
    let value = serde_json::Value::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value.into())
}

/// Parse a single JSON document.
pub fn parse_document(bytes: &[u8]) -> Result<Value> {
    parse_unbounded(bytes)
}

/// Parse newline-delimited JSON, one document per non-empty line.
pub fn parse_ndjson<R: BufRead>(reader: R) -> Result<Vec<Value>> {
    let mut documents = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(Error::Read)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        documents.push(parse_unbounded(line.as_bytes())?);
    }

    Ok(documents)
}
