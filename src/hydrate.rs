//! Decoding of JSON-lines responses into entities.
//!
//! Each facade method names the entity kind it expects; the kind's
//! [`Hydrate`] impl turns one decoded JSON object into that entity and wires
//! in its owner.

use serde_json::{Map, Value};

use crate::error::{KwError, Result};

/// A decoded JSON object, used for actions whose shape is left opaque.
pub type JsonObject = Map<String, Value>;

/// An entity that can be built from one response line.
pub trait Hydrate: Sized {
    /// What the entity keeps a reference to (project, server, or nothing).
    type Owner;

    /// Entity name used in decode errors.
    const KIND: &'static str;

    /// Build the entity from one decoded object.
    fn hydrate(owner: &Self::Owner, object: JsonObject) -> serde_json::Result<Self>;
}

impl Hydrate for JsonObject {
    type Owner = ();
    const KIND: &'static str = "object";

    fn hydrate(_owner: &(), object: JsonObject) -> serde_json::Result<Self> {
        Ok(object)
    }
}

/// Decode every non-blank line of `body` as `T`, preserving order.
///
/// # Errors
///
/// Returns [`KwError::MalformedResponse`] at the first line that is not a
/// JSON object or does not decode as `T`; later lines are not read.
pub fn hydrate_lines<T: Hydrate>(body: &str, owner: &T::Owner) -> Result<Vec<T>> {
    let malformed = |line: usize, message: String| KwError::MalformedResponse {
        kind: T::KIND,
        line,
        message,
    };

    let mut items = Vec::new();
    for (index, line) in body.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let object = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(object)) => object,
            Ok(other) => {
                return Err(malformed(
                    line_no,
                    format!("expected a JSON object, got {}", json_type(&other)),
                ))
            }
            Err(e) => return Err(malformed(line_no, e.to_string())),
        };
        let item = T::hydrate(owner, object).map_err(|e| malformed(line_no, e.to_string()))?;
        items.push(item);
    }
    Ok(items)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
