//! Traversal of loaded benchmark records.
//!
//! Records are kept as generic [`serde_json::Value`] trees, every field is
//! reached through a [`KeyPath`] instead of a fixed schema.

use serde_json::Value;
use thiserror::Error;

use crate::{spec::KeyPath, util::mean};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Missing key `{segment}` of path `{path}`")]
    MissingKey { path: String, segment: String },
    #[error("Cannot index {kind} with `{segment}` of path `{path}`")]
    NotAnObject {
        path: String,
        segment: String,
        kind: &'static str,
    },
}

/// Follows `path` through nested objects
pub fn resolve<'a>(record: &'a Value, path: &KeyPath) -> Result<&'a Value, LookupError> {
    let mut current = record;
    for segment in path.segments() {
        let object = current.as_object().ok_or_else(|| LookupError::NotAnObject {
            path: path.to_string(),
            segment: segment.clone(),
            kind: kind_name(current),
        })?;
        current = object.get(segment).ok_or_else(|| LookupError::MissingKey {
            path: path.to_string(),
            segment: segment.clone(),
        })?;
    }
    Ok(current)
}

/// String form used for filtering and labels: strings verbatim, anything else as JSON text
pub fn to_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    Scalar(f64),
    /// All samples of a list valued metric, nested lists flattened
    Series(Vec<f64>),
}

impl Measurement {
    /// Returns `None` when the value holds something other than finite numbers
    pub fn classify(value: &Value) -> Option<Self> {
        match value {
            Value::Number(_) | Value::String(_) => finite_number(value).map(Measurement::Scalar),
            Value::Array(_) => {
                let mut samples = Vec::new();
                flatten_into(value, &mut samples)?;
                Some(Measurement::Series(samples))
            }
            _ => None,
        }
    }

    /// The scalar itself, or the arithmetic mean of a series. `None` if the
    /// mean is undefined or overflows.
    pub fn reduce(&self) -> Option<f64> {
        let value = match self {
            Measurement::Scalar(v) => Some(*v),
            Measurement::Series(samples) => mean(samples),
        };
        value.filter(|v| v.is_finite())
    }
}

fn flatten_into(value: &Value, samples: &mut Vec<f64>) -> Option<()> {
    match value {
        Value::Array(items) => items.iter().try_for_each(|x| flatten_into(x, samples)),
        Value::Number(_) | Value::String(_) => {
            samples.push(finite_number(value)?);
            Some(())
        }
        _ => None,
    }
}

/// A JSON number or numeric string, rejecting `inf` and `NaN` spellings
fn finite_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}
