//! Structural contract for upstream payloads.
//!
//! A [`Shape`] describes what a JSON document must look like. Validation is
//! total and strict: every required field must be present with the declared
//! kind, fixed-length arrays must match their length exactly, and nothing is
//! coerced (a numeric string is not a number). Fields the shape does not
//! mention are ignored, so additive upstream changes pass through.

pub mod shapes;

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Shape descriptor for one JSON location.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Number,
    Bool,
    /// Array of `items`; `len` pins an exact element count.
    Array { items: Box<Shape>, len: Option<usize> },
    /// Object with named fields; unknown keys are ignored.
    Object(Vec<Field>),
    /// Object with arbitrary keys whose values all share one shape.
    Record(Box<Shape>),
}

/// A named object member.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub shape: Shape,
    pub required: bool,
}

impl Field {
    pub fn required(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            required: true,
        }
    }

    /// An optional member may be absent or `null`; when present it must match.
    pub fn optional(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            required: false,
        }
    }
}

impl Shape {
    pub fn array(items: Shape) -> Self {
        Shape::Array {
            items: Box::new(items),
            len: None,
        }
    }

    pub fn fixed_array(items: Shape, len: usize) -> Self {
        Shape::Array {
            items: Box::new(items),
            len: Some(len),
        }
    }

    pub fn object(fields: Vec<Field>) -> Self {
        Shape::Object(fields)
    }

    pub fn record(values: Shape) -> Self {
        Shape::Record(Box::new(values))
    }

    /// Check `value` against this shape.
    ///
    /// Returns the first violation found, with a JSON path rooted at `$`.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.check(value, "$")
    }

    pub fn expected_kind(&self) -> ExpectedKind {
        match self {
            Shape::String => ExpectedKind::String,
            Shape::Number => ExpectedKind::Number,
            Shape::Bool => ExpectedKind::Bool,
            Shape::Array { len: Some(n), .. } => ExpectedKind::FixedArray(*n),
            Shape::Array { len: None, .. } => ExpectedKind::Array,
            Shape::Object(_) | Shape::Record(_) => ExpectedKind::Object,
        }
    }

    fn check(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        match (self, value) {
            (Shape::String, Value::String(_))
            | (Shape::Number, Value::Number(_))
            | (Shape::Bool, Value::Bool(_)) => Ok(()),
            (Shape::Array { items, len }, Value::Array(elems)) => {
                if let Some(n) = len {
                    if elems.len() != *n {
                        return Err(self.mismatch(value, path));
                    }
                }
                for (i, elem) in elems.iter().enumerate() {
                    items.check(elem, &format!("{}[{}]", path, i))?;
                }
                Ok(())
            }
            (Shape::Object(fields), Value::Object(map)) => {
                for field in fields {
                    let child = format!("{}.{}", path, field.name);
                    match map.get(field.name) {
                        Some(Value::Null) if !field.required => {}
                        Some(v) => field.shape.check(v, &child)?,
                        None if field.required => {
                            return Err(ValidationError {
                                path: child,
                                expected: field.shape.expected_kind(),
                                actual: ValueKind::Missing,
                            });
                        }
                        None => {}
                    }
                }
                Ok(())
            }
            (Shape::Record(values), Value::Object(map)) => {
                for (key, v) in map {
                    values.check(v, &format!("{}.{}", path, key))?;
                }
                Ok(())
            }
            _ => Err(self.mismatch(value, path)),
        }
    }

    fn mismatch(&self, value: &Value, path: &str) -> ValidationError {
        ValidationError {
            path: path.to_string(),
            expected: self.expected_kind(),
            actual: ValueKind::of(value),
        }
    }
}

// ─── Error ───────────────────────────────────────────────────────────────────

/// What a shape required at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    String,
    Number,
    Bool,
    Array,
    FixedArray(usize),
    Object,
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedKind::String => write!(f, "string"),
            ExpectedKind::Number => write!(f, "number"),
            ExpectedKind::Bool => write!(f, "boolean"),
            ExpectedKind::Array => write!(f, "array"),
            ExpectedKind::FixedArray(n) => write!(f, "array of length {}", n),
            ExpectedKind::Object => write!(f, "object"),
        }
    }
}

/// What was actually found at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Missing,
    Null,
    Bool,
    Number,
    String,
    Array(usize),
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(a) => ValueKind::Array(a.len()),
            Value::Object(_) => ValueKind::Object,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Missing => write!(f, "missing"),
            ValueKind::Null => write!(f, "null"),
            ValueKind::Bool => write!(f, "boolean"),
            ValueKind::Number => write!(f, "number"),
            ValueKind::String => write!(f, "string"),
            ValueKind::Array(n) => write!(f, "array of length {}", n),
            ValueKind::Object => write!(f, "object"),
        }
    }
}

/// A payload that broke its contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("at `{path}`: expected {expected}, found {actual}")]
pub struct ValidationError {
    pub path: String,
    pub expected: ExpectedKind,
    pub actual: ValueKind,
}
