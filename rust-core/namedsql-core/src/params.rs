// SPDX-License-Identifier: PMPL-1.0-or-later
//! Argument values and name-to-position binding.
//!
//! A translated statement carries its parameter names in placeholder order.
//! Binding walks that list and pulls each value out of a caller-supplied map,
//! so a name used twice binds the same value at both positions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NamedSqlError, Result};

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// A UTF-8 string value.
    String(String),
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// Raw bytes (BLOB / BINARY).
    Bytes(Vec<u8>),
    /// An explicit SQL NULL.
    Null,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => write!(f, "'{}'", s),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            ParamValue::Null => write!(f, "NULL"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(value: Vec<u8>) -> Self {
        ParamValue::Bytes(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

/// Order named arguments by placeholder position.
///
/// Statements without placeholders bind to an empty list whatever the map
/// holds. Statements with placeholders but no names are positional and
/// cannot be bound by name.
pub(crate) fn bind_named(
    names: &[String],
    parameter_count: usize,
    args: &HashMap<String, ParamValue>,
) -> Result<Vec<ParamValue>> {
    if parameter_count == 0 {
        return Ok(Vec::new());
    }
    if names.is_empty() {
        return Err(NamedSqlError::NotNamed);
    }

    names
        .iter()
        .map(|name| {
            args.get(name)
                .cloned()
                .ok_or_else(|| NamedSqlError::MissingParameter(name.clone()))
        })
        .collect()
}

/// Check a positional argument list against the placeholder count.
pub(crate) fn bind_positional(
    parameter_count: usize,
    args: Vec<ParamValue>,
) -> Result<Vec<ParamValue>> {
    if args.len() != parameter_count {
        return Err(NamedSqlError::ParameterCountMismatch {
            expected: parameter_count,
            provided: args.len(),
        });
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bind_named_orders_by_position() {
        let mut args = HashMap::new();
        args.insert("y".to_string(), ParamValue::Int(2));
        args.insert("x".to_string(), ParamValue::Int(1));

        let bound = bind_named(&names(&["x", "y", "x"]), 3, &args).unwrap();
        assert_eq!(
            bound,
            vec![ParamValue::Int(1), ParamValue::Int(2), ParamValue::Int(1)]
        );
    }

    #[test]
    fn test_bind_named_missing_parameter() {
        let args = HashMap::new();
        let err = bind_named(&names(&["id"]), 1, &args).unwrap_err();
        assert_eq!(err, NamedSqlError::MissingParameter("id".to_string()));
    }

    #[test]
    fn test_bind_named_positional_statement() {
        let args = HashMap::new();
        assert_eq!(bind_named(&[], 2, &args).unwrap_err(), NamedSqlError::NotNamed);
        assert!(bind_named(&[], 0, &args).unwrap().is_empty());
    }

    #[test]
    fn test_bind_positional_count() {
        let ok = bind_positional(2, vec![ParamValue::Null, ParamValue::Bool(true)]);
        assert_eq!(ok.unwrap().len(), 2);

        let err = bind_positional(2, vec![ParamValue::Null]).unwrap_err();
        assert_eq!(
            err,
            NamedSqlError::ParameterCountMismatch {
                expected: 2,
                provided: 1
            }
        );
    }

    #[test]
    fn test_param_value_conversions_and_display() {
        assert_eq!(ParamValue::from("a"), ParamValue::String("a".to_string()));
        assert_eq!(ParamValue::from(7i32), ParamValue::Int(7));
        assert_eq!(ParamValue::from(None::<i64>), ParamValue::Null);
        assert_eq!(ParamValue::from(Some(true)), ParamValue::Bool(true));

        assert_eq!(ParamValue::String("x".to_string()).to_string(), "'x'");
        assert_eq!(ParamValue::Bytes(vec![1, 2, 3]).to_string(), "bytes[3]");
        assert_eq!(ParamValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_param_value_serde_roundtrip() {
        let values = vec![
            ParamValue::String("hello".to_string()),
            ParamValue::Int(42),
            ParamValue::Float(2.5),
            ParamValue::Bool(false),
            ParamValue::Bytes(vec![0xde, 0xad]),
            ParamValue::Null,
        ];
        for value in &values {
            let json = serde_json::to_string(value).unwrap();
            let parsed: ParamValue = serde_json::from_str(&json).unwrap();
            assert_eq!(&parsed, value);
        }
    }
}
