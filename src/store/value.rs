//! Parameter values as handed to callers.

use crate::backend::{RawParameter, ValueKind};
use crate::constants::LIST_SEPARATOR;
use serde::Serialize;
use std::fmt;

/// A resolved parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Single(String),
    List(Vec<String>),
}

impl ParameterValue {
    /// The value as a string, if it is not a list
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Single(value) => Some(value),
            ParameterValue::List(_) => None,
        }
    }

    /// The value as a list, if it is one
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParameterValue::Single(_) => None,
            ParameterValue::List(items) => Some(items),
        }
    }
}

impl From<RawParameter> for ParameterValue {
    fn from(raw: RawParameter) -> Self {
        match raw.kind {
            ValueKind::Single => ParameterValue::Single(raw.value),
            // No trimming: "80, 443" keeps the leading space on "443"
            ValueKind::List => ParameterValue::List(
                raw.value
                    .split(LIST_SEPARATOR)
                    .map(ToString::to_string)
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Single(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Single(value)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(items: Vec<String>) -> Self {
        ParameterValue::List(items)
    }
}

impl PartialEq<&str> for ParameterValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Single(value) => f.write_str(value),
            ParameterValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}
