//! Saved form data

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Saved value of one form control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    String(String),
}

impl FieldValue {
    /// Truthiness used when a value is restored into a checkbox or radio
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::String(s) => f.write_str(s),
        }
    }
}

/// Field name to saved value, stored as a plain JSON object
pub type FormSnapshot = BTreeMap<String, FieldValue>;
