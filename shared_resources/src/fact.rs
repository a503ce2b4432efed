use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::topic::Topic;

/// A state fact is either integer-valued or boolean-valued. Both travel as
/// their plain string form; the receiver decides how to parse by topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactValue {
    Int(i32),
    Bool(bool),
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Int(value) => write!(f, "{}", value),
            FactValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// Topic to value table produced by one poll.
pub type FactTable = BTreeMap<Topic, FactValue>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("expected an integer payload, got `{0}`")]
    NotAnInteger(String),
    #[error("expected `true` or `false`, got `{0}`")]
    NotABoolean(String),
}

pub fn parse_int(payload: &str) -> Result<i32, PayloadError> {
    payload
        .trim()
        .parse()
        .map_err(|_| PayloadError::NotAnInteger(payload.to_string()))
}

pub fn parse_bool(payload: &str) -> Result<bool, PayloadError> {
    match payload.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(PayloadError::NotABoolean(payload.to_string())),
    }
}
