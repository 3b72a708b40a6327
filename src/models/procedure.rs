//! Stored-procedure invocation models.
//!
//! This module defines the parameters a caller passes to a procedure and the
//! per-call `ProcedureCall` built from them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A parameter value for a stored-procedure call.
///
/// In JSON, scalars map to the matching JSON type. Bytes and date-times have no
/// JSON type of their own and are written as single-key objects:
/// `{"bytes": "AQID"}` (base64) and `{"datetime": "2024-01-02T03:04:05"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParamValueRepr", into = "ParamValueRepr")]
pub enum ParamValue {
    /// NULL value
    Null,
    /// Boolean value (BIT)
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value (NVARCHAR)
    Text(String),
    /// Binary data (VARBINARY)
    Bytes(Vec<u8>),
    /// Date and time without offset (DATETIME2)
    DateTime(NaiveDateTime),
}

/// JSON shape of `ParamValue`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ParamValueRepr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Tagged(TaggedValue),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TaggedValue {
    #[serde(with = "crate::models::base64_bytes")]
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
}

impl From<ParamValueRepr> for ParamValue {
    fn from(repr: ParamValueRepr) -> Self {
        match repr {
            ParamValueRepr::Null => Self::Null,
            ParamValueRepr::Bool(v) => Self::Bool(v),
            ParamValueRepr::Int(v) => Self::Int(v),
            ParamValueRepr::Float(v) => Self::Float(v),
            ParamValueRepr::Text(v) => Self::Text(v),
            ParamValueRepr::Tagged(TaggedValue::Bytes(v)) => Self::Bytes(v),
            ParamValueRepr::Tagged(TaggedValue::DateTime(v)) => Self::DateTime(v),
        }
    }
}

impl From<ParamValue> for ParamValueRepr {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Null => Self::Null,
            ParamValue::Bool(v) => Self::Bool(v),
            ParamValue::Int(v) => Self::Int(v),
            ParamValue::Float(v) => Self::Float(v),
            ParamValue::Text(v) => Self::Text(v),
            ParamValue::Bytes(v) => Self::Tagged(TaggedValue::Bytes(v)),
            ParamValue::DateTime(v) => Self::Tagged(TaggedValue::DateTime(v)),
        }
    }
}

impl ParamValue {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::DateTime(_) => "datetime",
        }
    }

    /// Parse a command-line literal: JSON scalars first, raw text otherwise.
    pub fn parse_literal(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Null) => Self::Null,
            Ok(serde_json::Value::Bool(b)) => Self::Bool(b),
            Ok(serde_json::Value::Number(n)) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Text(raw.to_string())),
            },
            Ok(serde_json::Value::String(s)) => Self::Text(s),
            _ => Self::Text(raw.to_string()),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Direction of a stored-procedure parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamDirection {
    #[default]
    Input,
    /// Value is written by the procedure; the supplied value only fixes its type
    Output,
    InputOutput,
}

impl ParamDirection {
    /// Whether the procedure writes a value back into this parameter.
    pub fn returns_value(&self) -> bool {
        matches!(self, Self::Output | Self::InputOutput)
    }
}

/// A named, directed parameter of a stored-procedure call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureParam {
    /// Parameter name, with or without a leading '@'. Empty binds positionally.
    pub name: String,
    pub value: ParamValue,
    #[serde(default)]
    pub direction: ParamDirection,
}

impl ProcedureParam {
    /// Create an input parameter.
    pub fn input(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: ParamDirection::Input,
        }
    }

    /// Create an output parameter; `value` determines the variable's type.
    pub fn output(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: ParamDirection::Output,
        }
    }

    /// Create an input/output parameter.
    pub fn input_output(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: ParamDirection::InputOutput,
        }
    }

    /// Parameter name without the leading '@'.
    pub fn bare_name(&self) -> &str {
        self.name.strip_prefix('@').unwrap_or(&self.name)
    }
}

/// One stored-procedure invocation. Built per call and dropped when it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    name: String,
    params: Vec<ProcedureParam>,
}

impl ProcedureCall {
    /// Create a call. Returns `None` when the procedure name is empty.
    pub fn new(name: impl Into<String>, params: Vec<ProcedureParam>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            return None;
        }
        Some(Self { name, params })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ProcedureParam] {
        &self.params
    }

    /// Parameters the procedure writes back, in declaration order.
    pub fn output_params(&self) -> impl Iterator<Item = &ProcedureParam> {
        self.params.iter().filter(|p| p.direction.returns_value())
    }

    pub fn has_output_params(&self) -> bool {
        self.output_params().next().is_some()
    }
}
