//! Declared argument schemas for the built-in tools.
//!
//! Each tool declares its named arguments and their primitive kinds. The same
//! declaration drives two things: the JSON schema sent to the backend, and
//! validation of the raw argument payload into typed [`ToolArgs`] before the
//! handler runs.

use std::collections::HashMap;
use std::str::FromStr;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::inference::byte_sequence::ByteSequence;
use crate::inference::types::{FunctionDefinition, ToolDefinition};

use super::keys::{KeyCode, ScrollDirection};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why a tool call's arguments were rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("arguments are not a JSON object: {reason}")]
    InvalidJson { reason: String },

    #[error("missing required argument '{name}'")]
    Missing { name: &'static str },

    #[error("argument '{name}' should be {expected}")]
    WrongType {
        name: &'static str,
        expected: &'static str,
    },

    #[error("argument '{name}' has unknown value '{value}'")]
    UnknownVariant { name: &'static str, value: String },

    #[error("argument '{name}' is out of range: {value}")]
    OutOfRange { name: &'static str, value: i64 },
}

// ─── Declarations ────────────────────────────────────────────────────────────

/// Primitive kind of one argument.
#[derive(Debug, Clone, Copy)]
pub enum ArgKind {
    String,
    Integer,
    /// A key name from [`KeyCode::NAMES`]. Too many to list in the schema.
    Key,
    /// One of a short list of names, listed in the schema.
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub description: &'static str,
}

impl ArgSpec {
    pub const fn new(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }
}

/// Name, description and arguments of one tool. All arguments are required.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
}

impl ToolSpec {
    /// The function definition sent to the backend.
    pub fn definition(&self) -> ToolDefinition {
        let mut properties = Map::new();
        for arg in self.args {
            let schema = match arg.kind {
                ArgKind::String | ArgKind::Key => {
                    json!({"type": "string", "description": arg.description})
                }
                ArgKind::Integer => json!({"type": "integer", "description": arg.description}),
                ArgKind::Enum(names) => {
                    json!({"type": "string", "enum": names, "description": arg.description})
                }
            };
            properties.insert(arg.name.to_string(), schema);
        }
        let required: Vec<&str> = self.args.iter().map(|a| a.name).collect();

        ToolDefinition {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.to_string(),
                description: self.description.to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }),
            },
        }
    }

    /// Parse and type-check a raw payload against the declared arguments.
    ///
    /// An empty payload is treated as `{}`. Extra fields are ignored.
    pub fn validate(&self, raw: &ByteSequence) -> Result<ToolArgs, ArgumentError> {
        let object: Map<String, Value> = if raw.is_empty() {
            Map::new()
        } else {
            serde_json::from_reader(raw.reader()).map_err(|e| ArgumentError::InvalidJson {
                reason: e.to_string(),
            })?
        };

        let mut values = HashMap::with_capacity(self.args.len());
        for arg in self.args {
            let value = object
                .get(arg.name)
                .filter(|v| !v.is_null())
                .ok_or(ArgumentError::Missing { name: arg.name })?;
            values.insert(arg.name, ArgValue::check(arg, value)?);
        }

        Ok(ToolArgs { values })
    }
}

// ─── Validated arguments ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum ArgValue {
    Str(String),
    Int(i64),
    Key(KeyCode),
}

impl ArgValue {
    fn check(spec: &ArgSpec, value: &Value) -> Result<Self, ArgumentError> {
        match spec.kind {
            ArgKind::String => value
                .as_str()
                .map(|s| ArgValue::Str(s.to_string()))
                .ok_or(ArgumentError::WrongType {
                    name: spec.name,
                    expected: "a string",
                }),
            ArgKind::Integer => value.as_i64().map(ArgValue::Int).ok_or(ArgumentError::WrongType {
                name: spec.name,
                expected: "an integer",
            }),
            ArgKind::Key => {
                let s = value.as_str().ok_or(ArgumentError::WrongType {
                    name: spec.name,
                    expected: "a key name",
                })?;
                KeyCode::from_str(s)
                    .map(ArgValue::Key)
                    .map_err(|_| ArgumentError::UnknownVariant {
                        name: spec.name,
                        value: s.to_string(),
                    })
            }
            ArgKind::Enum(names) => {
                let s = value.as_str().ok_or(ArgumentError::WrongType {
                    name: spec.name,
                    expected: "a string",
                })?;
                if names.contains(&s) {
                    Ok(ArgValue::Str(s.to_string()))
                } else {
                    Err(ArgumentError::UnknownVariant {
                        name: spec.name,
                        value: s.to_string(),
                    })
                }
            }
        }
    }
}

/// Arguments that passed validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: HashMap<&'static str, ArgValue>,
}

impl ToolArgs {
    pub fn str(&self, name: &'static str) -> Result<&str, ArgumentError> {
        match self.values.get(name) {
            Some(ArgValue::Str(s)) => Ok(s),
            Some(_) => Err(ArgumentError::WrongType {
                name,
                expected: "a string",
            }),
            None => Err(ArgumentError::Missing { name }),
        }
    }

    /// An integer narrowed to `T`, rejecting values that do not fit.
    pub fn int<T: TryFrom<i64>>(&self, name: &'static str) -> Result<T, ArgumentError> {
        match self.values.get(name) {
            Some(ArgValue::Int(i)) => {
                T::try_from(*i).map_err(|_| ArgumentError::OutOfRange { name, value: *i })
            }
            Some(_) => Err(ArgumentError::WrongType {
                name,
                expected: "an integer",
            }),
            None => Err(ArgumentError::Missing { name }),
        }
    }

    pub fn key(&self, name: &'static str) -> Result<KeyCode, ArgumentError> {
        match self.values.get(name) {
            Some(ArgValue::Key(k)) => Ok(*k),
            Some(_) => Err(ArgumentError::WrongType {
                name,
                expected: "a key name",
            }),
            None => Err(ArgumentError::Missing { name }),
        }
    }

    pub fn direction(&self, name: &'static str) -> Result<ScrollDirection, ArgumentError> {
        let s = self.str(name)?;
        ScrollDirection::from_str(s).map_err(|_| ArgumentError::UnknownVariant {
            name,
            value: s.to_string(),
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
