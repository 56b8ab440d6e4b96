//! Typed property values and their wire literals.
//!
//! The property tree exposes a closed set of value kinds. A request records
//! which kind it expects back; the response literal is then decoded as that
//! kind. Formatting is stable and round-trippable: doubles use Rust's
//! shortest round-trip `Display`, long/int are base-10 signed decimal, and
//! bools are `true`/`false` on the way out (with `1`/`0` accepted on the
//! way in, since the server prints bools either way depending on the node).

use crate::error::ProtocolError;
use std::fmt;

/// The closed set of value kinds a property node can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// UTF-8 text.
    String,
    /// 64-bit float.
    Double,
    /// 64-bit signed integer.
    Long,
    /// 32-bit signed integer.
    Int,
    /// Boolean.
    Bool,
}

impl ValueKind {
    /// Lowercase protocol tag for this kind, as printed by the server.
    pub fn tag(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Double => "double",
            ValueKind::Long => "long",
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
        }
    }

    /// Decode a wire literal as this kind.
    pub fn decode(self, literal: &str) -> Result<PropertyValue, ProtocolError> {
        let bad = || ProtocolError::BadLiteral {
            kind: self,
            literal: literal.to_string(),
        };
        match self {
            ValueKind::String => Ok(PropertyValue::String(literal.to_string())),
            ValueKind::Double => literal
                .parse::<f64>()
                .map(PropertyValue::Double)
                .map_err(|_| bad()),
            ValueKind::Long => literal
                .parse::<i64>()
                .map(PropertyValue::Long)
                .map_err(|_| bad()),
            ValueKind::Int => literal
                .parse::<i32>()
                .map(PropertyValue::Int)
                .map_err(|_| bad()),
            ValueKind::Bool => match literal.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(PropertyValue::Bool(true)),
                "false" | "0" => Ok(PropertyValue::Bool(false)),
                _ => Err(bad()),
            },
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A typed value as carried on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// UTF-8 text.
    String(String),
    /// 64-bit float.
    Double(f64),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit signed integer.
    Int(i32),
    /// Boolean, written as `true`/`false`.
    Bool(bool),
}

impl PropertyValue {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::String(_) => ValueKind::String,
            PropertyValue::Double(_) => ValueKind::Double,
            PropertyValue::Long(_) => ValueKind::Long,
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Bool(_) => ValueKind::Bool,
        }
    }
}

impl fmt::Display for PropertyValue {
    /// Wire literal for a `set` command.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            // `{}` on f64 is the shortest representation that parses back
            // to the same bits, so set-then-get round-trips exactly.
            PropertyValue::Double(v) => write!(f, "{}", v),
            PropertyValue::Long(v) => write!(f, "{}", v),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => f.write_str(if *v { "true" } else { "false" }),
        }
    }
}
