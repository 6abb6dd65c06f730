//! Core type descriptors
//!
//! This module defines:
//! - Kind: closed set of primitive value kinds
//! - SqlType: a kind plus the nullable-wrapper flag
//! - Direction: stored procedure parameter direction

use crate::value::Value;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Primitive value kind
///
/// The numeric kinds line up with the classic CLR primitives used by the
/// coercion matrix: `U8` is byte, `I8` sbyte, `I16` short, `U16` ushort,
/// `I32` int, `U32` uint, `I64` long, `U64` ulong, `F32` float,
/// `F64` double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    /// Boolean
    Bool,
    /// Unicode scalar value
    Char,
    /// 8-bit signed integer
    I8,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit signed integer
    I16,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit signed integer
    I32,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit signed integer
    I64,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// 96-bit fixed point decimal
    Decimal,
    /// UTF-8 string
    String,
    /// Raw bytes
    Bytes,
    /// Date and time without offset
    DateTime,
    /// GUID
    Uuid,
}

impl Kind {
    /// Every kind, in declaration order
    pub const ALL: [Kind; 17] = [
        Kind::Bool,
        Kind::Char,
        Kind::I8,
        Kind::U8,
        Kind::I16,
        Kind::U16,
        Kind::I32,
        Kind::U32,
        Kind::I64,
        Kind::U64,
        Kind::F32,
        Kind::F64,
        Kind::Decimal,
        Kind::String,
        Kind::Bytes,
        Kind::DateTime,
        Kind::Uuid,
    ];

    /// The numeric kinds covered by the coercion matrix
    pub const NUMERIC: [Kind; 12] = [
        Kind::Char,
        Kind::I8,
        Kind::U8,
        Kind::I16,
        Kind::U16,
        Kind::I32,
        Kind::U32,
        Kind::I64,
        Kind::U64,
        Kind::F32,
        Kind::F64,
        Kind::Decimal,
    ];

    /// Get the kind name as a string
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Char => "char",
            Kind::I8 => "i8",
            Kind::U8 => "u8",
            Kind::I16 => "i16",
            Kind::U16 => "u16",
            Kind::I32 => "i32",
            Kind::U32 => "u32",
            Kind::I64 => "i64",
            Kind::U64 => "u64",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Decimal => "decimal",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::DateTime => "datetime",
            Kind::Uuid => "uuid",
        }
    }

    /// Integral kinds (excluding char)
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Kind::I8 | Kind::U8 | Kind::I16 | Kind::U16 | Kind::I32 | Kind::U32 | Kind::I64 | Kind::U64
        )
    }

    /// Floating point kinds
    pub fn is_float(self) -> bool {
        matches!(self, Kind::F32 | Kind::F64)
    }

    /// Any kind that participates in numeric conversion
    pub fn is_numeric(self) -> bool {
        self.is_integral() || self.is_float() || self == Kind::Decimal
    }

    /// The zero value of this kind
    pub fn zero(self) -> Value {
        match self {
            Kind::Bool => Value::Bool(false),
            Kind::Char => Value::Char('\0'),
            Kind::I8 => Value::I8(0),
            Kind::U8 => Value::U8(0),
            Kind::I16 => Value::I16(0),
            Kind::U16 => Value::U16(0),
            Kind::I32 => Value::I32(0),
            Kind::U32 => Value::U32(0),
            Kind::I64 => Value::I64(0),
            Kind::U64 => Value::U64(0),
            Kind::F32 => Value::F32(0.0),
            Kind::F64 => Value::F64(0.0),
            Kind::Decimal => Value::Decimal(Decimal::ZERO),
            Kind::String => Value::String(String::new()),
            Kind::Bytes => Value::Bytes(Vec::new()),
            Kind::DateTime => Value::DateTime(NaiveDateTime::default()),
            Kind::Uuid => Value::Uuid(Uuid::nil()),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of a column, parameter, or property
///
/// `nullable` plays the role of a nullable wrapper around the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlType {
    /// Underlying primitive kind
    pub kind: Kind,
    /// Whether the type admits `Null`
    pub nullable: bool,
}

impl SqlType {
    /// Non-nullable type of the given kind
    pub const fn of(kind: Kind) -> Self {
        SqlType {
            kind,
            nullable: false,
        }
    }

    /// Nullable type of the given kind
    pub const fn nullable(kind: Kind) -> Self {
        SqlType {
            kind,
            nullable: true,
        }
    }

    /// The same kind wrapped as nullable
    pub const fn to_nullable(self) -> Self {
        SqlType::nullable(self.kind)
    }

    /// The underlying non-nullable type
    pub const fn underlying(self) -> Self {
        SqlType::of(self.kind)
    }

    /// Zero value of the declared type (`Null` for nullable types)
    pub fn default_value(self) -> Value {
        if self.nullable {
            Value::Null
        } else {
            self.kind.zero()
        }
    }

    /// Check whether a runtime value matches this type exactly
    pub fn accepts(self, value: &Value) -> bool {
        match value.kind() {
            None => self.nullable,
            Some(kind) => kind == self.kind,
        }
    }
}

impl From<Kind> for SqlType {
    fn from(kind: Kind) -> Self {
        SqlType::of(kind)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// Stored procedure parameter direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Value flows into the procedure
    Input,
    /// Value is produced by the procedure
    Output,
    /// Value flows both ways
    InputOutput,
    /// The procedure's integer return value
    ReturnValue,
}

impl Direction {
    /// Directions whose post-execution value is meaningful to the caller
    pub fn is_output(self) -> bool {
        !matches!(self, Direction::Input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_type_display() {
        assert_eq!(SqlType::of(Kind::I32).to_string(), "i32");
        assert_eq!(SqlType::nullable(Kind::Decimal).to_string(), "decimal?");
    }

    #[test]
    fn test_default_value_of_nullable_is_null() {
        assert_eq!(SqlType::nullable(Kind::I64).default_value(), Value::Null);
        assert_eq!(SqlType::of(Kind::I64).default_value(), Value::I64(0));
        assert_eq!(
            SqlType::of(Kind::String).default_value(),
            Value::String(String::new())
        );
    }

    #[test]
    fn test_accepts_exact_kind_only() {
        let ty = SqlType::of(Kind::I32);
        assert!(ty.accepts(&Value::I32(5)));
        assert!(!ty.accepts(&Value::I64(5)));
        assert!(!ty.accepts(&Value::Null));
        assert!(ty.to_nullable().accepts(&Value::Null));
    }

    #[test]
    fn test_zero_matches_kind() {
        for kind in Kind::ALL {
            assert_eq!(kind.zero().kind(), Some(kind));
        }
    }

    #[test]
    fn test_direction_is_output() {
        assert!(!Direction::Input.is_output());
        assert!(Direction::Output.is_output());
        assert!(Direction::InputOutput.is_output());
        assert!(Direction::ReturnValue.is_output());
    }
}
