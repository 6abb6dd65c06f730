//! Bridge between Rust field types and [`Value`]
//!
//! [`Mapped`] is implemented for every primitive kind and for `Option<T>`,
//! which maps to the nullable form of `T`'s type. Extraction is exact: a
//! value of another kind is a cast error, conversion is the coercion
//! engine's job.
//!
//! Enums that are stored as integers implement `Mapped` by hand and return
//! `true` from [`Mapped::is_enum`]:
//!
//! ```
//! use procmap_core::{Error, Kind, Mapped, Result, SqlType, Value};
//!
//! #[derive(Debug, Default, Clone, Copy, PartialEq)]
//! enum Status { #[default] Active, Closed }
//!
//! impl Mapped for Status {
//!     fn sql_type() -> SqlType { SqlType::of(Kind::I32) }
//!     fn from_value(value: Value) -> Result<Self> {
//!         match value {
//!             Value::I32(0) => Ok(Status::Active),
//!             Value::I32(1) => Ok(Status::Closed),
//!             other => Err(Error::cast(other.type_name(), "Status")),
//!         }
//!     }
//!     fn to_value(&self) -> Value { Value::I32(*self as i32) }
//!     fn is_enum() -> bool { true }
//! }
//! ```

use crate::error::{Error, Result};
use crate::types::{Kind, SqlType};
use crate::value::Value;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A Rust type that can be stored in and read from a [`Value`]
pub trait Mapped: Sized {
    /// Declared type of this Rust type
    fn sql_type() -> SqlType;

    /// Extract from a value of exactly this type
    fn from_value(value: Value) -> Result<Self>;

    /// Convert to a value
    fn to_value(&self) -> Value;

    /// Whether this type is an enum stored as its underlying kind
    fn is_enum() -> bool {
        false
    }
}

macro_rules! impl_mapped {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Mapped for $ty {
                fn sql_type() -> SqlType {
                    SqlType::of(Kind::$kind)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$kind(v) => Ok(v),
                        other => Err(Error::cast(other.type_name(), Kind::$kind)),
                    }
                }

                fn to_value(&self) -> Value {
                    Value::$kind(self.clone())
                }
            }
        )*
    };
}

impl_mapped! {
    bool => Bool,
    char => Char,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    String => String,
    Vec<u8> => Bytes,
    NaiveDateTime => DateTime,
    Uuid => Uuid,
}

impl<T: Mapped> Mapped for Option<T> {
    fn sql_type() -> SqlType {
        T::sql_type().to_nullable()
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn is_enum() -> bool {
        T::is_enum()
    }
}
