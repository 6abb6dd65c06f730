//! Type coercion engine
//!
//! Decides whether a value of one declared type may be assigned to another,
//! and performs the conversion. `is_castable_to` composes five checks, in
//! order:
//!
//! 1. Direct assignability (same kind, nullable destination or non-nullable source)
//! 2. Implicit numeric/char widening per the static matrix
//! 3. Explicit numeric narrowing per the static matrix
//! 4. A trial conversion of the source kind's zero value
//! 5. A user-registered conversion for the kind pair
//!
//! The matrix is built once per process and never mutated afterwards.

use crate::error::{Error, Result};
use crate::types::{Kind, SqlType};
use crate::value::{decimal_from_f64, Value};
use chrono::NaiveDateTime;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Static coercion matrix
// ============================================================================

static MATRIX: Lazy<CoercionMatrix> = Lazy::new(CoercionMatrix::new);

/// Implicit and explicit numeric conversion relations
#[derive(Debug, Clone)]
pub struct CoercionMatrix {
    implicit: HashMap<Kind, HashSet<Kind>>,
    explicit: HashMap<Kind, HashSet<Kind>>,
}

impl CoercionMatrix {
    /// Build the relations
    pub fn new() -> Self {
        use Kind::*;

        let implicit = relation(&[
            (U8, &[I16, U16, I32, U32, I64, U64, F32, F64, Decimal]),
            (I8, &[I16, I32, I64, F32, F64, Decimal]),
            (I16, &[I32, I64, F32, F64, Decimal]),
            (U16, &[I32, U32, I64, U64, F32, F64, Decimal]),
            (I32, &[I64, F32, F64, Decimal]),
            (U32, &[I64, U64, F32, F64, Decimal]),
            (I64, &[F32, F64, Decimal]),
            (U64, &[F32, F64, Decimal]),
            (F32, &[F64]),
            (Char, &[U16, I32, U32, I64, U64, F32, F64, Decimal]),
        ]);

        // Float and decimal to integral narrowing is not listed; those pairs
        // are only reachable through the trial conversion.
        let explicit = relation(&[
            (U8, &[I8, Char]),
            (I8, &[U8, U16, U32, U64, Char]),
            (I16, &[I8, U8, U16, U32, U64, Char]),
            (U16, &[I8, U8, I16, Char]),
            (I32, &[I8, U8, I16, U16, U32, U64, Char]),
            (U32, &[I8, U8, I16, U16, I32, Char]),
            (I64, &[I8, U8, I16, U16, I32, U32, U64, Char]),
            (U64, &[I8, U8, I16, U16, I32, U32, I64, Char]),
            (F32, &[Decimal]),
            (F64, &[F32, Decimal]),
            (Decimal, &[F32, F64]),
            (Char, &[I8, U8, I16]),
        ]);

        CoercionMatrix { implicit, explicit }
    }

    /// The process-wide matrix
    pub fn global() -> &'static CoercionMatrix {
        &MATRIX
    }

    /// Safe widening conversion, nullable-aware
    pub fn is_implicit(&self, from: SqlType, to: SqlType) -> bool {
        lookup(&self.implicit, from, to)
    }

    /// Lossy but well-defined narrowing conversion, nullable-aware
    pub fn is_explicit(&self, from: SqlType, to: SqlType) -> bool {
        lookup(&self.explicit, from, to)
    }

    /// Destinations implicitly reachable from a kind
    pub fn implicit_targets(&self, from: Kind) -> Option<&HashSet<Kind>> {
        self.implicit.get(&from)
    }

    /// Destinations explicitly reachable from a kind
    pub fn explicit_targets(&self, from: Kind) -> Option<&HashSet<Kind>> {
        self.explicit.get(&from)
    }
}

impl Default for CoercionMatrix {
    fn default() -> Self {
        Self::new()
    }
}

fn relation(rows: &[(Kind, &[Kind])]) -> HashMap<Kind, HashSet<Kind>> {
    rows.iter()
        .map(|(from, to)| (*from, to.iter().copied().collect()))
        .collect()
}

fn lookup(table: &HashMap<Kind, HashSet<Kind>>, from: SqlType, to: SqlType) -> bool {
    if from.nullable && !to.nullable {
        return false;
    }
    table
        .get(&from.kind)
        .map_or(false, |targets| targets.contains(&to.kind))
}

// ============================================================================
// Coercion engine
// ============================================================================

/// A user-defined conversion between two kinds
pub type Conversion = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

static STANDARD: Lazy<TypeCoercion> = Lazy::new(TypeCoercion::new);

/// Coercion engine: static matrix plus registered conversions
pub struct TypeCoercion {
    matrix: &'static CoercionMatrix,
    conversions: DashMap<(Kind, Kind), Conversion>,
}

impl TypeCoercion {
    /// Engine over the process-wide matrix with no registrations
    pub fn new() -> Self {
        TypeCoercion {
            matrix: CoercionMatrix::global(),
            conversions: DashMap::new(),
        }
    }

    /// Shared engine without registrations
    pub fn standard() -> &'static TypeCoercion {
        &STANDARD
    }

    /// The static matrix this engine consults
    pub fn matrix(&self) -> &'static CoercionMatrix {
        self.matrix
    }

    /// Register a conversion, replacing any previous one for the pair
    pub fn register<F>(&self, from: Kind, to: Kind, convert: F)
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.conversions.insert((from, to), Arc::new(convert));
    }

    /// Check whether a conversion is registered for the pair
    pub fn has_conversion(&self, from: Kind, to: Kind) -> bool {
        self.conversions.contains_key(&(from, to))
    }

    /// Same kind, and the destination can hold everything the source can
    pub fn is_assignable(&self, from: SqlType, to: SqlType) -> bool {
        from.kind == to.kind && (to.nullable || !from.nullable)
    }

    /// Check whether `from` can be converted to `to`
    pub fn is_castable_to(&self, from: SqlType, to: SqlType) -> bool {
        self.is_assignable(from, to)
            || self.matrix.is_implicit(from, to)
            || self.matrix.is_explicit(from, to)
            || self.trial_convert(from.kind, to.kind)
            || self.has_conversion(from.kind, to.kind)
    }

    /// Attempt a conversion of the source kind's zero value
    fn trial_convert(&self, from: Kind, to: Kind) -> bool {
        convert(&from.zero(), to).is_ok()
    }

    /// Convert a value to the given type
    ///
    /// Nullable destinations accept `Null`; numeric conversions are range
    /// checked and fail with [`Error::Overflow`].
    pub fn cast_to(&self, value: &Value, to: SqlType) -> Result<Value> {
        let from = match value.kind() {
            None if to.nullable => return Ok(Value::Null),
            None => return Err(Error::cast("null", to)),
            Some(kind) => kind,
        };

        if let Some(conversion) = self.conversions.get(&(from, to.kind)) {
            let conversion = Arc::clone(conversion.value());
            return conversion(value);
        }

        convert(value, to.kind)
    }
}

impl Default for TypeCoercion {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeCoercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCoercion")
            .field("conversions", &self.conversions.len())
            .finish()
    }
}

// ============================================================================
// Runtime conversion
// ============================================================================

/// Numeric view of a value used as an intermediate
enum Number {
    Int(i128),
    Float(f64),
    Dec(Decimal),
}

fn number_of(value: &Value) -> Option<Number> {
    if let Some(i) = value.as_i128() {
        return Some(Number::Int(i));
    }
    match *value {
        Value::F32(f) => Some(Number::Float(f as f64)),
        Value::F64(f) => Some(Number::Float(f)),
        Value::Decimal(d) => Some(Number::Dec(d)),
        Value::Char(c) => Some(Number::Int(c as u32 as i128)),
        Value::Bool(b) => Some(Number::Int(b as i128)),
        _ => None,
    }
}

fn convert(value: &Value, to: Kind) -> Result<Value> {
    let from = value.kind().ok_or_else(|| Error::cast("null", to))?;
    if from == to {
        return Ok(value.clone());
    }
    let unsupported = || Error::cast(from, to);

    if let Value::String(s) = value {
        return parse(s, to);
    }
    if to == Kind::String {
        return match value {
            Value::Bytes(_) => Err(unsupported()),
            other => Ok(Value::String(other.to_string())),
        };
    }

    match to {
        Kind::Bool => match number_of(value) {
            Some(Number::Int(i)) if from != Kind::Char => Ok(Value::Bool(i != 0)),
            Some(Number::Float(f)) => Ok(Value::Bool(f != 0.0)),
            Some(Number::Dec(d)) => Ok(Value::Bool(!d.is_zero())),
            _ => Err(unsupported()),
        },
        Kind::Char => match number_of(value) {
            Some(Number::Int(i)) if from != Kind::Bool => char_from(i, value),
            _ => Err(unsupported()),
        },
        k if k.is_integral() => {
            let n = number_of(value).ok_or_else(unsupported)?;
            integral(n, value, to)
        }
        Kind::F32 | Kind::F64 => {
            let f = match number_of(value).ok_or_else(unsupported)? {
                Number::Int(i) => i as f64,
                Number::Float(f) => f,
                Number::Dec(d) => d.to_f64().ok_or_else(|| Error::overflow(value, to))?,
            };
            if to == Kind::F32 {
                narrow_f32(f).map(Value::F32).ok_or_else(|| Error::overflow(value, to))
            } else {
                Ok(Value::F64(f))
            }
        }
        Kind::Decimal => match number_of(value).ok_or_else(unsupported)? {
            Number::Int(i) => Decimal::try_from_i128_with_scale(i, 0)
                .map(Value::Decimal)
                .map_err(|_| Error::overflow(value, to)),
            Number::Float(f) => decimal_from_f64(f)
                .map(Value::Decimal)
                .ok_or_else(|| Error::overflow(value, to)),
            Number::Dec(d) => Ok(Value::Decimal(d)),
        },
        _ => Err(unsupported()),
    }
}

/// Finite values beyond `f32::MAX` do not fit; NaN and infinities pass through
fn narrow_f32(f: f64) -> Option<f32> {
    if f.is_finite() && f.abs() > f32::MAX as f64 {
        None
    } else {
        Some(f as f32)
    }
}

fn round_half_even(f: f64) -> f64 {
    if (f - f.trunc()).abs() == 0.5 {
        2.0 * (f / 2.0).round()
    } else {
        f.round()
    }
}

fn integral(n: Number, source: &Value, to: Kind) -> Result<Value> {
    let overflow = || Error::overflow(source, to);
    let i = match n {
        Number::Int(i) => i,
        Number::Float(f) => {
            if !f.is_finite() {
                return Err(overflow());
            }
            let r = round_half_even(f);
            // i128 covers every destination range with room to spare
            if r.abs() > 1e30 {
                return Err(overflow());
            }
            r as i128
        }
        Number::Dec(d) => d
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i128()
            .ok_or_else(overflow)?,
    };
    integral_from_i128(i, to).ok_or_else(overflow)
}

fn integral_from_i128(i: i128, to: Kind) -> Option<Value> {
    Some(match to {
        Kind::I8 => Value::I8(i8::try_from(i).ok()?),
        Kind::U8 => Value::U8(u8::try_from(i).ok()?),
        Kind::I16 => Value::I16(i16::try_from(i).ok()?),
        Kind::U16 => Value::U16(u16::try_from(i).ok()?),
        Kind::I32 => Value::I32(i32::try_from(i).ok()?),
        Kind::U32 => Value::U32(u32::try_from(i).ok()?),
        Kind::I64 => Value::I64(i64::try_from(i).ok()?),
        Kind::U64 => Value::U64(u64::try_from(i).ok()?),
        _ => return None,
    })
}

fn char_from(i: i128, source: &Value) -> Result<Value> {
    u32::try_from(i)
        .ok()
        .and_then(char::from_u32)
        .map(Value::Char)
        .ok_or_else(|| Error::overflow(source, Kind::Char))
}

fn parse(s: &str, to: Kind) -> Result<Value> {
    let bad = || Error::cast(Kind::String, to);
    let text = s.trim();
    match to {
        Kind::Bool => match text.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(bad()),
        },
        Kind::Char => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(bad()),
            }
        }
        k if k.is_integral() => {
            let i: i128 = text.parse().map_err(|_| bad())?;
            integral_from_i128(i, to).ok_or_else(|| Error::overflow(text, to))
        }
        Kind::F32 => {
            let f: f64 = text.parse().map_err(|_| bad())?;
            narrow_f32(f)
                .and_then(|_| text.parse::<f32>().ok())
                .map(Value::F32)
                .ok_or_else(|| Error::overflow(text, to))
        }
        Kind::F64 => text.parse::<f64>().map(Value::F64).map_err(|_| bad()),
        Kind::Decimal => text
            .parse::<Decimal>()
            .map(Value::Decimal)
            .map_err(|_| bad()),
        Kind::DateTime => ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .map(Value::DateTime)
            .ok_or_else(bad),
        Kind::Uuid => Uuid::parse_str(text).map(Value::Uuid).map_err(|_| bad()),
        Kind::Bytes => Err(bad()),
        _ => Err(bad()),
    }
}
