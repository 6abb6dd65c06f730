//! Partial parameter bag
//!
//! A concurrency-safe name → entry map holding every value of a call that
//! has no corresponding entity property: parameters supplied outside the
//! entity, result columns with no matching property, output parameters and
//! the procedure's return value.
//!
//! The bag is created by the caller, passed by reference through a call,
//! and can be reused for later calls.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use procmap_core::{Direction, Error, Mapped, Result, SqlType, TypeCoercion, Value};
use std::fmt;
use std::sync::Arc;

/// Wire name of the return-value parameter
pub const RETURN_VALUE_PARAMETER: &str = "RETURN_VALUE";

/// Bag key the return value is copied to after execution
pub const RETURN_VALUE_KEY: &str = "ReturnValue";

/// One named value in a [`PartialParams`] bag
#[derive(Debug, Clone, PartialEq)]
pub struct PartialParam {
    name: String,
    sql_type: SqlType,
    value: Value,
    direction: Direction,
}

impl PartialParam {
    /// Create an entry
    pub fn new(sql_type: SqlType, name: impl Into<String>, value: Value, direction: Direction) -> Self {
        PartialParam {
            name: name.into(),
            sql_type,
            value,
            direction,
        }
    }

    /// Entry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    /// Direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Stored value as-is
    pub fn raw_value(&self) -> &Value {
        &self.value
    }

    /// Stored value, or the declared type's zero value when `Null`
    pub fn value(&self) -> Value {
        if self.value.is_null() {
            self.sql_type.default_value()
        } else {
            self.value.clone()
        }
    }

    fn same_as(&self, sql_type: SqlType, value: &Value, direction: Direction) -> bool {
        same_value(&self.value, value) && self.sql_type == sql_type && self.direction == direction
    }
}

/// Value equality where NaN equals NaN
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::F32(x), Value::F32(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::F64(x), Value::F64(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => a == b,
    }
}

/// Concurrency-safe bag of partial parameters
///
/// # Thread Safety
///
/// Every method takes `&self`. Concurrent adds and reads never corrupt the
/// bag; the interleaving order of concurrent adds is unspecified.
#[derive(Default)]
pub struct PartialParams {
    entries: DashMap<String, Arc<PartialParam>>,
}

impl PartialParams {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry
    ///
    /// An existing entry holding an equal value with the same type and
    /// direction is kept as-is; otherwise it is replaced.
    pub fn add(&self, sql_type: SqlType, name: &str, value: Value, direction: Direction) {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().same_as(sql_type, &value, direction) {
                    occupied.insert(Arc::new(PartialParam::new(sql_type, name, value, direction)));
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(PartialParam::new(sql_type, name, value, direction)));
            }
        }
    }

    /// Typed form of [`add`](Self::add); the declared type comes from `T`
    pub fn add_typed<T: Mapped>(&self, name: &str, value: T, direction: Direction) {
        self.add(T::sql_type(), name, value.to_value(), direction);
    }

    /// Get an entry
    pub fn get(&self, name: &str) -> Option<Arc<PartialParam>> {
        self.entries.get(name).map(|e| Arc::clone(e.value()))
    }

    /// Whether an entry exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Value of an entry
    ///
    /// Returns the declared type's zero value when the stored value is
    /// `Null`, and `Null` when there is no entry.
    pub fn get_value(&self, name: &str) -> Value {
        self.get(name).map(|e| e.value()).unwrap_or(Value::Null)
    }

    /// Typed value of an entry, converting with the standard coercion engine
    ///
    /// See [`get_value_with`](Self::get_value_with).
    pub fn get_value_as<T: Mapped + Default>(&self, name: &str, implicit_cast_only: bool) -> Result<T> {
        self.get_value_with(name, implicit_cast_only, TypeCoercion::standard())
    }

    /// Typed value of an entry
    ///
    /// Absent entries and `Null` values yield `T::default()`. With
    /// `implicit_cast_only` the stored value must already be a `T`; otherwise
    /// the coercion engine converts it when the stored type is castable to
    /// `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cast`] naming both types when the value cannot be
    /// converted, or [`Error::Overflow`] when it does not fit.
    pub fn get_value_with<T: Mapped + Default>(
        &self,
        name: &str,
        implicit_cast_only: bool,
        coercion: &TypeCoercion,
    ) -> Result<T> {
        let entry = match self.get(name) {
            Some(entry) => entry,
            None => return Ok(T::default()),
        };
        let value = entry.value();
        if value.is_null() {
            return Ok(T::default());
        }
        if implicit_cast_only {
            return T::from_value(value);
        }

        let to = T::sql_type();
        let from = SqlType::of(value.kind().unwrap_or(entry.sql_type.kind));
        if !coercion.is_castable_to(from, to) {
            return Err(Error::cast(from, to));
        }
        T::from_value(coercion.cast_to(&value, to)?)
    }

    /// The procedure's return value, 0 when absent
    ///
    /// Looks up `RETURN_VALUE` first, then its renamed form `ReturnValue`.
    pub fn return_value(&self) -> i32 {
        let entry = self
            .get(RETURN_VALUE_PARAMETER)
            .or_else(|| self.get(RETURN_VALUE_KEY));
        match entry.map(|e| e.value()) {
            None | Some(Value::Null) => 0,
            Some(value) => TypeCoercion::standard()
                .cast_to(&value, SqlType::of(procmap_core::Kind::I32))
                .ok()
                .and_then(|v| i32::from_value(v).ok())
                .unwrap_or(0),
        }
    }

    /// Snapshot of all entries
    pub fn parameters(&self) -> Vec<Arc<PartialParam>> {
        self.entries.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Remove an entry
    pub fn remove(&self, name: &str) -> Option<Arc<PartialParam>> {
        self.entries.remove(name).map(|(_, entry)| entry)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PartialParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for entry in self.entries.iter() {
            map.entry(entry.key(), entry.value().raw_value());
        }
        map.finish()
    }
}
