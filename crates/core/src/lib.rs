//! Core types and traits for procmap
//!
//! This crate defines the foundational pieces used throughout the system:
//! - Value: tagged union over the supported primitive kinds
//! - Kind / SqlType: declared types with the nullable-wrapper flag
//! - Direction: stored procedure parameter direction
//! - Mapped: bridge between Rust field types and values
//! - Entity: per-type capability tables (properties, getters, setters)
//! - TypeCoercion: implicit/explicit coercion matrix and runtime conversion
//! - Connection / RowReader: the provider surface the mapper drives
//! - Error: error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coerce;
pub mod entity;
pub mod error;
pub mod mapped;
pub mod traits;
pub mod types;
pub mod value;

pub use coerce::{CoercionMatrix, Conversion, TypeCoercion};
pub use entity::{Entity, EntityDescriptor, EntityKind, EntityRegistry, Getter, Property, Setter};
pub use error::{Error, Result};
pub use mapped::Mapped;
pub use traits::{Column, Command, Connection, ParameterDescriptor, Row, RowReader};
pub use types::{Direction, Kind, SqlType};
pub use value::Value;
