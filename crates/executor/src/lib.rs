//! # procmap executor
//!
//! Runs named stored procedures and maps their results to typed entities.
//!
//! This is the crate applications use. It provides:
//! - [`Mapper`] - the orchestrator with its signature, projection and entity caches
//! - [`EntityReader`] - the lazy entity sequence returned by reads
//! - [`MapperConfig`] / [`ReadOptions`] - configuration via `procmap.toml` and per-call overrides
//! - [`memory`] - an in-process provider for tests and demos
//!
//! ## Entry Points
//!
//! | Method | Returns | Output parameters copied to bag |
//! |--------|---------|---------------------------------|
//! | `execute_non_query` | affected rows | yes |
//! | `execute_scalar` | first column of first row | yes |
//! | `execute_reader` | lazy `Result<E>` per row | no |
//! | `execute_reader_single` | first row or `E::default()` | no |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod mapper;
pub mod memory;
mod reader;
mod scope;

pub use config::{MapperConfig, ReadOptions, CONFIG_FILE_NAME};
pub use mapper::Mapper;
pub use reader::EntityReader;
pub use scope::ConnectionScope;

// Re-exported so applications depend on this crate alone
pub use procmap_core::{
    entity, Column, Command, Connection, Direction, Entity, EntityDescriptor, EntityKind, Error,
    Kind, Mapped, ParameterDescriptor, Result, Row, RowReader, SqlType, TypeCoercion, Value,
};
pub use procmap_params::{PartialParam, PartialParams, RETURN_VALUE_KEY};
