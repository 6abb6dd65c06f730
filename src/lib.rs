//! procmap - stored procedure entity mapper
//!
//! Executes named stored procedures and maps result rows to typed entities.
//! Values with no matching entity property (extra result columns, output
//! parameters, the return value) land in a [`PartialParams`] bag the caller
//! keeps.
//!
//! # Quick Start
//!
//! ```ignore
//! use procmap::{entity, Mapper, PartialParams, ReadOptions};
//!
//! #[derive(Debug, Default)]
//! struct Customer { id: i32, name: String }
//! entity!(Customer { "Id" => id, "Name" => name });
//!
//! let mapper = Mapper::default();
//! let bag = PartialParams::new();
//! let customers: Vec<Customer> = mapper
//!     .execute_reader(connection, "usp_Customers", Some(&bag), None, ReadOptions::default())?
//!     .collect::<Result<_, _>>()?;
//! ```
//!
//! # Architecture
//!
//! Every call goes through the [`Mapper`], which owns the signature cache,
//! the projection cache and the entity registry. The connection itself is
//! supplied by the caller through the [`Connection`] trait.

// Re-export the public API from procmap-executor
pub use procmap_executor::*;
