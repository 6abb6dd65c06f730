//! End-to-end tests
//!
//! Cross-crate tests through the `procmap` facade, organized by concern:
//! - Properties: the observable guarantees of each cache and the bag
//! - Entities: inheritance, enums, read-only properties, user conversions
//! - Config: loading `procmap.toml` and applying it to a mapper

mod common;

mod config;
mod entities;
mod properties;
