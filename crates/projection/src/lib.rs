//! Row-to-entity projections for procmap
//!
//! [`Projection`] is the compiled mapping from one result row to one entity;
//! [`ProjectionCache`] keeps one per `(procedure, entity type)`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod projection;

pub use cache::ProjectionCache;
pub use projection::Projection;
