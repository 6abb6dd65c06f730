//! Per-call parameter state for procmap
//!
//! - [`PartialParams`]: the side-channel bag for values with no entity property
//! - [`SignatureCache`]: discovered stored procedure signatures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod partial;
pub mod signature;

pub use partial::{PartialParam, PartialParams, RETURN_VALUE_KEY, RETURN_VALUE_PARAMETER};
pub use signature::SignatureCache;
