//! Procedure signature cache
//!
//! Discovers the ordered parameter list of a stored procedure once per
//! `(connection, procedure, include_return_value)` and hands out independent
//! copies on every lookup. Cached signatures are never mutated.

use dashmap::DashMap;
use procmap_core::{Connection, Direction, Error, ParameterDescriptor, Result, Value};
use std::sync::Arc;
use tracing::debug;

/// Suffix appended to the cache key when the return-value slot is kept
const INCLUDE_RETURN_VALUE_SUFFIX: &str = ":includeReturnValue";

/// Cache of discovered procedure signatures
///
/// # Thread Safety
///
/// Lookups and first inserts may race from many threads. Two threads missing
/// on the same key both derive the signature; the first insert wins and both
/// receive copies of the winner.
#[derive(Debug)]
pub struct SignatureCache {
    entries: DashMap<String, Arc<Vec<ParameterDescriptor>>>,
    marker: char,
}

impl SignatureCache {
    /// Create an empty cache stripping `marker` from wire parameter names
    pub fn new(marker: char) -> Self {
        SignatureCache {
            entries: DashMap::new(),
            marker,
        }
    }

    /// Parameter name marker stripped from wire names
    pub fn marker(&self) -> char {
        self.marker
    }

    /// Cache key for a procedure on a connection
    pub fn key(connection: &str, procedure: &str, include_return_value: bool) -> String {
        format!(
            "{}:{}{}",
            connection,
            procedure,
            if include_return_value {
                INCLUDE_RETURN_VALUE_SUFFIX
            } else {
                ""
            }
        )
    }

    /// Get a fresh copy of a procedure's parameter set
    ///
    /// On a miss the provider derives the parameters. The return-value slot
    /// at index 0 is dropped unless `include_return_value` is set,
    /// `InputOutput` parameters are treated as `Output`, and every value
    /// starts as `Null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the connection identity or the
    /// procedure name is empty, or whatever the provider reports on
    /// derivation failure.
    pub fn parameter_set<C: Connection + ?Sized>(
        &self,
        connection: &mut C,
        procedure: &str,
        include_return_value: bool,
    ) -> Result<Vec<ParameterDescriptor>> {
        if connection.connection_string().is_empty() {
            return Err(Error::invalid_argument("connection", "connection string is empty"));
        }
        if procedure.is_empty() {
            return Err(Error::invalid_argument("procedure", "procedure name is empty"));
        }

        let key = Self::key(connection.connection_string(), procedure, include_return_value);
        if let Some(cached) = self.entries.get(&key) {
            return Ok(cached.value().as_ref().clone());
        }

        let discovered = Arc::new(self.discover(connection, procedure, include_return_value)?);
        let winner = Arc::clone(self.entries.entry(key).or_insert(discovered).value());
        Ok(winner.as_ref().clone())
    }

    fn discover<C: Connection + ?Sized>(
        &self,
        connection: &mut C,
        procedure: &str,
        include_return_value: bool,
    ) -> Result<Vec<ParameterDescriptor>> {
        let mut parameters = connection.derive_parameters(procedure)?;

        if !include_return_value
            && parameters
                .first()
                .map_or(false, |p| p.direction == Direction::ReturnValue)
        {
            parameters.remove(0);
        }

        let parameters: Vec<_> = parameters
            .into_iter()
            .map(|mut p| {
                if p.direction == Direction::InputOutput {
                    p.direction = Direction::Output;
                }
                p.value = Value::Null;
                p.strip_marker(self.marker)
            })
            .collect();

        debug!(
            target: "procmap::signature",
            procedure,
            parameters = parameters.len(),
            include_return_value,
            "Discovered procedure signature"
        );
        Ok(parameters)
    }

    /// Number of cached signatures
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new('@')
    }
}
