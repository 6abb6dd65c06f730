//! Scoped connection acquisition
//!
//! A [`ConnectionScope`] opens its connection if needed and closes it when
//! dropped, on every exit path.

use procmap_core::{Connection, Result};
use std::ops::{Deref, DerefMut};
use tracing::warn;

/// Owns a connection for the duration of one call
pub struct ConnectionScope<C: Connection> {
    connection: C,
}

impl<C: Connection> ConnectionScope<C> {
    /// Take the connection, opening it when it is closed
    ///
    /// # Errors
    ///
    /// Returns the provider's error if opening fails.
    pub fn open(connection: C) -> Result<Self> {
        let mut scope = ConnectionScope { connection };
        if !scope.connection.is_open() {
            scope.connection.open()?;
        }
        Ok(scope)
    }
}

impl<C: Connection> Deref for ConnectionScope<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.connection
    }
}

impl<C: Connection> DerefMut for ConnectionScope<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

impl<C: Connection> Drop for ConnectionScope<C> {
    fn drop(&mut self) {
        if !self.connection.is_open() {
            return;
        }
        if let Err(e) = self.connection.close() {
            warn!(
                target: "procmap::mapper",
                connection = self.connection.connection_string(),
                error = %e,
                "Failed to close connection"
            );
        }
    }
}
