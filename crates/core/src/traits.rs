//! Connection abstraction
//!
//! The physical database transport is an external collaborator. This module
//! defines the narrow surface the mapper needs from it: open/close,
//! parameter derivation for a named stored procedure, and three execution
//! modes (non-query, scalar, reader).
//!
//! Providers implement [`Connection`] and [`RowReader`]; everything above
//! this layer is provider agnostic.

use crate::error::Result;
use crate::types::{Direction, SqlType};
use crate::value::Value;

/// One declared parameter of a stored procedure
///
/// `wire_name` is the provider's spelling including the marker prefix
/// (`@CustomerId`); `name` is the bare form used to match bag keys and entity
/// properties. Cloning yields a fully independent copy.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    /// Name without the marker prefix
    pub name: String,
    /// Name as the provider spells it
    pub wire_name: String,
    /// Declared type
    pub sql_type: SqlType,
    /// Parameter direction
    pub direction: Direction,
    /// Current value, `Null` when unset
    pub value: Value,
}

impl ParameterDescriptor {
    /// Create a descriptor with no value
    pub fn new(wire_name: impl Into<String>, sql_type: SqlType, direction: Direction) -> Self {
        let wire_name = wire_name.into();
        ParameterDescriptor {
            name: wire_name.clone(),
            wire_name,
            sql_type,
            direction,
            value: Value::Null,
        }
    }

    /// Set `name` to the wire name with the marker prefix removed
    pub fn strip_marker(mut self, marker: char) -> Self {
        self.name = self.wire_name.trim_start_matches(marker).to_string();
        self
    }

    /// Builder-style value assignment
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }
}

/// A stored procedure invocation
///
/// Parameters are bound in signature order. After execution the provider
/// writes output values back into the bound descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    procedure: String,
    parameters: Vec<ParameterDescriptor>,
}

impl Command {
    /// Create a command for a stored procedure
    pub fn new(procedure: impl Into<String>) -> Self {
        Command {
            procedure: procedure.into(),
            parameters: Vec::new(),
        }
    }

    /// Stored procedure name
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    /// Bind the next parameter
    pub fn bind(&mut self, parameter: ParameterDescriptor) {
        self.parameters.push(parameter);
    }

    /// Bound parameters in signature order
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Bound parameters, for providers writing output values
    pub fn parameters_mut(&mut self) -> &mut [ParameterDescriptor] {
        &mut self.parameters
    }

    /// Find a bound parameter by bare name
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Drop every bound parameter
    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }
}

/// Name and declared type of a result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name as returned by the provider
    pub name: String,
    /// Declared type
    pub sql_type: SqlType,
}

impl Column {
    /// Create a column descriptor
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Column {
            name: name.into(),
            sql_type,
        }
    }
}

/// One result row, values in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    /// Create a row from column values
    pub fn new(values: Vec<Value>) -> Self {
        Row(values)
    }

    /// Value at a column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no values
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying values
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row(values)
    }
}

/// Forward-only cursor over a result set
pub trait RowReader {
    /// Columns of the result set
    fn columns(&self) -> &[Column];

    /// Advance to the next row, `None` once exhausted
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails while reading.
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Database connection capable of running stored procedures
///
/// All methods are synchronous. A connection is used by one call at a time;
/// the mapper itself is shared across threads.
pub trait Connection: Send {
    /// Identity of the target database, used to key cached signatures
    fn connection_string(&self) -> &str;

    /// Whether the connection is open
    fn is_open(&self) -> bool;

    /// Open the connection
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot connect.
    fn open(&mut self) -> Result<()>;

    /// Close the connection
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to release the connection.
    fn close(&mut self) -> Result<()>;

    /// Create a stored procedure command
    fn create_command(&self, procedure: &str) -> Command {
        Command::new(procedure)
    }

    /// Ask the provider for the declared parameters of a procedure
    ///
    /// Parameters are returned in declaration order. When the provider
    /// reports a return-value slot, it is at index 0.
    fn derive_parameters(&mut self, procedure: &str) -> Result<Vec<ParameterDescriptor>>;

    /// Execute and return the number of affected rows
    fn execute_non_query(&mut self, command: &mut Command) -> Result<i64>;

    /// Execute and return the first column of the first row
    fn execute_scalar(&mut self, command: &mut Command) -> Result<Value>;

    /// Execute and return a cursor over the result set
    fn execute_reader(&mut self, command: &mut Command) -> Result<Box<dyn RowReader + Send>>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn connection_string(&self) -> &str {
        (**self).connection_string()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn create_command(&self, procedure: &str) -> Command {
        (**self).create_command(procedure)
    }

    fn derive_parameters(&mut self, procedure: &str) -> Result<Vec<ParameterDescriptor>> {
        (**self).derive_parameters(procedure)
    }

    fn execute_non_query(&mut self, command: &mut Command) -> Result<i64> {
        (**self).execute_non_query(command)
    }

    fn execute_scalar(&mut self, command: &mut Command) -> Result<Value> {
        (**self).execute_scalar(command)
    }

    fn execute_reader(&mut self, command: &mut Command) -> Result<Box<dyn RowReader + Send>> {
        (**self).execute_reader(command)
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn connection_string(&self) -> &str {
        (**self).connection_string()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn create_command(&self, procedure: &str) -> Command {
        (**self).create_command(procedure)
    }

    fn derive_parameters(&mut self, procedure: &str) -> Result<Vec<ParameterDescriptor>> {
        (**self).derive_parameters(procedure)
    }

    fn execute_non_query(&mut self, command: &mut Command) -> Result<i64> {
        (**self).execute_non_query(command)
    }

    fn execute_scalar(&mut self, command: &mut Command) -> Result<Value> {
        (**self).execute_scalar(command)
    }

    fn execute_reader(&mut self, command: &mut Command) -> Result<Box<dyn RowReader + Send>> {
        (**self).execute_reader(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Kind;

    #[test]
    fn test_strip_marker() {
        let p = ParameterDescriptor::new("@CustomerId", SqlType::of(Kind::I32), Direction::Input)
            .strip_marker('@');
        assert_eq!(p.name, "CustomerId");
        assert_eq!(p.wire_name, "@CustomerId");
        assert_eq!(p.value, Value::Null);
    }

    #[test]
    fn test_clone_is_independent() {
        let original =
            ParameterDescriptor::new("@Total", SqlType::of(Kind::Decimal), Direction::Output);
        let mut copy = original.clone();
        copy.value = Value::I32(1);
        assert_eq!(original.value, Value::Null);
    }

    #[test]
    fn test_command_binding_order() {
        let mut cmd = Command::new("usp_Get");
        cmd.bind(ParameterDescriptor::new("@A", SqlType::of(Kind::I32), Direction::Input).strip_marker('@'));
        cmd.bind(ParameterDescriptor::new("@B", SqlType::of(Kind::I32), Direction::Input).strip_marker('@'));
        let names: Vec<_> = cmd.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(cmd.parameter("B").is_some());
        cmd.clear_parameters();
        assert!(cmd.parameters().is_empty());
    }

    #[test]
    fn test_row_access() {
        let row = Row::new(vec![Value::I32(1), Value::Null]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(1), Some(&Value::Null));
        assert_eq!(row.get(2), None);
    }
}
