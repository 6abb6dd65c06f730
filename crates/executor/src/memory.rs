//! In-process provider
//!
//! [`MemoryDatabase`] holds stored procedures declared as a parameter list
//! plus a body closure. [`MemoryConnection`] implements [`Connection`]
//! against it, reporting the return-value slot at index 0 the way SQL
//! Server style providers do. The database counts derivations, opens and
//! closes and records every executed procedure, which makes it the test
//! double for everything above the connection layer.
//!
//! ```
//! use procmap_core::{Direction, Kind, ParameterDescriptor, SqlType, Value};
//! use procmap_executor::memory::{MemoryDatabase, ResultSet};
//!
//! let db = MemoryDatabase::new("memory://orders");
//! db.define(
//!     "usp_Count",
//!     vec![ParameterDescriptor::new("@Total", SqlType::of(Kind::I32), Direction::Output)],
//!     |call| {
//!         call.set_output("Total", Value::I32(3));
//!         Ok(ResultSet::new().affected(0))
//!     },
//! );
//! assert!(db.has_procedure("usp_Count"));
//! ```

use dashmap::DashMap;
use parking_lot::Mutex;
use procmap_core::{
    Column, Command, Connection, Direction, Error, Kind, ParameterDescriptor, Result, Row,
    RowReader, SqlType, Value,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static NULL: Value = Value::Null;

/// Procedure body
pub type ProcedureBody = Arc<dyn Fn(&mut ProcedureCall<'_>) -> Result<ResultSet> + Send + Sync>;

/// Outcome of one procedure execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    rows_affected: i64,
    columns: Vec<Column>,
    rows: Vec<Row>,
    return_value: i32,
}

impl ResultSet {
    /// Empty result, zero rows affected, return value 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the affected-row count
    pub fn affected(mut self, rows: i64) -> Self {
        self.rows_affected = rows;
        self
    }

    /// Set the result columns
    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Append a row
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(Row::new(values));
        self
    }

    /// Set the procedure's return value
    pub fn returning(mut self, value: i32) -> Self {
        self.return_value = value;
        self
    }
}

/// Bound parameters as seen by a procedure body
pub struct ProcedureCall<'a> {
    parameters: &'a mut [ParameterDescriptor],
}

impl ProcedureCall<'_> {
    /// Value bound to a parameter (bare name), `Null` when absent
    pub fn input(&self, name: &str) -> &Value {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
            .unwrap_or(&NULL)
    }

    /// Write an output value; ignored for input-only or unbound parameters
    pub fn set_output(&mut self, name: &str, value: Value) {
        if let Some(p) = self
            .parameters
            .iter_mut()
            .find(|p| p.name == name && p.direction.is_output())
        {
            p.value = value;
        }
    }
}

struct Procedure {
    parameters: Vec<ParameterDescriptor>,
    body: ProcedureBody,
}

/// In-process database of stored procedures
pub struct MemoryDatabase {
    connection_string: String,
    marker: char,
    procedures: DashMap<String, Arc<Procedure>>,
    derivations: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl MemoryDatabase {
    /// Create an empty database using the `@` parameter marker
    pub fn new(connection_string: impl Into<String>) -> Arc<Self> {
        Self::with_marker(connection_string, '@')
    }

    /// Create an empty database with a custom parameter marker
    pub fn with_marker(connection_string: impl Into<String>, marker: char) -> Arc<Self> {
        Arc::new(MemoryDatabase {
            connection_string: connection_string.into(),
            marker,
            procedures: DashMap::new(),
            derivations: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Declare or replace a procedure
    ///
    /// `parameters` carry their wire names (with the marker); the
    /// return-value slot is added automatically.
    pub fn define<F>(&self, name: &str, parameters: Vec<ParameterDescriptor>, body: F)
    where
        F: Fn(&mut ProcedureCall<'_>) -> Result<ResultSet> + Send + Sync + 'static,
    {
        let parameters = parameters
            .into_iter()
            .map(|p| p.strip_marker(self.marker))
            .collect();
        self.procedures.insert(
            name.to_string(),
            Arc::new(Procedure {
                parameters,
                body: Arc::new(body),
            }),
        );
    }

    /// Whether a procedure is declared
    pub fn has_procedure(&self, name: &str) -> bool {
        self.procedures.contains_key(name)
    }

    /// Open a new (closed) connection to this database
    pub fn connect(self: &Arc<Self>) -> MemoryConnection {
        MemoryConnection {
            db: Arc::clone(self),
            open: false,
        }
    }

    /// Number of parameter derivations served
    pub fn derivations(&self) -> usize {
        self.derivations.load(Ordering::SeqCst)
    }

    /// Number of connection opens
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of connection closes
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Executed procedure names in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn procedure(&self, name: &str) -> Result<Arc<Procedure>> {
        self.procedures
            .get(name)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| Error::database(format!("Could not find stored procedure '{}'", name)))
    }

    fn return_slot(&self) -> ParameterDescriptor {
        ParameterDescriptor::new(
            format!("{}RETURN_VALUE", self.marker),
            SqlType::of(Kind::I32),
            Direction::ReturnValue,
        )
        .strip_marker(self.marker)
    }

    fn execute(&self, command: &mut Command) -> Result<ResultSet> {
        let procedure = self.procedure(command.procedure())?;

        for declared in &procedure.parameters {
            if declared.direction == Direction::Input && command.parameter(&declared.name).is_none() {
                return Err(Error::database(format!(
                    "Procedure '{}' expects parameter '{}', which was not supplied",
                    command.procedure(),
                    declared.wire_name
                )));
            }
        }

        self.calls.lock().push(command.procedure().to_string());

        let result = {
            let mut call = ProcedureCall {
                parameters: command.parameters_mut(),
            };
            (procedure.body)(&mut call)?
        };

        for p in command.parameters_mut() {
            if p.direction == Direction::ReturnValue {
                p.value = Value::I32(result.return_value);
            }
        }
        Ok(result)
    }
}

/// Connection to a [`MemoryDatabase`]
pub struct MemoryConnection {
    db: Arc<MemoryDatabase>,
    open: bool,
}

impl MemoryConnection {
    /// The database behind this connection
    pub fn database(&self) -> &Arc<MemoryDatabase> {
        &self.db
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::database("Connection is closed"))
        }
    }
}

impl Connection for MemoryConnection {
    fn connection_string(&self) -> &str {
        &self.db.connection_string
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> Result<()> {
        self.open = true;
        self.db.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.db.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn derive_parameters(&mut self, procedure: &str) -> Result<Vec<ParameterDescriptor>> {
        self.ensure_open()?;
        let declared = self.db.procedure(procedure)?;
        self.db.derivations.fetch_add(1, Ordering::SeqCst);

        let mut parameters = Vec::with_capacity(declared.parameters.len() + 1);
        parameters.push(self.db.return_slot());
        parameters.extend(declared.parameters.iter().cloned());
        Ok(parameters)
    }

    fn execute_non_query(&mut self, command: &mut Command) -> Result<i64> {
        self.ensure_open()?;
        Ok(self.db.execute(command)?.rows_affected)
    }

    fn execute_scalar(&mut self, command: &mut Command) -> Result<Value> {
        self.ensure_open()?;
        let result = self.db.execute(command)?;
        Ok(result
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_values().into_iter().next())
            .unwrap_or(Value::Null))
    }

    fn execute_reader(&mut self, command: &mut Command) -> Result<Box<dyn RowReader + Send>> {
        self.ensure_open()?;
        let result = self.db.execute(command)?;
        Ok(Box::new(MemoryRows {
            columns: result.columns,
            rows: result.rows.into(),
        }))
    }
}

/// Forward-only cursor over a [`ResultSet`]
pub struct MemoryRows {
    columns: Vec<Column>,
    rows: VecDeque<Row>,
}

impl RowReader for MemoryRows {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }
}
