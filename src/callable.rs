//! Stored-procedure calls with OUT parameters.
//!
//! OUT values are not computed: the handler answers the call with a
//! cursor, and the first row of that cursor holds the value of each
//! parameter at the column of the same position.

use crate::cursor::Cursor;
use crate::error::{Result, StubError};
use crate::handler::StatementHandler;
use crate::model::{Cell, FromCell, SqlType};
use crate::param::ParameterDescriptor;
use crate::statement::PreparedStatement;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::debug;

pub struct CallableStatement {
    prepared: PreparedStatement,
    out_row: Option<Vec<Cell>>,
    last_was_null: bool,
}

impl CallableStatement {
    pub fn new(handler: Arc<dyn StatementHandler>, sql: impl Into<String>) -> Self {
        Self::from_prepared(PreparedStatement::new(handler, sql))
    }

    pub(crate) fn from_prepared(prepared: PreparedStatement) -> Self {
        Self {
            prepared,
            out_row: None,
            last_was_null: false,
        }
    }

    /// Registers `position` as OUT with the defaults of `sql_type`.
    pub fn register_out_parameter(&mut self, position: usize, sql_type: SqlType) -> Result<()> {
        self.prepared
            .register_out(position, ParameterDescriptor::out(sql_type))
    }

    pub fn register_out_parameter_scaled(
        &mut self,
        position: usize,
        sql_type: SqlType,
        scale: u32,
    ) -> Result<()> {
        self.prepared
            .register_out(position, ParameterDescriptor::out_scaled(sql_type, scale))
    }

    pub fn execute(&mut self) -> Result<bool> {
        self.out_row = None;
        let is_query = self.prepared.execute()?;
        self.capture()?;
        Ok(is_query)
    }

    pub fn execute_query(&mut self) -> Result<&mut Cursor> {
        self.out_row = None;
        self.prepared.execute_query()?;
        self.capture()?;
        self.prepared
            .statement_mut()
            .result_set()?
            .ok_or_else(|| StubError::State("no result".into()))
    }

    pub fn execute_update(&mut self) -> Result<u64> {
        self.out_row = None;
        self.prepared.execute_update()
    }

    /// Value of the OUT parameter at a 1-based position.
    pub fn get<T: FromCell>(&mut self, position: usize) -> Result<T> {
        self.prepared.statement().check_open()?;
        let row = self
            .out_row
            .as_ref()
            .ok_or_else(|| StubError::State("no result".into()))?;
        let cell = position
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .ok_or(StubError::Bounds(position))?;
        self.last_was_null = cell.is_null();
        T::from_cell(cell)
    }

    /// Whether the last OUT value read was NULL.
    pub fn was_null(&self) -> Result<bool> {
        self.prepared.statement().check_open()?;
        if self.out_row.is_none() {
            return Err(StubError::State("no result".into()));
        }
        Ok(self.last_was_null)
    }

    fn capture(&mut self) -> Result<()> {
        self.out_row = self
            .prepared
            .statement_mut()
            .result_set()?
            .and_then(|c| c.first_row().map(<[Cell]>::to_vec));
        self.last_was_null = false;
        debug!(
            sql = self.prepared.sql(),
            values = self.out_row.as_ref().map_or(0, Vec::len),
            "captured out parameters"
        );
        Ok(())
    }
}

impl Deref for CallableStatement {
    type Target = PreparedStatement;

    fn deref(&self) -> &PreparedStatement {
        &self.prepared
    }
}

impl DerefMut for CallableStatement {
    fn deref_mut(&mut self) -> &mut PreparedStatement {
        &mut self.prepared
    }
}
