use crate::error::{Result, StubError};
use crate::model::{Cell, FromCell};
use crate::rowlist::Column;
use std::sync::Arc;

/// Forward-only, read-only view over a snapshot of rows.
///
/// Position 0 is "before the first row"; `len() + 1` is "after the last".
/// The fetch size is fixed to the snapshot size.
#[derive(Debug, Clone)]
pub struct Cursor {
    columns: Arc<[Column]>,
    rows: Arc<[Vec<Cell>]>,
    limit: usize,
    position: usize,
    closed: bool,
    last_was_null: bool,
    warning: Option<String>,
}

impl Cursor {
    pub(crate) fn new(columns: Arc<[Column]>, rows: Arc<[Vec<Cell>]>) -> Self {
        let limit = rows.len();
        Self {
            columns,
            rows,
            limit,
            position: 0,
            closed: false,
            last_was_null: false,
            warning: None,
        }
    }

    /// Cursor with no columns and no rows.
    pub fn empty() -> Self {
        Self::new(Arc::from(Vec::new()), Arc::from(Vec::new()))
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    /// Truncates the visible rows; 0 means unlimited.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        if max_rows > 0 && max_rows < self.limit {
            self.limit = max_rows;
        }
        self
    }

    pub fn len(&self) -> usize {
        self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn fetch_size(&self) -> usize {
        self.limit
    }

    pub fn set_fetch_size(&mut self, _rows: usize) -> Result<()> {
        Err(StubError::Unsupported("fetch size is fixed".into()))
    }

    /// Moves to the next row; `false` once past the last one.
    pub fn advance(&mut self) -> Result<bool> {
        self.check_open()?;
        if self.position <= self.limit {
            self.position += 1;
        }
        Ok(self.position <= self.limit)
    }

    /// 1-based index of the current row, or 0 when not on a row.
    pub fn row_number(&self) -> usize {
        if self.on_row() {
            self.position
        } else {
            0
        }
    }

    pub fn is_before_first(&self) -> bool {
        self.position == 0 && self.limit > 0
    }

    pub fn is_after_last(&self) -> bool {
        self.position > self.limit && self.limit > 0
    }

    /// Raw cell at a 1-based column index of the current row.
    pub fn cell(&mut self, column: usize) -> Result<&Cell> {
        self.check_open()?;
        if !self.on_row() {
            return Err(StubError::not_on_row());
        }
        let row = &self.rows[self.position - 1];
        let cell = column
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .ok_or_else(|| StubError::InvalidArgument(format!("invalid column index: {column}")))?;
        self.last_was_null = cell.is_null();
        Ok(cell)
    }

    pub fn get<T: FromCell>(&mut self, column: usize) -> Result<T> {
        let cell = self.cell(column)?;
        T::from_cell(cell)
    }

    pub fn get_by_label<T: FromCell>(&mut self, label: &str) -> Result<T> {
        let column = self.find_column(label)?;
        self.get(column)
    }

    /// 1-based index of the first column with this label.
    pub fn find_column(&self, label: &str) -> Result<usize> {
        self.check_open()?;
        self.columns
            .iter()
            .position(|c| c.label == label)
            .map(|i| i + 1)
            .ok_or_else(|| StubError::InvalidArgument(format!("invalid label: {label}")))
    }

    /// Whether the last cell read was NULL.
    pub fn was_null(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.last_was_null)
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Remaining rows as raw cells, consuming the cursor position.
    pub fn remaining_rows(&mut self) -> Result<Vec<Vec<Cell>>> {
        self.check_open()?;
        let start = self.position.min(self.limit);
        let out = self.rows[start..self.limit].to_vec();
        self.position = self.limit + 1;
        Ok(out)
    }

    /// First visible row, independent of the cursor position.
    pub(crate) fn first_row(&self) -> Option<&[Cell]> {
        if self.limit == 0 {
            return None;
        }
        self.rows.first().map(Vec::as_slice)
    }

    fn on_row(&self) -> bool {
        self.position >= 1 && self.position <= self.limit
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(StubError::closed());
        }
        Ok(())
    }
}
