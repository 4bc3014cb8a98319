use crate::cursor::Cursor;
use crate::error::{Result, StubError};
use crate::model::SqlType;
use crate::row::{Cells, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub label: String,
    #[serde(rename = "type")]
    pub ty: SqlType,
    #[serde(default)]
    pub nullable: bool,
}

impl Column {
    pub fn new(label: impl Into<String>, ty: SqlType) -> Self {
        Self {
            label: label.into(),
            ty,
            nullable: false,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Immutable, append-only list of rows of one shape.
///
/// Every operation returns a new list; a cursor taken from a list keeps
/// seeing the rows it was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowList<T: Cells> {
    columns: Vec<Column>,
    rows: Vec<Row<T>>,
}

impl<T: Cells> Default for RowList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Cells> RowList<T> {
    /// Empty list; columns are labelled by position until relabelled.
    pub fn new() -> Self {
        let columns = T::column_types()
            .into_iter()
            .enumerate()
            .map(|(i, (ty, nullable))| Column::new((i + 1).to_string(), ty).with_nullable(nullable))
            .collect();
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn append(&self, row: Row<T>) -> Self {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.extend(self.rows.iter().cloned());
        rows.push(row);
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn with_label(&self, column: usize, label: impl Into<String>) -> Result<Self> {
        let mut next = self.clone();
        next.column_mut(column)?.label = label.into();
        Ok(next)
    }

    pub fn with_nullable(&self, column: usize, nullable: bool) -> Result<Self> {
        let mut next = self.clone();
        next.column_mut(column)?.nullable = nullable;
        Ok(next)
    }

    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cursor(&self) -> Cursor {
        let rows = self.rows.iter().map(Row::to_cells).collect::<Vec<_>>();
        Cursor::new(Arc::from(self.columns.clone()), Arc::from(rows))
    }

    fn column_mut(&mut self, column: usize) -> Result<&mut Column> {
        if column == 0 {
            return Err(StubError::Bounds(column));
        }
        self.columns
            .get_mut(column - 1)
            .ok_or(StubError::Bounds(column))
    }
}

impl<T: Cells> FromIterator<Row<T>> for RowList<T> {
    fn from_iter<I: IntoIterator<Item = Row<T>>>(iter: I) -> Self {
        let mut list = RowList::new();
        list.rows.extend(iter);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{row1, row2};

    #[test]
    fn append_returns_new_list() {
        let empty = RowList::<(i64, &str)>::new();
        let one = empty.append(row2(1, "a"));
        let two = one.append(row2(2, "b"));

        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert_eq!(two.len(), 2);
        assert_eq!(two.rows()[1], row2(2, "b"));
    }

    #[test]
    fn cursor_is_a_snapshot() {
        let list = RowList::<(i32,)>::new().append(row1(1));
        let cursor = list.cursor();
        let grown = list.append(row1(2));

        assert_eq!(cursor.len(), 1);
        assert_eq!(grown.cursor().len(), 2);
    }

    #[test]
    fn relabel_is_one_based_and_bounded() {
        let list = RowList::<(i32, Option<String>)>::new();
        let named = list.with_label(2, "name").unwrap();

        assert_eq!(list.columns()[1].label, "2");
        assert_eq!(named.columns()[1].label, "name");
        assert!(named.columns()[1].nullable);
        assert!(matches!(list.with_label(0, "x"), Err(StubError::Bounds(0))));
        assert!(matches!(list.with_nullable(3, true), Err(StubError::Bounds(3))));
    }
}
