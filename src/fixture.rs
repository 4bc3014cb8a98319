//! JSON fixtures describing canned results, turned into a [`Dispatcher`].

use crate::cursor::Cursor;
use crate::error::{Result, StubError};
use crate::handler::{DetectionRule, Dispatcher};
use crate::model::{parse_decimal, Cell, SqlType};
use crate::rowlist::Column;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    #[serde(default)]
    pub query_detection: Vec<String>,
    #[serde(default)]
    pub queries: Vec<QueryFixture>,
    #[serde(default)]
    pub updates: Vec<UpdateFixture>,
    #[serde(default)]
    pub generated_keys: Option<ResultFixture>,
    #[serde(default)]
    pub default_update_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryFixture {
    pub pattern: String,
    #[serde(flatten)]
    pub result: ResultFixture,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultFixture {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFixture {
    pub pattern: String,
    pub count: u64,
    #[serde(default)]
    pub warning: Option<String>,
}

/// A fixture result with its cells already converted.
#[derive(Debug, Clone)]
struct CannedResult {
    columns: Arc<[Column]>,
    rows: Arc<[Vec<Cell>]>,
    warning: Option<String>,
}

impl CannedResult {
    fn cursor(&self) -> Cursor {
        let cursor = Cursor::new(Arc::clone(&self.columns), Arc::clone(&self.rows));
        match &self.warning {
            Some(w) => cursor.with_warning(w.clone()),
            None => cursor,
        }
    }
}

impl Fixture {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Builds a dispatcher answering from this fixture.
    ///
    /// Queries and updates pick the first entry whose pattern starts the
    /// SQL. Unmatched queries fail; unmatched updates report
    /// `default_update_count`.
    pub fn dispatcher(&self) -> Result<Dispatcher> {
        let queries = self
            .queries
            .iter()
            .map(|q| -> Result<_> { Ok((DetectionRule::new(&q.pattern)?, q.result.canned()?)) })
            .collect::<Result<Vec<_>>>()?;
        let updates = self
            .updates
            .iter()
            .map(|u| -> Result<_> { Ok((DetectionRule::new(&u.pattern)?, u.clone())) })
            .collect::<Result<Vec<_>>>()?;
        let updates = Arc::new(updates);
        let warnings = Arc::clone(&updates);
        let keys = self
            .generated_keys
            .as_ref()
            .map(ResultFixture::canned)
            .transpose()?;
        let default_count = self.default_update_count;

        debug!(
            rules = self.query_detection.len(),
            queries = queries.len(),
            updates = updates.len(),
            "loaded fixture"
        );

        let mut dispatcher = Dispatcher::new()
            .with_detection_rules(self.query_detection.iter().map(String::as_str))?
            .with_query_callback(move |sql, _| {
                queries
                    .iter()
                    .find(|(rule, _)| rule.matches(sql))
                    .map(|(_, result)| result.cursor())
                    .ok_or_else(|| StubError::Execution(format!("no fixture for query: {sql}")))
            })
            .with_update_callback(move |sql, _| {
                Ok(updates
                    .iter()
                    .find(|(rule, _)| rule.matches(sql))
                    .map_or(default_count, |(_, u)| u.count))
            })
            .with_update_warning_callback(move |sql| {
                warnings
                    .iter()
                    .find(|(rule, _)| rule.matches(sql))
                    .and_then(|(_, u)| u.warning.clone())
            });
        if let Some(keys) = keys {
            dispatcher = dispatcher.with_generated_keys_callback(move || Ok(keys.cursor()));
        }
        Ok(dispatcher)
    }
}

impl ResultFixture {
    fn canned(&self) -> Result<CannedResult> {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                if row.len() != self.columns.len() {
                    return Err(StubError::InvalidArgument(format!(
                        "row has {} values, expected {}",
                        row.len(),
                        self.columns.len()
                    )));
                }
                row.iter()
                    .zip(&self.columns)
                    .map(|(v, c)| cell_from_json(v, c))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CannedResult {
            columns: Arc::from(self.columns.clone()),
            rows: Arc::from(rows),
            warning: self.warning.clone(),
        })
    }
}

fn cell_from_json(value: &Value, column: &Column) -> Result<Cell> {
    let mismatch = || {
        StubError::InvalidArgument(format!(
            "value {value} does not fit column {} ({})",
            column.label, column.ty
        ))
    };

    if value.is_null() {
        return if column.nullable {
            Ok(Cell::Null)
        } else {
            Err(mismatch())
        };
    }

    let cell = match column.ty {
        SqlType::Boolean => Cell::Bool(value.as_bool().ok_or_else(mismatch)?),
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => {
            Cell::Int(value.as_i64().ok_or_else(mismatch)?)
        }
        SqlType::Float | SqlType::Real | SqlType::Double => {
            Cell::Float(value.as_f64().ok_or_else(mismatch)?)
        }
        SqlType::Decimal | SqlType::Numeric => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return Err(mismatch()),
            };
            Cell::Decimal(parse_decimal(&text)?)
        }
        SqlType::Varchar => Cell::Text(value.as_str().ok_or_else(mismatch)?.to_string()),
        SqlType::Date => {
            let s = value.as_str().ok_or_else(mismatch)?;
            Cell::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| mismatch())?)
        }
        SqlType::Time => {
            let s = value.as_str().ok_or_else(mismatch)?;
            Cell::Time(NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|_| mismatch())?)
        }
        SqlType::Timestamp => {
            let s = value.as_str().ok_or_else(mismatch)?;
            Cell::Timestamp(
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map_err(|_| mismatch())?,
            )
        }
    };
    Ok(cell)
}
