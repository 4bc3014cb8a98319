use crate::cursor::Cursor;
use crate::error::{Result, StubError};
use crate::handler::StatementHandler;
use crate::model::{Cell, Decimal, IntoCell, SqlType};
use crate::param::{Parameter, ParameterDescriptor, ParameterMetadata, ParameterMode};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchDirection {
    #[default]
    Forward,
    Reverse,
    Unknown,
}

/// Per-statement execution state.
///
/// Holds at most one outcome: the cursor of the last query or the count
/// of the last update. Both are cleared before each execution resolves.
/// Once closed, every operation except `close` fails.
pub struct Statement {
    handler: Arc<dyn StatementHandler>,
    closed: bool,
    cursor: Option<Cursor>,
    update_count: Option<u64>,
    update_warning: Option<String>,
    fetch_direction: FetchDirection,
    fetch_size: u32,
    max_rows: u32,
    batch: Vec<String>,
    continue_on_error: bool,
    connection_closed: Option<Arc<AtomicBool>>,
}

impl Statement {
    pub fn new(handler: Arc<dyn StatementHandler>) -> Self {
        Self {
            handler,
            closed: false,
            cursor: None,
            update_count: None,
            update_warning: None,
            fetch_direction: FetchDirection::Forward,
            fetch_size: 0,
            max_rows: 0,
            batch: Vec::new(),
            continue_on_error: false,
            connection_closed: None,
        }
    }

    /// Ties the statement to its connection's open flag.
    pub(crate) fn with_connection_flag(mut self, closed: Arc<AtomicBool>) -> Self {
        self.connection_closed = Some(closed);
        self
    }

    /// Keep running batch entries after one fails.
    pub fn with_continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    /// Runs `sql` down the path the handler classifies it for.
    /// Returns `true` when the outcome is a cursor.
    pub fn execute(&mut self, sql: &str) -> Result<bool> {
        self.execute_with(sql, &[])
    }

    pub fn execute_query(&mut self, sql: &str) -> Result<&mut Cursor> {
        self.query_with(sql, &[])
    }

    pub fn execute_update(&mut self, sql: &str) -> Result<u64> {
        self.update_with(sql, &[])
    }

    pub(crate) fn execute_with(&mut self, sql: &str, params: &[Parameter]) -> Result<bool> {
        self.check_open()?;
        let is_query = self.handler.is_query(sql);
        debug!(sql, is_query, params = params.len(), "classified statement");
        if is_query {
            self.query_with(sql, params)?;
        } else {
            self.update_with(sql, params)?;
        }
        Ok(is_query)
    }

    pub(crate) fn query_with(&mut self, sql: &str, params: &[Parameter]) -> Result<&mut Cursor> {
        self.check_open()?;
        self.clear_outcome();
        let cursor = self
            .handler
            .when_query(sql, params)?
            .with_max_rows(self.max_rows as usize);
        Ok(self.cursor.insert(cursor))
    }

    pub(crate) fn update_with(&mut self, sql: &str, params: &[Parameter]) -> Result<u64> {
        self.check_open()?;
        self.clear_outcome();
        let count = self.handler.when_update(sql, params)?;
        self.update_count = Some(count);
        self.update_warning = self.handler.update_warning(sql);
        Ok(count)
    }

    /// Cursor of the last query, if the last execution was one.
    pub fn result_set(&mut self) -> Result<Option<&mut Cursor>> {
        self.check_open()?;
        Ok(self.cursor.as_mut())
    }

    /// Count of the last update, if the last execution was one.
    pub fn update_count(&self) -> Result<Option<u64>> {
        self.check_open()?;
        Ok(self.update_count)
    }

    /// Keys generated by the handler, independent of the current outcome.
    pub fn generated_keys(&self) -> Result<Cursor> {
        self.check_open()?;
        self.handler.generated_keys()
    }

    /// Warning of the last outcome: the cursor's, or the one the handler
    /// attached to the last update.
    pub fn warning(&self) -> Result<Option<&str>> {
        self.check_open()?;
        Ok(self
            .cursor
            .as_ref()
            .and_then(Cursor::warning)
            .or(self.update_warning.as_deref()))
    }

    pub fn cancel(&self) -> Result<()> {
        Err(StubError::Unsupported("cancel".into()))
    }

    pub fn close(&mut self) {
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.close();
        }
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn fetch_size(&self) -> Result<u32> {
        self.check_open()?;
        Ok(self.fetch_size)
    }

    pub fn set_fetch_size(&mut self, rows: i32) -> Result<()> {
        self.check_open()?;
        self.fetch_size = u32::try_from(rows)
            .map_err(|_| StubError::InvalidArgument("negative fetch size".into()))?;
        Ok(())
    }

    pub fn fetch_direction(&self) -> Result<FetchDirection> {
        self.check_open()?;
        Ok(self.fetch_direction)
    }

    pub fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<()> {
        self.check_open()?;
        self.fetch_direction = direction;
        Ok(())
    }

    pub fn max_rows(&self) -> Result<u32> {
        self.check_open()?;
        Ok(self.max_rows)
    }

    /// Caps the rows visible through later cursors; 0 means no limit.
    pub fn set_max_rows(&mut self, max: i32) -> Result<()> {
        self.check_open()?;
        self.max_rows = u32::try_from(max)
            .map_err(|_| StubError::InvalidArgument("negative max rows".into()))?;
        Ok(())
    }

    pub fn add_batch(&mut self, sql: impl Into<String>) -> Result<()> {
        self.check_open()?;
        self.batch.push(sql.into());
        Ok(())
    }

    pub fn clear_batch(&mut self) -> Result<()> {
        self.check_open()?;
        self.batch.clear();
        Ok(())
    }

    /// Runs every batched text as an update, in order.
    pub fn execute_batch(&mut self) -> Result<Vec<u64>> {
        self.check_open()?;
        self.clear_outcome();
        let batch = std::mem::take(&mut self.batch);
        let handler = Arc::clone(&self.handler);
        run_batch(batch.len(), self.continue_on_error, |i| {
            handler.when_update(&batch[i], &[])
        })
    }

    pub(crate) fn clear_outcome(&mut self) {
        self.cursor = None;
        self.update_count = None;
        self.update_warning = None;
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(StubError::closed());
        }
        if let Some(flag) = &self.connection_closed {
            if flag.load(Ordering::Acquire) {
                return Err(StubError::State("connection is closed".into()));
            }
        }
        Ok(())
    }
}

fn run_batch<F>(len: usize, continue_on_error: bool, mut run: F) -> Result<Vec<u64>>
where
    F: FnMut(usize) -> Result<u64>,
{
    let mut counts: Vec<Option<u64>> = vec![None; len];
    let mut first_error: Option<(usize, StubError)> = None;

    for (i, slot) in counts.iter_mut().enumerate() {
        match run(i) {
            Ok(n) => *slot = Some(n),
            Err(err) => {
                warn!(entry = i, error = %err, "batch entry failed");
                if first_error.is_none() {
                    first_error = Some((i, err));
                }
                if !continue_on_error {
                    break;
                }
            }
        }
    }

    match first_error {
        None => Ok(counts.into_iter().flatten().collect()),
        Some((index, source)) => Err(StubError::Batch {
            index,
            counts,
            source: Box::new(source),
        }),
    }
}

/// A statement with SQL fixed up front and values bound by position.
pub struct PreparedStatement {
    sql: String,
    statement: Statement,
    bindings: BTreeMap<usize, Parameter>,
    outs: BTreeMap<usize, ParameterDescriptor>,
    batch: Vec<Vec<Parameter>>,
}

impl PreparedStatement {
    pub fn new(handler: Arc<dyn StatementHandler>, sql: impl Into<String>) -> Self {
        Self::from_statement(Statement::new(handler), sql)
    }

    pub(crate) fn from_statement(statement: Statement, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            statement,
            bindings: BTreeMap::new(),
            outs: BTreeMap::new(),
            batch: Vec::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn statement_mut(&mut self) -> &mut Statement {
        &mut self.statement
    }

    /// Binds `param` at a 1-based position.
    pub fn set(&mut self, position: usize, param: Parameter) -> Result<()> {
        self.statement.check_open()?;
        if position == 0 {
            return Err(StubError::Bounds(position));
        }
        self.bindings.insert(position, param);
        Ok(())
    }

    pub fn set_object<T: IntoCell>(&mut self, position: usize, value: T) -> Result<()> {
        self.set(position, Parameter::of(value))
    }

    pub fn set_null(&mut self, position: usize, sql_type: SqlType) -> Result<()> {
        self.set(position, Parameter::null(sql_type))
    }

    pub fn set_bool(&mut self, position: usize, value: bool) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_byte(&mut self, position: usize, value: i8) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_short(&mut self, position: usize, value: i16) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_int(&mut self, position: usize, value: i32) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_long(&mut self, position: usize, value: i64) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_float(&mut self, position: usize, value: f32) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_double(&mut self, position: usize, value: f64) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_decimal(&mut self, position: usize, value: Decimal) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_numeric(&mut self, position: usize, value: Decimal) -> Result<()> {
        let descriptor = ParameterDescriptor::numeric(&value);
        self.set(position, Parameter::new(descriptor, Cell::Decimal(value)))
    }

    pub fn set_string(&mut self, position: usize, value: impl Into<String>) -> Result<()> {
        self.set_object(position, value.into())
    }

    pub fn set_date(&mut self, position: usize, value: NaiveDate) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_time(&mut self, position: usize, value: NaiveTime) -> Result<()> {
        self.set_object(position, value)
    }

    pub fn set_timestamp(&mut self, position: usize, value: NaiveDateTime) -> Result<()> {
        self.set_object(position, value)
    }

    /// Discards the current bind cycle.
    pub fn clear_parameters(&mut self) -> Result<()> {
        self.statement.check_open()?;
        self.bindings.clear();
        Ok(())
    }

    /// Bound values in position order; fails on the first unset position.
    pub fn parameters(&self) -> Result<Vec<Parameter>> {
        self.statement.check_open()?;
        self.resolve()
    }

    pub fn parameter_metadata(&self) -> Result<ParameterMetadata> {
        self.statement.check_open()?;
        let merged = self.merged();
        let size = merged.keys().next_back().copied().unwrap_or(0);
        let descriptors = (1..=size)
            .map(|p| merged.get(&p).map(|b| b.descriptor.clone()))
            .collect();
        Ok(ParameterMetadata::new(descriptors))
    }

    pub fn execute(&mut self) -> Result<bool> {
        let params = self.begin()?;
        self.statement.execute_with(&self.sql, &params)
    }

    pub fn execute_query(&mut self) -> Result<&mut Cursor> {
        let params = self.begin()?;
        self.statement.query_with(&self.sql, &params)
    }

    pub fn execute_update(&mut self) -> Result<u64> {
        let params = self.begin()?;
        self.statement.update_with(&self.sql, &params)
    }

    /// Snapshots the current bindings as a batch entry and starts a new cycle.
    pub fn add_batch(&mut self) -> Result<()> {
        let params = self.parameters()?;
        self.batch.push(params);
        self.bindings.clear();
        Ok(())
    }

    pub fn clear_batch(&mut self) -> Result<()> {
        self.statement.check_open()?;
        self.batch.clear();
        Ok(())
    }

    pub fn execute_batch(&mut self) -> Result<Vec<u64>> {
        self.statement.check_open()?;
        self.statement.clear_outcome();
        let batch = std::mem::take(&mut self.batch);
        let handler = Arc::clone(&self.statement.handler);
        let sql = &self.sql;
        run_batch(batch.len(), self.statement.continue_on_error, |i| {
            handler.when_update(sql, &batch[i])
        })
    }

    pub fn close(&mut self) {
        self.statement.close();
    }

    pub fn is_closed(&self) -> bool {
        self.statement.is_closed()
    }

    /// Marks `position` as an OUT parameter; a value bound there makes it INOUT.
    pub(crate) fn register_out(
        &mut self,
        position: usize,
        descriptor: ParameterDescriptor,
    ) -> Result<()> {
        self.statement.check_open()?;
        if position == 0 {
            return Err(StubError::Bounds(position));
        }
        self.outs.insert(position, descriptor);
        Ok(())
    }

    /// Drops the previous outcome, then resolves bindings for a new execution.
    fn begin(&mut self) -> Result<Vec<Parameter>> {
        self.statement.check_open()?;
        self.statement.clear_outcome();
        self.resolve()
    }

    fn resolve(&self) -> Result<Vec<Parameter>> {
        self.merged()
            .into_iter()
            .enumerate()
            .map(|(i, (position, param))| {
                if position == i + 1 {
                    Ok(param)
                } else {
                    Err(StubError::Unbound(i + 1))
                }
            })
            .collect()
    }

    fn merged(&self) -> BTreeMap<usize, Parameter> {
        let mut merged = self.bindings.clone();
        for (&position, out) in &self.outs {
            match merged.get_mut(&position) {
                Some(p) => p.descriptor = p.descriptor.clone().with_mode(ParameterMode::InOut),
                None => {
                    merged.insert(position, Parameter::new(out.clone(), Cell::Null));
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Dispatcher;
    use crate::row::row2;
    use crate::rowlist::RowList;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new()
            .with_detection_rule("SELECT")
            .unwrap()
            .with_query_callback(|_, params| {
                let list = RowList::<(i64, &str)>::new()
                    .append(row2(1, "a"))
                    .append(row2(2, "b"))
                    .append(row2(params.len() as i64, "params"));
                Ok(list.cursor())
            })
            .with_update_callback(|sql, _| {
                if sql.starts_with("FAIL") {
                    Err(StubError::Execution("refused".into()))
                } else {
                    Ok(3)
                }
            })
    }

    #[test]
    fn outcome_switches_between_cursor_and_count() {
        let mut stmt = Statement::new(Arc::new(dispatcher()));

        assert!(stmt.execute("SELECT * FROM t").unwrap());
        assert!(stmt.result_set().unwrap().is_some());
        assert_eq!(stmt.update_count().unwrap(), None);

        assert!(!stmt.execute("UPDATE t SET x = 1").unwrap());
        assert!(stmt.result_set().unwrap().is_none());
        assert_eq!(stmt.update_count().unwrap(), Some(3));
    }

    #[test]
    fn failed_execution_leaves_no_outcome() {
        let mut stmt = Statement::new(Arc::new(dispatcher()));
        stmt.execute("SELECT 1").unwrap();

        let err = stmt.execute("FAIL now").unwrap_err();
        assert!(matches!(err, StubError::Execution(ref m) if m == "refused"));
        assert!(stmt.result_set().unwrap().is_none());
        assert_eq!(stmt.update_count().unwrap(), None);
    }

    #[test]
    fn forced_paths_skip_classification() {
        let mut stmt = Statement::new(Arc::new(dispatcher()));
        assert_eq!(stmt.execute_update("SELECT but really an update").unwrap(), 3);
        assert_eq!(stmt.execute_query("DELETE but really a query").unwrap().len(), 3);

        let mut bare = Statement::new(Arc::new(Dispatcher::new()));
        assert!(matches!(
            bare.execute_query("SELECT 1"),
            Err(StubError::Configuration(_))
        ));
    }

    #[test]
    fn closed_statement_rejects_everything_but_close() {
        let mut stmt = Statement::new(Arc::new(dispatcher()));
        stmt.close();
        stmt.close();

        assert!(matches!(stmt.execute("SELECT 1"), Err(StubError::State(_))));
        assert!(matches!(stmt.update_count(), Err(StubError::State(_))));
        assert!(matches!(stmt.generated_keys(), Err(StubError::State(_))));
        assert!(matches!(stmt.set_fetch_size(1), Err(StubError::State(_))));
    }

    #[test]
    fn fetch_settings_are_validated() {
        let mut stmt = Statement::new(Arc::new(dispatcher()));
        assert!(matches!(stmt.set_fetch_size(-1), Err(StubError::InvalidArgument(_))));
        stmt.set_fetch_size(50).unwrap();
        assert_eq!(stmt.fetch_size().unwrap(), 50);

        stmt.set_fetch_direction(FetchDirection::Reverse).unwrap();
        assert_eq!(stmt.fetch_direction().unwrap(), FetchDirection::Reverse);
        assert!(matches!(stmt.cancel(), Err(StubError::Unsupported(_))));
    }

    #[test]
    fn max_rows_caps_query_results() {
        let mut stmt = Statement::new(Arc::new(dispatcher()));
        stmt.set_max_rows(2).unwrap();
        assert_eq!(stmt.execute_query("SELECT *").unwrap().len(), 2);
        assert!(matches!(stmt.set_max_rows(-5), Err(StubError::InvalidArgument(_))));
    }

    #[test]
    fn batch_stops_or_continues_on_error() {
        let mut stmt = Statement::new(Arc::new(dispatcher()));
        stmt.add_batch("INSERT 1").unwrap();
        stmt.add_batch("FAIL 2").unwrap();
        stmt.add_batch("INSERT 3").unwrap();

        match stmt.execute_batch() {
            Err(StubError::Batch { index, counts, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(counts, vec![Some(3), None, None]);
            }
            other => panic!("expected batch failure, got {other:?}"),
        }

        let mut stmt = Statement::new(Arc::new(dispatcher())).with_continue_on_error(true);
        stmt.add_batch("FAIL 1").unwrap();
        stmt.add_batch("INSERT 2").unwrap();
        match stmt.execute_batch() {
            Err(StubError::Batch { index, counts, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(counts, vec![None, Some(3)]);
            }
            other => panic!("expected batch failure, got {other:?}"),
        }

        stmt.add_batch("INSERT 3").unwrap();
        assert_eq!(stmt.execute_batch().unwrap(), vec![3]);
    }

    #[test]
    fn prepared_statement_passes_bindings_in_order() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let handler = Dispatcher::new().with_update_callback(move |_, params| {
            counter.store(params.len(), Ordering::SeqCst);
            assert_eq!(params[0].value, Cell::Int(7));
            assert_eq!(params[1].value, Cell::Text("x".into()));
            Ok(1)
        });

        let mut ps = PreparedStatement::new(Arc::new(handler), "INSERT INTO t VALUES (?, ?)");
        ps.set_string(2, "x").unwrap();
        ps.set_int(1, 7).unwrap();
        assert_eq!(ps.execute_update().unwrap(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        let meta = ps.parameter_metadata().unwrap();
        assert_eq!(meta.parameter_count(), 2);
        assert_eq!(meta.parameter_type_name(1).unwrap(), "INTEGER");
    }

    #[test]
    fn prepared_statement_reports_gaps() {
        let mut ps = PreparedStatement::new(Arc::new(dispatcher()), "SELECT ?");
        assert!(matches!(ps.set_int(0, 1), Err(StubError::Bounds(0))));
        ps.set_double(1, 1.5).unwrap();
        ps.set_null(3, SqlType::Varchar).unwrap();

        assert!(matches!(ps.execute(), Err(StubError::Unbound(2))));
        let meta = ps.parameter_metadata().unwrap();
        assert_eq!(meta.scale(1).unwrap(), 1);
        assert!(matches!(meta.precision(2), Err(StubError::Unbound(2))));

        ps.clear_parameters().unwrap();
        assert!(ps.execute().unwrap());
    }

    #[test]
    fn prepared_batch_snapshots_bindings() {
        let mut ps = PreparedStatement::new(Arc::new(dispatcher()), "INSERT INTO t VALUES (?)");
        ps.set_long(1, 1).unwrap();
        ps.add_batch().unwrap();
        ps.set_long(1, 2).unwrap();
        ps.add_batch().unwrap();

        assert_eq!(ps.execute_batch().unwrap(), vec![3, 3]);
        assert!(ps.parameters().unwrap().is_empty());
    }

    #[test]
    fn closed_prepared_statement_fails_before_resolving_bindings() {
        let mut ps = PreparedStatement::new(Arc::new(dispatcher()), "SELECT ?, ?");
        ps.set_int(2, 1).unwrap();
        ps.close();

        assert!(matches!(ps.execute(), Err(StubError::State(_))));
        assert!(matches!(ps.execute_query(), Err(StubError::State(_))));
        assert!(matches!(ps.execute_update(), Err(StubError::State(_))));
        assert!(matches!(ps.parameters(), Err(StubError::State(_))));
    }

    #[test]
    fn unbound_execution_clears_the_previous_outcome() {
        let mut ps = PreparedStatement::new(Arc::new(dispatcher()), "INSERT INTO t VALUES (?, ?)");
        ps.set_int(1, 1).unwrap();
        ps.set_int(2, 2).unwrap();
        assert_eq!(ps.execute_update().unwrap(), 3);
        assert_eq!(ps.statement().update_count().unwrap(), Some(3));

        ps.clear_parameters().unwrap();
        ps.set_int(2, 2).unwrap();
        assert!(matches!(ps.execute(), Err(StubError::Unbound(1))));
        assert_eq!(ps.statement().update_count().unwrap(), None);
        assert!(ps.statement_mut().result_set().unwrap().is_none());
    }

    #[test]
    fn clearing_a_closed_batch_fails() {
        let mut stmt = Statement::new(Arc::new(dispatcher()));
        stmt.add_batch("INSERT 1").unwrap();
        stmt.clear_batch().unwrap();
        assert!(stmt.execute_batch().unwrap().is_empty());
        stmt.close();
        assert!(matches!(stmt.clear_batch(), Err(StubError::State(_))));

        let mut ps = PreparedStatement::new(Arc::new(dispatcher()), "INSERT INTO t VALUES (?)");
        ps.close();
        assert!(matches!(ps.clear_batch(), Err(StubError::State(_))));
    }

    #[test]
    fn update_warning_follows_the_outcome() {
        let handler = dispatcher().with_update_warning_callback(|sql| {
            sql.starts_with("DELETE").then(|| "no WHERE clause".to_string())
        });
        let mut stmt = Statement::new(Arc::new(handler));

        stmt.execute("DELETE FROM t").unwrap();
        assert_eq!(stmt.warning().unwrap(), Some("no WHERE clause"));

        stmt.execute("UPDATE t SET x = 1").unwrap();
        assert_eq!(stmt.warning().unwrap(), None);

        stmt.execute("DELETE FROM t").unwrap();
        stmt.execute("SELECT 1").unwrap();
        assert_eq!(stmt.warning().unwrap(), None);
    }

    #[test]
    fn registered_out_positions_fill_gaps() {
        let mut ps = PreparedStatement::new(Arc::new(dispatcher()), "CALL p(?, ?, ?)");
        ps.set_int(1, 5).unwrap();
        ps.register_out(2, ParameterDescriptor::out(SqlType::Varchar)).unwrap();
        ps.register_out(3, ParameterDescriptor::out(SqlType::Integer)).unwrap();
        ps.set_int(3, 9).unwrap();
        assert!(matches!(
            ps.register_out(0, ParameterDescriptor::out(SqlType::Integer)),
            Err(StubError::Bounds(0))
        ));

        let params = ps.parameters().unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[1].value, Cell::Null);
        let meta = ps.parameter_metadata().unwrap();
        assert_eq!(meta.parameter_mode(1).unwrap(), ParameterMode::In);
        assert_eq!(meta.parameter_mode(2).unwrap(), ParameterMode::Out);
        assert_eq!(meta.parameter_mode(3).unwrap(), ParameterMode::InOut);
        assert_eq!(meta.parameter_type(2).unwrap(), SqlType::Varchar);
    }
}
