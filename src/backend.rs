use crate::auth::accept_login;
use crate::cursor::Cursor;
use crate::error::StubError;
use crate::handler::StatementHandler;
use crate::model::{Cell, SqlType};
use crate::param::Parameter;
use crate::rowlist::Column;
use crate::statement::{PreparedStatement, Statement};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use opensrv_mysql::{
    AsyncMysqlShim, Column as WireColumn, ColumnFlags, ColumnType, ErrorKind, InitWriter,
    OkResponse, ParamParser, QueryResultWriter, StatementMetaWriter, StatusFlags, ValueInner,
};
use rand::rngs::OsRng;
use rand::RngCore;
use regex::Regex;
use std::collections::HashMap;
use std::iter;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

pub const SERVER_VERSION: &str = "8.0.0-sqlstub";
const VERSION_COMMENT: &str = "sqlstub programmable fake server";

type Result<T> = std::result::Result<T, StubError>;

/// What a statement left behind, ready to be written to the wire.
enum Outcome {
    Rows {
        columns: Vec<Column>,
        rows: Vec<Vec<Cell>>,
    },
    Count {
        affected_rows: u64,
        last_insert_id: u64,
        warning: Option<String>,
    },
}

/// One client session; every statement it runs goes to the shared handler.
pub struct Backend {
    handler: Arc<dyn StatementHandler>,
    password: Option<[u8; 20]>,
    salt: [u8; 20],
    conn_id: u32,
    next_stmt_id: u32,
    stmts: HashMap<u32, String>,
}

impl Backend {
    pub fn new(handler: Arc<dyn StatementHandler>, password: Option<[u8; 20]>, conn_id: u32) -> Self {
        let mut salt = [0u8; 20];
        OsRng.fill_bytes(&mut salt);
        Self {
            handler,
            password,
            salt,
            conn_id,
            next_stmt_id: 1,
            stmts: HashMap::new(),
        }
    }

    fn err_to_kind(err: &StubError) -> ErrorKind {
        match err {
            StubError::Configuration(_) | StubError::Unsupported(_) => {
                ErrorKind::ER_NOT_SUPPORTED_YET
            }
            StubError::Bounds(_) | StubError::Unbound(_) | StubError::InvalidArgument(_) => {
                ErrorKind::ER_WRONG_ARGUMENTS
            }
            StubError::Batch { source, .. } => Self::err_to_kind(source),
            _ => ErrorKind::ER_UNKNOWN_ERROR,
        }
    }

    fn run_query(&self, query: &str) -> Result<Outcome> {
        if let Some(outcome) = system_probe(query) {
            debug!(query, "answered system probe");
            return Ok(outcome);
        }
        let mut stmt = Statement::new(Arc::clone(&self.handler));
        let is_query = stmt.execute(query)?;
        collect_outcome(&mut stmt, is_query)
    }

    fn run_prepared(&self, sql: &str, params: Vec<Parameter>) -> Result<Outcome> {
        let mut ps = PreparedStatement::new(Arc::clone(&self.handler), sql);
        for (i, param) in params.into_iter().enumerate() {
            ps.set(i + 1, param)?;
        }
        let is_query = ps.execute()?;
        collect_outcome(ps.statement_mut(), is_query)
    }
}

#[async_trait]
impl<W> AsyncMysqlShim<W> for Backend
where
    W: tokio::io::AsyncWrite + Unpin + Send,
{
    type Error = StubError;

    fn version(&self) -> String {
        SERVER_VERSION.to_string()
    }

    fn connect_id(&self) -> u32 {
        self.conn_id
    }

    fn salt(&self) -> [u8; 20] {
        self.salt
    }

    async fn authenticate(
        &self,
        auth_plugin: &str,
        username: &[u8],
        salt: &[u8],
        auth_data: &[u8],
    ) -> bool {
        if auth_plugin != "mysql_native_password" {
            return false;
        }
        let ok = accept_login(salt, auth_data, self.password.as_ref());
        if !ok {
            warn!(
                user = %String::from_utf8_lossy(username),
                conn = self.conn_id,
                "rejected login"
            );
        }
        ok
    }

    async fn on_prepare<'a>(
        &'a mut self,
        query: &'a str,
        info: StatementMetaWriter<'a, W>,
    ) -> Result<()> {
        let id = self.next_stmt_id;
        self.next_stmt_id = self.next_stmt_id.wrapping_add(1);

        let param_count = split_query_template(query).len().saturating_sub(1);
        self.stmts.insert(id, query.to_string());

        let params: Vec<WireColumn> = (0..param_count)
            .map(|_| WireColumn {
                table: String::new(),
                column: String::new(),
                coltype: ColumnType::MYSQL_TYPE_VAR_STRING,
                colflags: ColumnFlags::empty(),
            })
            .collect();

        info.reply(id, params.iter(), iter::empty::<&WireColumn>())
            .await?;
        Ok(())
    }

    async fn on_execute<'a>(
        &'a mut self,
        id: u32,
        params: ParamParser<'a>,
        results: QueryResultWriter<'a, W>,
    ) -> Result<()> {
        let outcome = match self.stmts.get(&id) {
            None => Err(StubError::InvalidArgument(format!("unknown statement id {id}"))),
            Some(sql) => params
                .into_iter()
                .map(|p| parameter_from_wire(p.value))
                .collect::<Result<Vec<_>>>()
                .and_then(|bound| self.run_prepared(sql, bound)),
        };
        write_outcome(self.conn_id, outcome, results).await
    }

    async fn on_close<'a>(&'a mut self, stmt: u32)
    where
        W: 'async_trait,
    {
        self.stmts.remove(&stmt);
    }

    async fn on_init<'a>(&'a mut self, db: &'a str, writer: InitWriter<'a, W>) -> Result<()> {
        debug!(db, conn = self.conn_id, "schema selected");
        writer.ok().await?;
        Ok(())
    }

    async fn on_query<'a>(
        &'a mut self,
        query: &'a str,
        results: QueryResultWriter<'a, W>,
    ) -> Result<()> {
        let outcome = self.run_query(query);
        write_outcome(self.conn_id, outcome, results).await
    }
}

fn collect_outcome(stmt: &mut Statement, is_query: bool) -> Result<Outcome> {
    if is_query {
        if let Some(cursor) = stmt.result_set()? {
            let columns = cursor.columns().to_vec();
            let rows = cursor.remaining_rows()?;
            return Ok(Outcome::Rows { columns, rows });
        }
    }
    Ok(Outcome::Count {
        affected_rows: stmt.update_count()?.unwrap_or(0),
        last_insert_id: last_insert_id(stmt.generated_keys()?),
        warning: stmt.warning()?.map(str::to_string),
    })
}

/// First integral key of the first generated row, or 0.
fn last_insert_id(mut keys: Cursor) -> u64 {
    match keys.advance() {
        Ok(true) => keys
            .get::<i64>(1)
            .ok()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0),
        _ => 0,
    }
}

async fn write_outcome<W>(
    conn_id: u32,
    outcome: Result<Outcome>,
    results: QueryResultWriter<'_, W>,
) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin + Send,
{
    match outcome {
        Ok(Outcome::Count {
            affected_rows,
            last_insert_id,
            warning,
        }) => {
            let ok = OkResponse {
                affected_rows,
                last_insert_id,
                status_flags: StatusFlags::SERVER_STATUS_AUTOCOMMIT,
                warnings: u16::from(warning.is_some()),
                info: warning.unwrap_or_default(),
                ..Default::default()
            };
            results.completed(ok).await?;
        }
        Ok(Outcome::Rows { columns, rows }) => {
            let wire: Vec<WireColumn> = columns.iter().map(wire_column).collect();
            let mut rw = results.start(&wire).await?;
            for row in rows {
                for cell in row {
                    match cell {
                        // Any Option<T>::None encodes NULL.
                        Cell::Null => rw.write_col(None::<u8>)?,
                        Cell::Bool(b) => rw.write_col(i64::from(b))?,
                        Cell::Int(n) => rw.write_col(n)?,
                        Cell::Float(f) => rw.write_col(f)?,
                        other => rw.write_col(other.to_string())?,
                    }
                }
                rw.end_row().await?;
            }
            rw.finish().await?;
        }
        Err(err) => {
            warn!(conn = conn_id, error = %err, "statement failed");
            let kind = Backend::err_to_kind(&err);
            results.error(kind, err.to_string().as_bytes()).await?;
        }
    }
    Ok(())
}

fn wire_column(column: &Column) -> WireColumn {
    let coltype = if column.ty.is_integral() {
        ColumnType::MYSQL_TYPE_LONGLONG
    } else if column.ty.is_floating() {
        ColumnType::MYSQL_TYPE_DOUBLE
    } else {
        ColumnType::MYSQL_TYPE_VAR_STRING
    };
    let colflags = if column.nullable {
        ColumnFlags::empty()
    } else {
        ColumnFlags::NOT_NULL_FLAG
    };
    WireColumn {
        table: String::new(),
        column: column.label.clone(),
        coltype,
        colflags,
    }
}

fn parameter_from_wire(value: opensrv_mysql::Value<'_>) -> Result<Parameter> {
    match value.into_inner() {
        ValueInner::NULL => Ok(Parameter::null(SqlType::Varchar)),
        ValueInner::Int(n) => Ok(Parameter::of(n)),
        ValueInner::UInt(n) => i64::try_from(n).map(Parameter::of).map_err(|_| {
            StubError::InvalidArgument("unsigned integer parameter is too large".into())
        }),
        ValueInner::Double(f) => Ok(Parameter::of(f)),
        ValueInner::Bytes(bytes) => std::str::from_utf8(bytes)
            .map(|s| Parameter::of(s.to_string()))
            .map_err(|_| StubError::InvalidArgument("non-utf8 string parameter".into())),
        ValueInner::Date(bytes) => {
            let ts = datetime_from_wire(bytes)?;
            if bytes.len() <= 4 {
                Ok(Parameter::of(ts.date()))
            } else {
                Ok(Parameter::of(ts))
            }
        }
        ValueInner::Datetime(bytes) => datetime_from_wire(bytes).map(Parameter::of),
        ValueInner::Time(bytes) => time_from_wire(bytes).map(Parameter::of),
    }
}

fn bad_temporal() -> StubError {
    StubError::InvalidArgument("malformed date/time parameter".into())
}

/// Binary protocol DATE/DATETIME: year(2 LE) month day [hour min sec [micros(4 LE)]].
fn datetime_from_wire(bytes: &[u8]) -> Result<NaiveDateTime> {
    if bytes.is_empty() {
        return NaiveDate::from_ymd_opt(0, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(bad_temporal);
    }
    if bytes.len() < 4 {
        return Err(bad_temporal());
    }
    let year = i32::from(u16::from_le_bytes([bytes[0], bytes[1]]));
    let date = NaiveDate::from_ymd_opt(year, u32::from(bytes[2]), u32::from(bytes[3]))
        .ok_or_else(bad_temporal)?;
    let (h, m, s) = match bytes.get(4..7) {
        Some(hms) => (u32::from(hms[0]), u32::from(hms[1]), u32::from(hms[2])),
        None => (0, 0, 0),
    };
    let micros = match bytes.get(7..11) {
        Some(us) => u32::from_le_bytes([us[0], us[1], us[2], us[3]]),
        None => 0,
    };
    date.and_hms_micro_opt(h, m, s, micros)
        .ok_or_else(bad_temporal)
}

/// Binary protocol TIME: negative(1) days(4 LE) hour min sec [micros(4 LE)].
fn time_from_wire(bytes: &[u8]) -> Result<NaiveTime> {
    if bytes.is_empty() {
        return NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(bad_temporal);
    }
    if bytes.len() < 8 || bytes[0] != 0 || bytes[1..5] != [0, 0, 0, 0] {
        return Err(StubError::Unsupported(
            "TIME parameters outside one day".into(),
        ));
    }
    let micros = match bytes.get(8..12) {
        Some(us) => u32::from_le_bytes([us[0], us[1], us[2], us[3]]),
        None => 0,
    };
    NaiveTime::from_hms_micro_opt(
        u32::from(bytes[5]),
        u32::from(bytes[6]),
        u32::from(bytes[7]),
        micros,
    )
    .ok_or_else(bad_temporal)
}

fn system_variable(name: &str) -> Option<Cell> {
    let name = name.to_ascii_lowercase();
    let cell = match name.as_str() {
        "version" => Cell::Text(SERVER_VERSION.to_string()),
        "version_comment" => Cell::Text(VERSION_COMMENT.to_string()),
        "max_allowed_packet" => Cell::Int(64 * 1024 * 1024),
        "wait_timeout" | "interactive_timeout" => Cell::Int(28800),
        "autocommit" | "auto_increment_increment" => Cell::Int(1),
        "lower_case_table_names" => Cell::Int(0),
        "socket" => Cell::Text(String::new()),
        "sql_mode" => Cell::Text(String::new()),
        "time_zone" => Cell::Text("SYSTEM".into()),
        "system_time_zone" => Cell::Text("UTC".into()),
        "transaction_isolation" | "tx_isolation" => Cell::Text("REPEATABLE-READ".into()),
        "character_set_client"
        | "character_set_connection"
        | "character_set_results"
        | "character_set_server" => Cell::Text("utf8mb4".into()),
        "collation_connection" | "collation_server" => Cell::Text("utf8mb4_general_ci".into()),
        _ => return None,
    };
    Some(cell)
}

/// Answers `SELECT @@var[, @@var...]` without consulting the handler.
///
/// Returns `None` unless every selected item is a known system variable.
fn system_probe(query: &str) -> Option<Outcome> {
    static SELECT: OnceLock<Regex> = OnceLock::new();
    static ITEM: OnceLock<Regex> = OnceLock::new();
    let select = SELECT.get_or_init(|| {
        Regex::new(r"(?is)^\s*select\s+(@@.+?)(?:\s+limit\s+\d+)?\s*;?\s*$")
            .expect("valid probe regex")
    });
    let item = ITEM.get_or_init(|| {
        Regex::new(r#"(?is)^@@(?:(session|global)\.)?([a-z0-9_]+)(?:\s+as\s+([a-z0-9_`"']+))?$"#)
            .expect("valid probe item regex")
    });

    let list = select.captures(query)?.get(1)?.as_str();
    let mut columns = Vec::new();
    let mut row = Vec::new();
    for part in list.split(',') {
        let caps = item.captures(part.trim())?;
        let name = caps.get(2)?.as_str();
        let value = system_variable(name)?;
        let label = match (caps.get(3), caps.get(1)) {
            (Some(alias), _) => alias.as_str().trim_matches(['`', '"', '\'']).to_string(),
            (None, Some(scope)) => format!("@@{}.{name}", scope.as_str()),
            (None, None) => format!("@@{name}"),
        };
        let ty = value.sql_type().unwrap_or(SqlType::Varchar);
        columns.push(Column::new(label, ty));
        row.push(value);
    }
    Some(Outcome::Rows {
        columns,
        rows: vec![row],
    })
}

fn split_query_template(query: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut last = 0;
    let mut in_sq = false;
    let mut in_bq = false;
    let mut chars = query.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            '\'' if !in_bq => {
                if in_sq {
                    if let Some((_, '\'')) = chars.peek() {
                        chars.next();
                    } else {
                        in_sq = false;
                    }
                } else {
                    in_sq = true;
                }
            }
            '`' if !in_sq => {
                in_bq = !in_bq;
            }
            '?' if !in_sq && !in_bq => {
                out.push(&query[last..i]);
                last = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&query[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_inside_quotes_are_ignored() {
        assert_eq!(split_query_template("SELECT ?, '?', `?` FROM t WHERE a = ?").len(), 3);
        assert_eq!(split_query_template("SELECT 'it''s ?'").len(), 1);
    }

    #[test]
    fn probes_answer_known_variables_only() {
        match system_probe("SELECT @@version_comment LIMIT 1") {
            Some(Outcome::Rows { columns, rows }) => {
                assert_eq!(columns[0].label, "@@version_comment");
                assert_eq!(rows[0][0], Cell::Text(VERSION_COMMENT.into()));
            }
            _ => panic!("expected probe rows"),
        }
        match system_probe("select @@max_allowed_packet, @@session.wait_timeout as wt") {
            Some(Outcome::Rows { columns, rows }) => {
                assert_eq!(columns[1].label, "wt");
                assert_eq!(columns[0].ty, SqlType::BigInt);
                assert_eq!(rows[0][1], Cell::Int(28800));
            }
            _ => panic!("expected probe rows"),
        }
        assert!(system_probe("SELECT @@no_such_thing").is_none());
        assert!(system_probe("SELECT * FROM t").is_none());
    }

    #[test]
    fn temporal_parameters_decode() {
        let date = [0xE8, 0x07, 2, 29];
        assert_eq!(
            datetime_from_wire(&date).unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        let time = [0, 0, 0, 0, 0, 13, 5, 9];
        assert_eq!(
            time_from_wire(&time).unwrap(),
            NaiveTime::from_hms_opt(13, 5, 9).unwrap()
        );
        assert!(datetime_from_wire(&[0xE8, 0x07, 13, 1]).is_err());
    }

    #[test]
    fn handler_errors_map_to_wire_kinds() {
        assert_eq!(
            Backend::err_to_kind(&StubError::Configuration("x".into())) as u16,
            ErrorKind::ER_NOT_SUPPORTED_YET as u16
        );
        assert_eq!(
            Backend::err_to_kind(&StubError::Execution("x".into())) as u16,
            ErrorKind::ER_UNKNOWN_ERROR as u16
        );
    }
}
