use crate::callable::CallableStatement;
use crate::error::{Result, StubError};
use crate::handler::StatementHandler;
use crate::statement::{PreparedStatement, Statement};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Property enabling batch execution past failed entries.
pub const CONTINUE_ON_ERROR: &str = "batch.continue_on_error";

/// Session over one handler; every statement it creates shares that handler.
pub struct Connection {
    url: String,
    properties: HashMap<String, String>,
    handler: Arc<dyn StatementHandler>,
    closed: Arc<AtomicBool>,
}

impl Connection {
    pub(crate) fn new(
        url: impl Into<String>,
        properties: HashMap<String, String>,
        handler: Arc<dyn StatementHandler>,
    ) -> Self {
        Self {
            url: url.into(),
            properties,
            handler,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn handler(&self) -> &Arc<dyn StatementHandler> {
        &self.handler
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub fn create_statement(&self) -> Result<Statement> {
        self.check_open()?;
        Ok(Statement::new(Arc::clone(&self.handler))
            .with_continue_on_error(self.continue_on_error())
            .with_connection_flag(Arc::clone(&self.closed)))
    }

    pub fn prepare_statement(&self, sql: impl Into<String>) -> Result<PreparedStatement> {
        let statement = self.create_statement()?;
        Ok(PreparedStatement::from_statement(statement, sql))
    }

    /// Statement for a stored-procedure call with OUT parameters.
    pub fn prepare_call(&self, sql: impl Into<String>) -> Result<CallableStatement> {
        self.prepare_statement(sql).map(CallableStatement::from_prepared)
    }

    /// Closes the connection; statements created from it stop working.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn continue_on_error(&self) -> bool {
        self.property(CONTINUE_ON_ERROR)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StubError::State("connection is closed".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("properties", &self.properties)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Dispatcher;

    fn failing() -> Arc<dyn StatementHandler> {
        Arc::new(Dispatcher::new().with_update_callback(|sql, _| {
            if sql == "bad" {
                Err(StubError::Execution("no".into()))
            } else {
                Ok(1)
            }
        }))
    }

    #[test]
    fn statements_inherit_batch_property() {
        let props = HashMap::from([(CONTINUE_ON_ERROR.to_string(), "TRUE".to_string())]);
        let conn = Connection::new("sqlstub:t", props, failing());

        let mut stmt = conn.create_statement().unwrap();
        stmt.add_batch("bad").unwrap();
        stmt.add_batch("good").unwrap();
        match stmt.execute_batch() {
            Err(StubError::Batch { counts, .. }) => assert_eq!(counts, vec![None, Some(1)]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn closed_connection_creates_nothing() {
        let mut conn = Connection::new("sqlstub:t", HashMap::new(), failing());
        let mut stmt = conn.create_statement().unwrap();
        conn.close();
        assert!(matches!(stmt.execute("good"), Err(StubError::State(_))));
        assert!(conn.is_closed());
        assert!(matches!(conn.create_statement(), Err(StubError::State(_))));
        assert!(matches!(conn.prepare_statement("x"), Err(StubError::State(_))));
        assert!(matches!(conn.prepare_call("{call p(?)}"), Err(StubError::State(_))));
    }
}
