//! Handler registry and URL-based connection opening.

use crate::connection::Connection;
use crate::error::{Result, StubError};
use crate::handler::StatementHandler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

pub const URL_PREFIX: &str = "sqlstub:";

static DIRECT: AtomicUsize = AtomicUsize::new(0);

/// Resolves `sqlstub:<anything>?handler=<id>` URLs to registered handlers.
#[derive(Default)]
pub struct Driver {
    handlers: RwLock<HashMap<String, Arc<dyn StatementHandler>>>,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `id`, returning the one it replaces.
    pub fn register(
        &self,
        id: impl Into<String>,
        handler: Arc<dyn StatementHandler>,
    ) -> Result<Option<Arc<dyn StatementHandler>>> {
        let id = id.into();
        if id.is_empty() {
            return Err(StubError::InvalidArgument("empty handler id".into()));
        }
        debug!(%id, "registering handler");
        Ok(self.handlers.write().insert(id, handler))
    }

    pub fn unregister(&self, id: &str) -> Option<Arc<dyn StatementHandler>> {
        self.handlers.write().remove(id)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.handlers.read().contains_key(id)
    }

    pub fn accepts_url(url: &str) -> bool {
        url.starts_with(URL_PREFIX)
    }

    pub fn connect(&self, url: &str, properties: HashMap<String, String>) -> Result<Connection> {
        if !Self::accepts_url(url) {
            return Err(StubError::InvalidArgument(format!("unsupported URL: {url}")));
        }
        let id = handler_id(url)
            .ok_or_else(|| StubError::InvalidArgument(format!("missing handler ID: {url}")))?;
        let handler = self
            .handlers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StubError::InvalidArgument(format!("no matching handler: {id}")))?;
        debug!(url, handler = id, "opening connection");
        Ok(Connection::new(url, properties, handler))
    }

    /// Connection bound directly to `handler`, bypassing the registry.
    pub fn connection(handler: Arc<dyn StatementHandler>) -> Connection {
        Self::connection_with(handler, HashMap::new())
    }

    pub fn connection_with(
        handler: Arc<dyn StatementHandler>,
        properties: HashMap<String, String>,
    ) -> Connection {
        let n = DIRECT.fetch_add(1, Ordering::Relaxed);
        Connection::new(format!("{URL_PREFIX}direct-{n}"), properties, handler)
    }
}

fn handler_id(url: &str) -> Option<&str> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "handler")
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Dispatcher;

    #[test]
    fn url_must_carry_prefix_and_handler() {
        let driver = Driver::new();
        driver
            .register("h1", Arc::new(Dispatcher::new()))
            .unwrap();

        assert!(Driver::accepts_url("sqlstub:test"));
        assert!(!Driver::accepts_url("mysql://localhost"));
        assert!(driver.connect("sqlstub:test?x=1&handler=h1", HashMap::new()).is_ok());
        assert!(matches!(
            driver.connect("sqlstub:test", HashMap::new()),
            Err(StubError::InvalidArgument(_))
        ));
        assert!(matches!(
            driver.connect("sqlstub:test?handler=h2", HashMap::new()),
            Err(StubError::InvalidArgument(_))
        ));
        assert!(matches!(
            driver.connect("jdbc:x?handler=h1", HashMap::new()),
            Err(StubError::InvalidArgument(_))
        ));
    }

    #[test]
    fn unregister_removes_handler() {
        let driver = Driver::new();
        assert!(driver.register("", Arc::new(Dispatcher::new())).is_err());
        let prev = driver.register("h", Arc::new(Dispatcher::new())).unwrap();
        assert!(prev.is_none());
        assert!(driver.is_registered("h"));
        assert!(driver.unregister("h").is_some());
        assert!(driver.connect("sqlstub:?handler=h", HashMap::new()).is_err());
    }

    #[test]
    fn direct_connections_get_distinct_urls() {
        let a = Driver::connection(Arc::new(Dispatcher::new()));
        let b = Driver::connection(Arc::new(Dispatcher::new()));
        assert!(a.url().starts_with(URL_PREFIX));
        assert_ne!(a.url(), b.url());
    }
}
