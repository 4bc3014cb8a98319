//! Routing of SQL text to caller-supplied query and update logic.

use crate::cursor::Cursor;
use crate::error::{Result, StubError};
use crate::param::Parameter;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

pub type QueryCallback = dyn Fn(&str, &[Parameter]) -> Result<Cursor> + Send + Sync;
pub type UpdateCallback = dyn Fn(&str, &[Parameter]) -> Result<u64> + Send + Sync;
pub type GeneratedKeysCallback = dyn Fn() -> Result<Cursor> + Send + Sync;
pub type UpdateWarningCallback = dyn Fn(&str) -> Option<String> + Send + Sync;

/// What a statement needs from the logic standing in for a database.
pub trait StatementHandler: Send + Sync {
    /// Whether `sql` takes the query path when run through `execute`.
    fn is_query(&self, sql: &str) -> bool;

    fn when_query(&self, sql: &str, params: &[Parameter]) -> Result<Cursor>;

    fn when_update(&self, sql: &str, params: &[Parameter]) -> Result<u64>;

    /// Keys generated by the last update; empty unless overridden.
    fn generated_keys(&self) -> Result<Cursor> {
        Ok(Cursor::empty())
    }

    /// Warning attached to a successful update of `sql`.
    fn update_warning(&self, _sql: &str) -> Option<String> {
        None
    }
}

/// Anchored prefix pattern used to recognise queries.
#[derive(Debug, Clone)]
pub struct DetectionRule {
    source: String,
    regex: Regex,
}

impl DetectionRule {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, sql: &str) -> bool {
        self.regex.is_match(sql)
    }
}

/// Immutable rule-based handler.
///
/// Builders return a new dispatcher and leave the receiver untouched, so
/// a base dispatcher can be shared and specialised per test.
#[derive(Clone, Default)]
pub struct Dispatcher {
    rules: Vec<DetectionRule>,
    query: Option<Arc<QueryCallback>>,
    update: Option<Arc<UpdateCallback>>,
    keys: Option<Arc<GeneratedKeysCallback>>,
    update_warning: Option<Arc<UpdateWarningCallback>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule checked after every rule already registered.
    pub fn with_detection_rule(&self, pattern: &str) -> Result<Self> {
        let rule = DetectionRule::new(pattern)?;
        let mut next = self.clone();
        next.rules.push(rule);
        Ok(next)
    }

    pub fn with_detection_rules<'a, I>(&self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        patterns
            .into_iter()
            .try_fold(self.clone(), |d, p| d.with_detection_rule(p))
    }

    pub fn with_query_callback<F>(&self, f: F) -> Self
    where
        F: Fn(&str, &[Parameter]) -> Result<Cursor> + Send + Sync + 'static,
    {
        Self {
            query: Some(Arc::new(f)),
            ..self.clone()
        }
    }

    pub fn with_update_callback<F>(&self, f: F) -> Self
    where
        F: Fn(&str, &[Parameter]) -> Result<u64> + Send + Sync + 'static,
    {
        Self {
            update: Some(Arc::new(f)),
            ..self.clone()
        }
    }

    pub fn with_generated_keys_callback<F>(&self, f: F) -> Self
    where
        F: Fn() -> Result<Cursor> + Send + Sync + 'static,
    {
        Self {
            keys: Some(Arc::new(f)),
            ..self.clone()
        }
    }

    pub fn with_update_warning_callback<F>(&self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            update_warning: Some(Arc::new(f)),
            ..self.clone()
        }
    }

    pub fn rules(&self) -> &[DetectionRule] {
        &self.rules
    }

    /// First rule, in registration order, whose pattern starts `sql`.
    pub fn matching_rule(&self, sql: &str) -> Option<&DetectionRule> {
        self.rules.iter().find(|r| r.matches(sql))
    }

    /// `true` for a query. Text no rule matches is treated as an update.
    pub fn classify(&self, sql: &str) -> bool {
        self.matching_rule(sql).is_some()
    }

    pub fn run_query(&self, sql: &str, params: &[Parameter]) -> Result<Cursor> {
        let f = self
            .query
            .as_ref()
            .ok_or_else(|| StubError::Configuration("no query handler".into()))?;
        f(sql, params)
    }

    pub fn run_update(&self, sql: &str, params: &[Parameter]) -> Result<u64> {
        let f = self
            .update
            .as_ref()
            .ok_or_else(|| StubError::Configuration("no update handler".into()))?;
        f(sql, params)
    }

    pub fn run_generated_keys(&self) -> Result<Cursor> {
        match &self.keys {
            Some(f) => f(),
            None => Ok(Cursor::empty()),
        }
    }

    pub fn run_update_warning(&self, sql: &str) -> Option<String> {
        self.update_warning.as_ref().and_then(|f| f(sql))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field(
                "rules",
                &self.rules.iter().map(DetectionRule::pattern).collect::<Vec<_>>(),
            )
            .field("query", &self.query.is_some())
            .field("update", &self.update.is_some())
            .field("generated_keys", &self.keys.is_some())
            .field("update_warning", &self.update_warning.is_some())
            .finish()
    }
}

impl StatementHandler for Dispatcher {
    fn is_query(&self, sql: &str) -> bool {
        self.classify(sql)
    }

    fn when_query(&self, sql: &str, params: &[Parameter]) -> Result<Cursor> {
        self.run_query(sql, params)
    }

    fn when_update(&self, sql: &str, params: &[Parameter]) -> Result<u64> {
        self.run_update(sql, params)
    }

    fn generated_keys(&self) -> Result<Cursor> {
        self.run_generated_keys()
    }

    fn update_warning(&self, sql: &str) -> Option<String> {
        self.run_update_warning(sql)
    }
}
