pub mod local;
pub mod migrations;
pub mod queries;
pub mod query;
pub mod rest;

use std::sync::{Arc, RwLock};

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

pub use local::LocalBackend;
pub use query::{Direction, Filter, Query};
pub use rest::RestBackend;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("request to the data store failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("data store answered {status}: {message}")]
    Http { status: u16, message: String },

    #[error("row already exists: {0}")]
    Conflict(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("malformed row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// A relational store reachable through [`Query`] values.
///
/// Rows travel as JSON objects keyed by column name. Backends are shared as
/// `Arc<dyn Backend>`, hence the boxed future.
pub trait Backend: Send + Sync {
    fn execute<'a>(
        &'a self,
        query: &'a Query,
        access_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Value>>>;
}

/// Handle to the data store, cheap to clone.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    backend: Arc<dyn Backend>,
    /// Bearer token of the signed-in user; anonymous requests go without.
    access_token: RwLock<Option<String>>,
}

impl Database {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                backend,
                access_token: RwLock::new(None),
            }),
        }
    }

    pub fn set_access_token(&self, token: Option<String>) {
        match self.inner.access_token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    fn access_token(&self) -> Result<Option<String>> {
        self.inner
            .access_token
            .read()
            .map(|t| t.clone())
            .map_err(|e| DbError::Lock(e.to_string()))
    }

    /// Run a query and return raw rows.
    pub async fn run(&self, query: &Query) -> Result<Vec<Value>> {
        let token = self.access_token()?;
        debug!(table = %query.table, action = action_name(query), "store round trip");
        self.inner.backend.execute(query, token.as_deref()).await
    }

    pub async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        self.run(query)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(DbError::from))
            .collect()
    }

    /// First row, if any. Used where the hosted client would call `single()`
    /// and treat "no rows" as absence rather than failure.
    pub async fn fetch_optional<T: DeserializeOwned>(&self, query: &Query) -> Result<Option<T>> {
        let rows = self.run(query).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Serialize `row` and insert it into `table`, returning the stored row.
    pub async fn insert_returning<R, T>(&self, table: &str, row: &R) -> Result<T>
    where
        R: Serialize,
        T: DeserializeOwned,
    {
        let query = Query::insert(table, serde_json::to_value(row)?).returning();
        self.fetch_optional(&query).await?.ok_or_else(|| DbError::Http {
            status: 200,
            message: format!("insert into {} returned no row", table),
        })
    }

    /// Serialize `row` and insert it into `table` without reading it back.
    pub async fn insert<R: Serialize>(&self, table: &str, row: &R) -> Result<()> {
        let query = Query::insert(table, serde_json::to_value(row)?);
        self.run(&query).await?;
        Ok(())
    }
}

fn action_name(query: &Query) -> &'static str {
    match query.action {
        query::Action::Select => "select",
        query::Action::Insert(_) => "insert",
        query::Action::Update(_) => "update",
        query::Action::Delete => "delete",
    }
}
