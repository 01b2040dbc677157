//! Client for the hosted PostgREST-style query API.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::query::{Action, Filter, Query};
use crate::{Backend, DbError, Result};

/// Postgres SQLSTATE for unique violations.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    /// Ends with `/rest/v1/`.
    base_url: Url,
    api_key: String,
}

impl RestBackend {
    pub fn new(base_url: Url, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        self.base_url
            .join(table)
            .map_err(|e| DbError::InvalidQuery(format!("table {}: {}", table, e)))
    }

    async fn send(&self, query: &Query, access_token: Option<&str>) -> Result<Vec<Value>> {
        let url = self.table_url(&query.table)?;
        let method = match query.action {
            Action::Select => Method::GET,
            Action::Insert(_) => Method::POST,
            Action::Update(_) => Method::PATCH,
            Action::Delete => Method::DELETE,
        };

        let bearer = access_token.unwrap_or(&self.api_key);
        let mut req = self
            .client
            .request(method, url)
            .query(&query_params(query))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", bearer));

        if query.is_write() {
            let prefer = if query.returning {
                "return=representation"
            } else {
                "return=minimal"
            };
            req = req.header("Prefer", prefer);
        }

        match &query.action {
            Action::Insert(body) | Action::Update(body) => {
                req = req.json(body);
            }
            Action::Select | Action::Delete => {}
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&body)? {
            Value::Array(rows) => {
                debug!(table = %query.table, rows = rows.len(), "rows received");
                Ok(rows)
            }
            row @ Value::Object(_) => Ok(vec![row]),
            other => {
                warn!(table = %query.table, "unexpected response shape: {}", other);
                Ok(Vec::new())
            }
        }
    }
}

impl Backend for RestBackend {
    fn execute<'a>(
        &'a self,
        query: &'a Query,
        access_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Value>>> {
        Box::pin(self.send(query, access_token))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

fn error_from_body(status: StatusCode, body: &str) -> DbError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| {
            b.message.clone().map(|m| match &b.details {
                Some(d) => format!("{} ({})", m, d),
                None => m,
            })
        })
        .unwrap_or_else(|| body.to_string());

    if parsed.as_ref().and_then(|b| b.code.as_deref()) == Some(UNIQUE_VIOLATION) {
        return DbError::Conflict(message);
    }

    DbError::Http {
        status: status.as_u16(),
        message,
    }
}

/// Query-string parameters for `query`, in the hosted API's filter syntax.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();

    if !query.is_write() || query.returning {
        params.push(("select".to_string(), query.columns.replace(' ', "")));
    }

    for filter in &query.filters {
        match filter {
            Filter::Or(filters) => {
                let inner: Vec<String> = filters.iter().map(nested_filter).collect();
                params.push(("or".to_string(), format!("({})", inner.join(","))));
            }
            Filter::Eq { column, .. } | Filter::In { column, .. } | Filter::ILike { column, .. } => {
                params.push((column.clone(), operator_value(filter, false)));
            }
        }
    }

    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, o.direction.as_str()))
            .collect();
        params.push(("order".to_string(), order.join(",")));
    }

    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// `column.op.value` form used inside logical groups.
fn nested_filter(filter: &Filter) -> String {
    match filter {
        Filter::Eq { column, .. } | Filter::In { column, .. } | Filter::ILike { column, .. } => {
            format!("{}.{}", column, operator_value(filter, true))
        }
        Filter::Or(filters) => {
            let inner: Vec<String> = filters.iter().map(nested_filter).collect();
            format!("or({})", inner.join(","))
        }
    }
}

fn operator_value(filter: &Filter, nested: bool) -> String {
    match filter {
        Filter::Eq { value: Value::Null, .. } => "is.null".to_string(),
        Filter::Eq { value, .. } => {
            let raw = render_value(value);
            format!("eq.{}", if nested { quote(&raw) } else { raw })
        }
        Filter::In { values, .. } => {
            let items: Vec<String> = values.iter().map(|v| quote(&render_value(v))).collect();
            format!("in.({})", items.join(","))
        }
        Filter::ILike { pattern, .. } => {
            format!("ilike.{}", if nested { quote(pattern) } else { pattern.clone() })
        }
        Filter::Or(_) => nested_filter(filter),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Double-quote values containing characters reserved by the filter grammar.
pub fn quote(raw: &str) -> String {
    let reserved = raw
        .chars()
        .any(|c| matches!(c, ',' | '(' | ')' | '"' | ':' | '\\') || c.is_whitespace());
    if !reserved {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
