//! SQLite-backed store for offline demos and tests.
//!
//! Mirrors the hosted schema (including its unique constraints) and
//! translates [`Query`] values into parameterised SQL.

use std::path::Path;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use serde_json::{Map, Number, Value};
use tracing::info;
use uuid::Uuid;

use crate::migrations::{self, TABLES};
use crate::query::{Action, Filter, Query, is_identifier};
use crate::{Backend, DbError, Result};

#[derive(Clone)]
pub struct LocalBackend {
    conn: Arc<Mutex<Connection>>,
}

impl LocalBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Local store opened at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn seed_demo(&self) -> Result<()> {
        self.with_conn(migrations::seed_demo)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::Lock(format!("local store: {}", e)))?;
        f(&conn)
    }
}

impl Backend for LocalBackend {
    fn execute<'a>(
        &'a self,
        query: &'a Query,
        _access_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Value>>> {
        let backend = self.clone();
        let query = query.clone();
        Box::pin(async move {
            // Run blocking SQLite work off the async runtime
            tokio::task::spawn_blocking(move || backend.with_conn(|conn| run_query(conn, &query)))
                .await?
        })
    }
}

/// Execute `query` on `conn` and return affected or selected rows.
pub fn run_query(conn: &Connection, query: &Query) -> Result<Vec<Value>> {
    let has_id = table_has_generated_id(&query.table)?;
    let columns = column_list(&query.columns)?;
    let mut params: Vec<SqlValue> = Vec::new();

    let mut sql = match &query.action {
        Action::Select => {
            let mut sql = format!("SELECT {} FROM {}", columns, query.table);
            push_where(&mut sql, &query.filters, &mut params)?;
            push_order(&mut sql, query)?;
            push_window(&mut sql, query, &mut params);
            sql
        }
        Action::Insert(row) => {
            let mut row = object(row)?.clone();
            if has_id && !row.contains_key("id") {
                row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
            }
            let mut names = Vec::with_capacity(row.len());
            for (column, value) in &row {
                names.push(identifier(column)?);
                params.push(to_sql(value)?);
            }
            let placeholders = vec!["?"; names.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                query.table,
                names.join(", "),
                placeholders
            )
        }
        Action::Update(patch) => {
            if query.filters.is_empty() {
                return Err(DbError::InvalidQuery(format!(
                    "update of {} without filters",
                    query.table
                )));
            }
            let patch = object(patch)?;
            let mut assignments = Vec::with_capacity(patch.len());
            for (column, value) in patch {
                assignments.push(format!("{} = ?", identifier(column)?));
                params.push(to_sql(value)?);
            }
            let mut sql = format!("UPDATE {} SET {}", query.table, assignments.join(", "));
            push_where(&mut sql, &query.filters, &mut params)?;
            sql
        }
        Action::Delete => {
            if query.filters.is_empty() {
                return Err(DbError::InvalidQuery(format!(
                    "delete from {} without filters",
                    query.table
                )));
            }
            let mut sql = format!("DELETE FROM {}", query.table);
            push_where(&mut sql, &query.filters, &mut params)?;
            sql
        }
    };

    let reads_rows = !query.is_write() || query.returning;
    if query.is_write() && query.returning {
        sql.push_str(&format!(" RETURNING {}", columns));
    }

    let mut stmt = conn.prepare(&sql).map_err(map_sqlite)?;
    if !reads_rows {
        stmt.execute(params_from_iter(params.iter()))
            .map_err(map_sqlite)?;
        return Ok(Vec::new());
    }

    let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
    let mut rows = stmt
        .query(params_from_iter(params.iter()))
        .map_err(map_sqlite)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(map_sqlite)? {
        let mut obj = Map::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            obj.insert(name.clone(), from_sql(row.get_ref(idx)?));
        }
        out.push(Value::Object(obj));
    }

    Ok(out)
}

fn table_has_generated_id(table: &str) -> Result<bool> {
    TABLES
        .iter()
        .find(|(name, _)| *name == table)
        .map(|(_, has_id)| *has_id)
        .ok_or_else(|| DbError::InvalidQuery(format!("unknown table {}", table)))
}

fn identifier(name: &str) -> Result<&str> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(DbError::InvalidQuery(format!("bad column name {:?}", name)))
    }
}

fn column_list(columns: &str) -> Result<String> {
    if columns.trim() == "*" {
        return Ok("*".to_string());
    }
    let names = columns
        .split(',')
        .map(|c| identifier(c.trim()))
        .collect::<Result<Vec<_>>>()?;
    Ok(names.join(", "))
}

fn object(value: &Value) -> Result<&Map<String, Value>> {
    match value {
        Value::Object(map) if !map.is_empty() => Ok(map),
        _ => Err(DbError::InvalidQuery("write payload must be a non-empty object".into())),
    }
}

fn push_where(sql: &mut String, filters: &[Filter], params: &mut Vec<SqlValue>) -> Result<()> {
    if filters.is_empty() {
        return Ok(());
    }
    let clauses = filters
        .iter()
        .map(|f| filter_sql(f, params))
        .collect::<Result<Vec<_>>>()?;
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
    Ok(())
}

fn filter_sql(filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String> {
    match filter {
        Filter::Eq { column, value } => {
            let column = identifier(column)?;
            if value.is_null() {
                return Ok(format!("{} IS NULL", column));
            }
            params.push(to_sql(value)?);
            Ok(format!("{} = ?", column))
        }
        Filter::In { column, values } => {
            let column = identifier(column)?;
            if values.is_empty() {
                return Ok("0".to_string());
            }
            for value in values {
                params.push(to_sql(value)?);
            }
            Ok(format!("{} IN ({})", column, vec!["?"; values.len()].join(", ")))
        }
        Filter::ILike { column, pattern } => {
            let column = identifier(column)?;
            params.push(SqlValue::Text(pattern.clone()));
            // SQLite LIKE is already case-insensitive for ASCII
            Ok(format!("{} LIKE ? ESCAPE '\\'", column))
        }
        Filter::Or(filters) => {
            if filters.is_empty() {
                return Ok("0".to_string());
            }
            let parts = filters
                .iter()
                .map(|f| filter_sql(f, params))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("({})", parts.join(" OR ")))
        }
    }
}

fn push_order(sql: &mut String, query: &Query) -> Result<()> {
    if query.order.is_empty() {
        return Ok(());
    }
    let parts = query
        .order
        .iter()
        .map(|o| Ok(format!("{} {}", identifier(&o.column)?, o.direction.as_str().to_uppercase())))
        .collect::<Result<Vec<_>>>()?;
    sql.push_str(" ORDER BY ");
    sql.push_str(&parts.join(", "));
    Ok(())
}

fn push_window(sql: &mut String, query: &Query, params: &mut Vec<SqlValue>) {
    if query.limit.is_none() && query.offset.is_none() {
        return;
    }
    // SQLite needs a LIMIT before OFFSET; -1 means unbounded
    let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
    sql.push_str(" LIMIT ?");
    params.push(SqlValue::Integer(limit));
    if let Some(offset) = query.offset {
        sql.push_str(" OFFSET ?");
        params.push(SqlValue::Integer(offset as i64));
    }
}

fn to_sql(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SqlValue::Integer(i),
            (None, Some(f)) => SqlValue::Real(f),
            _ => return Err(DbError::InvalidQuery(format!("unsupported number {}", n))),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    })
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

fn map_sqlite(err: rusqlite::Error) -> DbError {
    if let rusqlite::Error::SqliteFailure(ref e, ref msg) = err {
        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return DbError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()));
        }
    }
    DbError::Sqlite(err)
}
