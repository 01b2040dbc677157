//! Backend-neutral description of a single table operation.
//!
//! The shape follows the hosted REST store: one table per request, filters
//! ANDed together unless grouped with [`Filter::Or`], optional ordering and
//! an offset/limit window.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    /// Case-insensitive pattern match; `%` and `_` are wildcards, `\` escapes.
    ILike { column: String, pattern: String },
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn ilike(column: &str, pattern: impl Into<String>) -> Self {
        Self::ILike {
            column: column.to_string(),
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Select,
    Insert(Value),
    Update(Value),
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub action: Action,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    /// Ask the store to answer writes with the affected rows.
    pub returning: bool,
}

impl Query {
    fn new(table: &str, action: Action) -> Self {
        Self {
            table: table.to_string(),
            action,
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
            returning: false,
        }
    }

    pub fn select(table: &str) -> Self {
        Self::new(table, Action::Select)
    }

    pub fn insert(table: &str, row: Value) -> Self {
        Self::new(table, Action::Insert(row))
    }

    pub fn update(table: &str, patch: Value) -> Self {
        Self::new(table, Action::Update(patch))
    }

    pub fn delete(table: &str) -> Self {
        Self::new(table, Action::Delete)
    }

    /// Comma separated column list, `*` by default.
    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn in_list<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filters.push(Filter::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn ilike(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.filters.push(Filter::ilike(column, pattern));
        self
    }

    pub fn or(mut self, filters: Vec<Filter>) -> Self {
        self.filters.push(Filter::Or(filters));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    /// Inclusive row window, `range(0, 9)` yields at most ten rows.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.offset = Some(from);
        self.limit = Some(to.saturating_sub(from) + 1);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn returning(mut self) -> Self {
        self.returning = true;
        self
    }

    pub fn is_write(&self) -> bool {
        !matches!(self.action, Action::Select)
    }
}

/// Pattern matching `term` anywhere in a column, with wildcard characters in
/// `term` matched literally.
///
/// The hosted API rewrites `*` to `%` in like patterns and offers no escape
/// for it, so `*` becomes a single-character wildcard on every backend.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        match ch {
            '\\' | '%' | '_' => {
                pattern.push('\\');
                pattern.push(ch);
            }
            '*' => pattern.push('_'),
            _ => pattern.push(ch),
        }
    }
    pattern.push('%');
    pattern
}

/// Column and table names accepted by the backends.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
