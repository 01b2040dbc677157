use tracing::debug;

use hacks_db::Database;
use hacks_types::models::Question;

use crate::Result;

pub const SEARCH_LIMIT: u64 = 10;

/// A search that has been issued but not yet answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub seq: u64,
    pub term: String,
}

/// Incremental question search as typed into the home page.
///
/// Every keystroke issues a request tagged with a sequence number. Responses
/// older than the ones already shown are dropped, so a slow early reply can
/// never overwrite the results for what the user typed last.
#[derive(Debug, Default)]
pub struct SearchBox {
    query: String,
    results: Vec<Question>,
    issued: u64,
    shown: u64,
}

impl SearchBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Question] {
        &self.results
    }

    /// True while the latest request has not been answered.
    pub fn is_searching(&self) -> bool {
        self.shown < self.issued
    }

    /// Record new input. Blank input clears the results at once and needs no
    /// round trip.
    pub fn begin(&mut self, text: &str) -> Option<SearchRequest> {
        self.query = text.to_string();
        self.issued += 1;

        let term = text.trim();
        if term.is_empty() {
            self.results.clear();
            self.shown = self.issued;
            return None;
        }
        Some(SearchRequest {
            seq: self.issued,
            term: term.to_string(),
        })
    }

    /// Show the answer to `seq` unless something newer is already shown.
    /// Returns whether the results changed.
    pub fn apply(&mut self, seq: u64, results: Vec<Question>) -> bool {
        if seq <= self.shown {
            debug!(seq, shown = self.shown, "dropping stale search response");
            return false;
        }
        self.shown = seq;
        self.results = results;
        true
    }

    /// Forget the query and results, e.g. after following a result.
    pub fn clear(&mut self) {
        self.begin("");
    }

    /// Issue and apply a search in one step.
    pub async fn search(&mut self, db: &Database, text: &str) -> Result<&[Question]> {
        if let Some(request) = self.begin(text) {
            let results = run(db, &request).await?;
            self.apply(request.seq, results);
        }
        Ok(&self.results)
    }
}

/// Answer one request against the store.
pub async fn run(db: &Database, request: &SearchRequest) -> Result<Vec<Question>> {
    Ok(db.search_questions(&request.term, SEARCH_LIMIT).await?)
}
