//! The query state machine. Pure and synchronous: intents mutate the state
//! and hand back the request to issue, if any; the driver in `manager` does
//! the I/O and feeds completions back in.

use serde::Serialize;
use tracing::debug;

use crate::catalog::{FetchError, Movie, MoviePage};

use super::filter::FilterChange;
use super::pagination::{page_window, PAGE_WINDOW};
use super::types::*;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("Page {requested} is out of range (1..={total})")]
    PageOutOfRange { requested: u32, total: u32 },
    #[error("Query manager has shut down")]
    Closed,
}

/// A request the driver must send to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub seq: u64,
    pub query: Query,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Applied,
    /// Superseded by a newer request and dropped.
    Stale,
    /// The catalog reported fewer pages than the current page; the page was
    /// clamped and this request replaces the one that completed.
    Reissued(FetchRequest),
}

/// Read-only copy of the state handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySnapshot {
    pub query: Query,
    pub search_input: String,
    pub search_pending: bool,
    pub load: LoadState,
    pub movies: Vec<Movie>,
    /// The listing belongs to an earlier request of the same search and
    /// filters and a newer one is in flight.
    pub stale: bool,
    pub page: u32,
    pub total_pages: Option<u32>,
    pub total_results: Option<u64>,
    pub pages: Vec<u32>,
    pub latest_seq: u64,
    pub result_seq: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct QueryState {
    query: Query,
    search_input: String,
    search_pending: bool,
    load: LoadState,
    result: Option<QueryResult>,
    stale: bool,
    total_pages: Option<u32>,
    latest_seq: u64,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryState {
    pub fn new() -> Self {
        Self {
            query: Query::default(),
            search_input: String::new(),
            search_pending: false,
            load: LoadState::Idle,
            result: None,
            stale: false,
            total_pages: None,
            latest_seq: 0,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn load(&self) -> &LoadState {
        &self.load
    }

    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn search_pending(&self) -> bool {
        self.search_pending
    }

    /// Record typed text. Nothing is issued until `flush_search`.
    pub fn set_search_term(&mut self, text: &str) {
        self.search_input = text.to_string();
        self.search_pending = true;
    }

    /// Commit the typed text into the effective query, once the input has
    /// been quiet for the debounce window.
    pub fn flush_search(&mut self) -> Option<FetchRequest> {
        if !self.search_pending {
            return None;
        }
        let candidate = self.with_pending_search();
        self.transition(candidate)
    }

    pub fn set_filter(&mut self, change: &FilterChange) -> Option<FetchRequest> {
        let mut candidate = self.with_pending_search();
        change.apply(&mut candidate.filters);
        self.transition(candidate)
    }

    pub fn reset_filters(&mut self) -> Option<FetchRequest> {
        let mut candidate = self.with_pending_search();
        candidate.filters = FilterSet::default();
        self.transition(candidate)
    }

    /// Move to page `n` of the current listing. Pending search text stays
    /// pending.
    pub fn set_page(&mut self, n: u32) -> Result<Option<FetchRequest>, QueryError> {
        let total = self.total_pages.unwrap_or(MAX_PAGE);
        if n == 0 || n > total {
            return Err(QueryError::PageOutOfRange { requested: n, total });
        }
        let candidate = Query {
            page: n,
            ..self.query.clone()
        };
        Ok(self.transition(candidate))
    }

    pub fn next_page(&mut self) -> Result<Option<FetchRequest>, QueryError> {
        match self.total_pages {
            Some(total) if self.query.page < total => self.set_page(self.query.page + 1),
            _ => Ok(None),
        }
    }

    pub fn previous_page(&mut self) -> Result<Option<FetchRequest>, QueryError> {
        if self.query.page > 1 {
            self.set_page(self.query.page - 1)
        } else {
            Ok(None)
        }
    }

    /// Issue the current query again regardless of state.
    pub fn refresh(&mut self) -> FetchRequest {
        self.issue()
    }

    /// Apply the outcome of request `seq`. Only the most recently issued
    /// request may change the state.
    pub fn complete(&mut self, seq: u64, outcome: Result<MoviePage, FetchError>) -> Completion {
        if seq != self.latest_seq || !self.load.is_loading() {
            debug!(seq, latest = self.latest_seq, "dropping stale catalog response");
            return Completion::Stale;
        }

        match outcome {
            Ok(page) => {
                let total = page.total_pages.clamp(1, MAX_PAGE);
                self.total_pages = Some(total);
                if self.query.page > total {
                    debug!(page = self.query.page, total, "page beyond last page, clamping");
                    self.query.page = total;
                    return Completion::Reissued(self.issue());
                }
                self.result = Some(QueryResult {
                    query: self.query.clone(),
                    movies: page.movies,
                    total_pages: total,
                    total_results: page.total_results,
                    seq,
                });
                self.stale = false;
                self.load = LoadState::Success;
            }
            Err(e) => {
                self.result = None;
                self.stale = false;
                self.load = LoadState::Error(e.to_string());
            }
        }
        Completion::Applied
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        let page = self.query.page;
        let pages = match self.total_pages {
            Some(total) => page_window(page, total, PAGE_WINDOW).collect(),
            None => Vec::new(),
        };

        QuerySnapshot {
            query: self.query.clone(),
            search_input: self.search_input.clone(),
            search_pending: self.search_pending,
            load: self.load.clone(),
            movies: self
                .result
                .as_ref()
                .map(|r| r.movies.clone())
                .unwrap_or_default(),
            stale: self.stale,
            page,
            total_pages: self.total_pages,
            total_results: self.result.as_ref().map(|r| r.total_results),
            pages,
            latest_seq: self.latest_seq,
            result_seq: self.result.as_ref().map(|r| r.seq),
        }
    }

    /// The current query with any pending search text folded in.
    fn with_pending_search(&mut self) -> Query {
        let mut candidate = self.query.clone();
        if self.search_pending {
            self.search_pending = false;
            let term = self.search_input.trim();
            candidate.search = if term.is_empty() {
                None
            } else {
                Some(term.to_string())
            };
        }
        candidate
    }

    fn transition(&mut self, mut candidate: Query) -> Option<FetchRequest> {
        let same_listing = candidate.same_listing(&self.query);
        if !same_listing {
            candidate.page = 1;
        }

        let retry = matches!(self.load, LoadState::Idle | LoadState::Error(_));
        if candidate == self.query && !retry {
            return None;
        }

        self.query = candidate;
        if !same_listing {
            self.result = None;
            self.total_pages = None;
        }
        Some(self.issue())
    }

    fn issue(&mut self) -> FetchRequest {
        self.latest_seq += 1;
        self.load = LoadState::Loading;
        self.stale = self.result.is_some();
        FetchRequest {
            seq: self.latest_seq,
            query: self.query.clone(),
        }
    }
}
