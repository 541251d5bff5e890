use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::catalog::{Catalog, FetchError, MoviePage};

use super::filter::FilterChange;
use super::state::{Completion, FetchRequest, QueryError, QuerySnapshot, QueryState};
use super::types::LoadState;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone)]
pub enum Intent {
    SetSearchTerm(String),
    SetFilter(FilterChange),
    ResetFilters,
    SetPage(u32),
    NextPage,
    PreviousPage,
    Refresh,
}

struct Command {
    intent: Intent,
    reply: oneshot::Sender<Result<(), QueryError>>,
}

struct Completed {
    seq: u64,
    outcome: Result<MoviePage, FetchError>,
}

/// Handle to a query state machine running on its own task. Intents and
/// catalog completions are applied one at a time, in arrival order. The task
/// stops when the last handle is dropped.
#[derive(Clone)]
pub struct QueryManager {
    intents: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<QuerySnapshot>>,
}

impl QueryManager {
    pub fn spawn(catalog: Arc<dyn Catalog>, debounce: Duration) -> Self {
        let state = QueryState::new();
        let (intent_tx, intent_rx) = mpsc::channel(64);
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (snap_tx, snap_rx) = watch::channel(Arc::new(state.snapshot()));

        let driver = Driver {
            state,
            catalog,
            debounce,
            deadline: None,
            completions: done_tx,
            snapshots: snap_tx,
        };
        tokio::spawn(driver.run(intent_rx, done_rx));

        Self {
            intents: intent_tx,
            snapshots: snap_rx,
        }
    }

    pub async fn send(&self, intent: Intent) -> Result<(), QueryError> {
        let (reply, rx) = oneshot::channel();
        self.intents
            .send(Command { intent, reply })
            .await
            .map_err(|_| QueryError::Closed)?;
        rx.await.map_err(|_| QueryError::Closed)?
    }

    pub async fn set_search_term(&self, text: impl Into<String>) -> Result<(), QueryError> {
        self.send(Intent::SetSearchTerm(text.into())).await
    }

    pub async fn set_filter(&self, change: FilterChange) -> Result<(), QueryError> {
        self.send(Intent::SetFilter(change)).await
    }

    pub async fn reset_filters(&self) -> Result<(), QueryError> {
        self.send(Intent::ResetFilters).await
    }

    pub async fn set_page(&self, page: u32) -> Result<(), QueryError> {
        self.send(Intent::SetPage(page)).await
    }

    pub async fn next_page(&self) -> Result<(), QueryError> {
        self.send(Intent::NextPage).await
    }

    pub async fn previous_page(&self) -> Result<(), QueryError> {
        self.send(Intent::PreviousPage).await
    }

    pub async fn refresh(&self) -> Result<(), QueryError> {
        self.send(Intent::Refresh).await
    }

    pub fn snapshot(&self) -> Arc<QuerySnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Wait until a published snapshot satisfies `done`.
    pub async fn wait_for(
        &self,
        mut done: impl FnMut(&QuerySnapshot) -> bool,
    ) -> Result<Arc<QuerySnapshot>, QueryError> {
        let mut rx = self.snapshots.clone();
        let snap = rx
            .wait_for(|s| done(s))
            .await
            .map_err(|_| QueryError::Closed)?;
        Ok(snap.clone())
    }

    /// Wait until no request is in flight and no search text is pending.
    pub async fn settled(&self) -> Result<Arc<QuerySnapshot>, QueryError> {
        self.wait_for(|s| !s.load.is_loading() && !s.search_pending)
            .await
    }
}

struct Driver {
    state: QueryState,
    catalog: Arc<dyn Catalog>,
    debounce: Duration,
    deadline: Option<Instant>,
    completions: mpsc::UnboundedSender<Completed>,
    snapshots: watch::Sender<Arc<QuerySnapshot>>,
}

async fn debounce_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl Driver {
    async fn run(
        mut self,
        mut intents: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completed>,
    ) {
        loop {
            tokio::select! {
                cmd = intents.recv() => match cmd {
                    Some(cmd) => {
                        let result = self.handle(cmd.intent);
                        // Callers must see their intent reflected once they
                        // get the reply.
                        self.publish();
                        let _ = cmd.reply.send(result);
                    }
                    None => break,
                },
                Some(done) = completions.recv() => {
                    self.complete(done);
                    self.publish();
                }
                _ = debounce_elapsed(self.deadline) => {
                    self.deadline = None;
                    if let Some(req) = self.state.flush_search() {
                        self.dispatch(req);
                    }
                    self.publish();
                }
            }
        }
        debug!("query manager stopped");
    }

    fn handle(&mut self, intent: Intent) -> Result<(), QueryError> {
        let request = match intent {
            Intent::SetSearchTerm(text) => {
                self.state.set_search_term(&text);
                self.deadline = Some(Instant::now() + self.debounce);
                None
            }
            Intent::SetFilter(change) => {
                self.deadline = None;
                self.state.set_filter(&change)
            }
            Intent::ResetFilters => {
                self.deadline = None;
                self.state.reset_filters()
            }
            Intent::SetPage(n) => self.state.set_page(n)?,
            Intent::NextPage => self.state.next_page()?,
            Intent::PreviousPage => self.state.previous_page()?,
            Intent::Refresh => Some(self.state.refresh()),
        };
        if let Some(req) = request {
            self.dispatch(req);
        }
        Ok(())
    }

    fn dispatch(&self, req: FetchRequest) {
        debug!(seq = req.seq, query = ?req.query, "issuing catalog request");
        let catalog = self.catalog.clone();
        let completions = self.completions.clone();
        let FetchRequest { seq, query } = req;

        tokio::spawn(async move {
            // Run the call on its own task so a panic still produces a
            // completion and the listing can't stay in loading.
            let call = tokio::spawn(async move { catalog.search(&query).await });
            let outcome = match call.await {
                Ok(outcome) => outcome,
                Err(e) => Err(FetchError::Transport(format!("catalog request aborted: {}", e))),
            };
            let _ = completions.send(Completed { seq, outcome });
        });
    }

    fn complete(&mut self, done: Completed) {
        match self.state.complete(done.seq, done.outcome) {
            Completion::Applied => {
                if let LoadState::Error(message) = self.state.load() {
                    warn!(seq = done.seq, "catalog request failed: {}", message);
                }
            }
            Completion::Reissued(req) => self.dispatch(req),
            Completion::Stale => {}
        }
    }

    fn publish(&self) {
        let snap = self.state.snapshot();
        self.snapshots.send_if_modified(|current| {
            if **current == snap {
                return false;
            }
            *current = Arc::new(snap);
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Genre, GenreId, Movie, MovieDetails, MovieId, MovieList, TrendingWindow};
    use crate::query::{Query, QueryError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves five pages of made-up movies. The delay for each request is
    /// chosen by the test; a search for "fail" fails and one for "panic"
    /// panics.
    struct ScriptedCatalog {
        calls: Mutex<Vec<Query>>,
        delay: fn(&Query) -> Duration,
    }

    impl ScriptedCatalog {
        fn new(delay: fn(&Query) -> Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                delay,
            })
        }

        fn calls(&self) -> Vec<Query> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Catalog for ScriptedCatalog {
        async fn search(&self, query: &Query) -> Result<MoviePage, FetchError> {
            self.calls.lock().unwrap().push(query.clone());
            tokio::time::sleep((self.delay)(query)).await;

            if query.search_term() == Some("panic") {
                panic!("catalog call panicked");
            }
            if query.search_term() == Some("fail") {
                return Err(FetchError::Service {
                    status: 401,
                    message: "Invalid API key".to_string(),
                });
            }
            let base = query.filters.year.unwrap_or(0) as u64 * 1000 + query.page as u64 * 100;
            let movies = (0..20)
                .map(|i| Movie {
                    id: MovieId(base + i),
                    title: query.search_term().unwrap_or("popular").to_string(),
                    overview: String::new(),
                    poster_path: None,
                    backdrop_path: None,
                    release_date: None,
                    vote_average: 6.5,
                    vote_count: 100,
                    genre_ids: vec![GenreId(18)],
                })
                .collect();
            Ok(MoviePage {
                page: query.page,
                movies,
                total_pages: 5,
                total_results: 100,
            })
        }

        async fn movie_details(&self, id: MovieId) -> Result<MovieDetails, FetchError> {
            Err(FetchError::Service {
                status: 404,
                message: format!("movie {} not found", id),
            })
        }

        async fn genres(&self) -> Result<Vec<Genre>, FetchError> {
            Ok(Vec::new())
        }

        async fn trending(&self, _: TrendingWindow, _: u32) -> Result<MoviePage, FetchError> {
            Err(FetchError::Transport("offline".to_string()))
        }

        async fn list(&self, _: MovieList, _: u32) -> Result<MoviePage, FetchError> {
            Err(FetchError::Transport("offline".to_string()))
        }
    }

    fn no_delay(_: &Query) -> Duration {
        Duration::ZERO
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_within_window_issues_one_request() {
        let catalog = ScriptedCatalog::new(no_delay);
        let manager = QueryManager::spawn(catalog.clone(), DEFAULT_DEBOUNCE);

        manager.set_search_term("bat").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        manager.set_search_term("batman").await.unwrap();
        assert!(catalog.calls().is_empty());

        let snap = manager.settled().await.unwrap();
        assert_eq!(snap.load, LoadState::Success);
        assert_eq!(snap.query.search_term(), Some("batman"));
        assert_eq!(snap.movies[0].title, "batman");

        let calls = catalog.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].search.as_deref(), Some("batman"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_superseded_response_never_lands() {
        fn slow_first(query: &Query) -> Duration {
            match query.filters.year {
                Some(2001) => Duration::from_millis(800),
                _ => Duration::from_millis(20),
            }
        }
        let catalog = ScriptedCatalog::new(slow_first);
        let manager = QueryManager::spawn(catalog.clone(), DEFAULT_DEBOUNCE);

        manager.set_filter(FilterChange::Year(Some(2001))).await.unwrap();
        manager.set_filter(FilterChange::Year(Some(2002))).await.unwrap();

        let snap = manager.settled().await.unwrap();
        assert_eq!(snap.query.filters.year, Some(2002));
        assert_eq!(snap.movies[0].id, MovieId(2002 * 1000 + 100));

        // Let the slow response for 2001 arrive.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(catalog.calls().len(), 2);
        let snap = manager.snapshot();
        assert_eq!(snap.result_seq, Some(2));
        assert_eq!(snap.query.filters.year, Some(2002));
        assert_eq!(snap.movies[0].id, MovieId(2002 * 1000 + 100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reaches_error_state() {
        let catalog = ScriptedCatalog::new(no_delay);
        let manager = QueryManager::spawn(catalog, DEFAULT_DEBOUNCE);

        manager.set_search_term("fail").await.unwrap();
        let snap = manager.settled().await.unwrap();
        assert_eq!(
            snap.load,
            LoadState::Error("Catalog service error (401): Invalid API key".to_string())
        );
        assert!(snap.movies.is_empty());

        manager.set_search_term("").await.unwrap();
        let snap = manager.settled().await.unwrap();
        assert_eq!(snap.load, LoadState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_call_still_completes() {
        let catalog = ScriptedCatalog::new(no_delay);
        let manager = QueryManager::spawn(catalog, DEFAULT_DEBOUNCE);

        manager.set_search_term("panic").await.unwrap();
        let snap = manager.settled().await.unwrap();
        match &snap.load {
            LoadState::Error(message) => {
                assert!(message.starts_with("Network error: catalog request aborted"))
            }
            other => panic!("expected error state, got {:?}", other),
        }
        assert!(snap.movies.is_empty());

        manager.set_search_term("batman").await.unwrap();
        let snap = manager.settled().await.unwrap();
        assert_eq!(snap.load, LoadState::Success);
        assert_eq!(snap.movies[0].title, "batman");
    }

    #[tokio::test(start_paused = true)]
    async fn test_paging_through_manager() {
        let catalog = ScriptedCatalog::new(no_delay);
        let manager = QueryManager::spawn(catalog.clone(), DEFAULT_DEBOUNCE);

        manager.refresh().await.unwrap();
        let snap = manager.settled().await.unwrap();
        assert_eq!(snap.total_pages, Some(5));
        assert_eq!(snap.movies.len(), 20);

        manager.set_page(5).await.unwrap();
        manager.settled().await.unwrap();
        manager.next_page().await.unwrap();
        assert_eq!(
            manager.set_page(6).await,
            Err(QueryError::PageOutOfRange { requested: 6, total: 5 })
        );

        let snap = manager.settled().await.unwrap();
        assert_eq!(snap.page, 5);
        assert_eq!(snap.pages, vec![1, 2, 3, 4, 5]);
        let pages: Vec<u32> = catalog.calls().iter().map(|q| q.page).collect();
        assert_eq!(pages, vec![1, 5]);
    }
}
