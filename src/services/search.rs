//! Debounced search for the customer and vehicle pickers.
//!
//! Each keystroke replaces the pending query: the previous timer and any
//! in-flight request are aborted, so at most one request per field is
//! outstanding and the published results always belong to the latest query.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

use crate::api::{AbortController, AbortSignal};
use crate::errors::AppError;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[async_trait]
pub trait SearchSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    async fn search(&self, query: &str, signal: &AbortSignal) -> Result<Vec<Self::Item>, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchState<T> {
    /// Query the current `items` answer.
    pub query: String,
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    /// Latest query not yet answered, set as soon as it is typed.
    pub pending: Option<String>,
}

impl<T> Default for SearchState<T> {
    fn default() -> Self {
        Self {
            query: String::new(),
            items: Vec::new(),
            loading: false,
            error: None,
            pending: None,
        }
    }
}

struct Pending {
    controller: AbortController,
    task: JoinHandle<()>,
}

pub struct SearchField<S: SearchSource> {
    source: Arc<S>,
    window: Duration,
    state: Arc<watch::Sender<SearchState<S::Item>>>,
    pending: Mutex<Option<Pending>>,
}

impl<S: SearchSource> SearchField<S> {
    pub fn new(source: Arc<S>, window: Duration) -> Self {
        let (tx, _) = watch::channel(SearchState::default());
        Self {
            source,
            window,
            state: Arc::new(tx),
            pending: Mutex::new(None),
        }
    }

    pub fn current(&self) -> SearchState<S::Item> {
        self.state.borrow().clone()
    }

    /// Every state change, starting with the current one.
    pub fn updates(&self) -> WatchStream<SearchState<S::Item>> {
        WatchStream::new(self.state.subscribe())
    }

    /// Schedules a search for `query` once input has been quiet for the window.
    pub fn set_query(&self, query: &str) {
        let controller = AbortController::new();
        let signal = controller.signal();
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let window = self.window;
        let query = query.to_string();

        let mut pending = self.pending.lock().unwrap();
        if let Some(previous) = pending.take() {
            previous.cancel();
        }
        self.state.send_modify(|s| s.pending = Some(query.clone()));

        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if signal.is_aborted() {
                return;
            }
            state.send_modify(|s| {
                s.loading = true;
                s.error = None;
            });
            tracing::debug!(query = %query, "search request");

            match source.search(&query, &signal).await {
                Ok(items) => {
                    state.send_if_modified(|s| {
                        if signal.is_aborted() {
                            return false;
                        }
                        s.query = query;
                        s.items = items;
                        s.loading = false;
                        s.error = None;
                        s.pending = None;
                        true
                    });
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    tracing::warn!(query = %query, error = %e, "search failed");
                    state.send_if_modified(|s| {
                        if signal.is_aborted() {
                            return false;
                        }
                        s.loading = false;
                        s.error = e.user_message("Search failed");
                        s.pending = None;
                        true
                    });
                }
            }
        });

        *pending = Some(Pending { controller, task });
    }

    /// Drops any pending or in-flight search, keeping the last results.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().unwrap().take() {
            previous.cancel();
            self.state.send_modify(|s| {
                s.loading = false;
                s.pending = None;
            });
        }
    }

    /// Waits until the latest query has been answered or has failed.
    /// Returns `None` if that takes longer than `within`.
    pub async fn settled(&self, within: Duration) -> Option<SearchState<S::Item>> {
        let mut rx = self.state.subscribe();
        let wait = async {
            rx.wait_for(|s| s.pending.is_none() && !s.loading)
                .await
                .map(|state| state.clone())
                .ok()
        };
        tokio::time::timeout(within, wait).await.ok().flatten()
    }
}

impl Pending {
    fn cancel(self) {
        self.controller.abort();
        self.task.abort();
    }
}

impl<S: SearchSource> Drop for SearchField<S> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.take() {
                previous.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    /// Records every query; "slow" blocks until aborted, "boom" fails.
    #[derive(Default)]
    struct MockSource {
        calls: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchSource for MockSource {
        type Item = String;

        async fn search(&self, query: &str, signal: &AbortSignal) -> Result<Vec<String>, AppError> {
            self.calls.lock().unwrap().push(query.to_string());
            match query {
                "slow" => {
                    tokio::select! {
                        _ = signal.cancelled() => Err(AppError::Cancelled),
                        _ = sleep(Duration::from_secs(60)) => Ok(vec!["late".to_string()]),
                    }
                }
                "boom" => Err(AppError::Status {
                    status: 500,
                    message: Some("search index offline".into()),
                    details: None,
                }),
                q => Ok(vec![format!("{q}-1"), format!("{q}-2")]),
            }
        }
    }

    fn field(source: &Arc<MockSource>) -> SearchField<MockSource> {
        SearchField::new(Arc::clone(source), DEFAULT_DEBOUNCE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_inside_window_issue_one_request() {
        let source = Arc::new(MockSource::default());
        let search = field(&source);

        search.set_query("ng");
        sleep(Duration::from_millis(200)).await;
        search.set_query("nguyen");
        sleep(Duration::from_millis(250)).await;
        assert!(source.calls().is_empty());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), vec!["nguyen"]);
        let state = search.current();
        assert_eq!(state.query, "nguyen");
        assert_eq!(state.items, vec!["nguyen-1", "nguyen-2"]);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_in_flight_request_is_silent() {
        let source = Arc::new(MockSource::default());
        let search = field(&source);

        search.set_query("honda");
        sleep(Duration::from_millis(400)).await;
        assert_eq!(search.current().items, vec!["honda-1", "honda-2"]);

        search.set_query("slow");
        sleep(Duration::from_millis(400)).await;
        assert!(search.current().loading);

        search.set_query("yamaha");
        sleep(Duration::from_millis(400)).await;

        assert_eq!(source.calls(), vec!["honda", "slow", "yamaha"]);
        let state = search.current();
        assert_eq!(state.query, "yamaha");
        assert_eq!(state.items, vec!["yamaha-1", "yamaha-2"]);
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_existing_results() {
        let source = Arc::new(MockSource::default());
        let search = field(&source);

        search.set_query("vespa");
        sleep(Duration::from_millis(400)).await;
        search.set_query("slow");
        sleep(Duration::from_millis(400)).await;
        search.cancel();
        sleep(Duration::from_secs(120)).await;

        let state = search.current();
        assert_eq!(state.query, "vespa");
        assert_eq!(state.items, vec!["vespa-1", "vespa-2"]);
        assert_eq!(state.error, None);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_genuine_failure_sets_error() {
        let source = Arc::new(MockSource::default());
        let search = field(&source);

        search.set_query("boom");
        sleep(Duration::from_millis(400)).await;

        let state = search.current();
        assert_eq!(state.error.as_deref(), Some("search index offline"));
        assert!(!state.loading);

        search.set_query("ok");
        sleep(Duration::from_millis(400)).await;
        assert_eq!(search.current().error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_stream_sees_results() {
        use tokio_stream::StreamExt;

        let source = Arc::new(MockSource::default());
        let search = field(&source);
        let mut updates = search.updates();

        // initial state
        assert_eq!(updates.next().await.unwrap().items, Vec::<String>::new());

        search.set_query("sh");
        let state = loop {
            let state = updates.next().await.unwrap();
            if !state.items.is_empty() {
                break state;
            }
        };
        assert_eq!(state.query, "sh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_waits_for_last_query() {
        let source = Arc::new(MockSource::default());
        let search = field(&source);

        search.set_query("honda");
        sleep(Duration::from_millis(400)).await;
        search.set_query("vespa");
        assert_eq!(search.current().pending.as_deref(), Some("vespa"));

        let state = search.settled(Duration::from_secs(5)).await.unwrap();
        assert_eq!(state.query, "vespa");
        assert_eq!(state.items, vec!["vespa-1", "vespa-2"]);
        assert_eq!(state.pending, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_reports_failure() {
        let source = Arc::new(MockSource::default());
        let search = field(&source);

        search.set_query("boom");
        let state = search.settled(Duration::from_secs(5)).await.unwrap();
        assert_eq!(state.error.as_deref(), Some("search index offline"));
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_gives_up_after_deadline() {
        let source = Arc::new(MockSource::default());
        let search = field(&source);

        search.set_query("slow");
        assert!(search.settled(Duration::from_secs(2)).await.is_none());
        assert!(search.current().loading);
    }
}
