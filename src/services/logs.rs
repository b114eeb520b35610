use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::api::envelope::page_count;
use crate::api::{AbortController, AbortSignal, ApiClient, Page};
use crate::errors::AppError;
use crate::models::{ActivityLogEntry, LogStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub actor: Option<String>,
    pub action: Option<String>,
    pub entity: Option<String>,
    pub status: Option<LogStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: u32,
    pub limit: u32,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            actor: None,
            action: None,
            entity: None,
            status: None,
            from: None,
            to: None,
            page: 1,
            limit: 20,
        }
    }
}

impl LogQuery {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", self.page.max(1).to_string()),
            ("limit", self.limit.max(1).to_string()),
        ];
        let texts = [
            ("actor", &self.actor),
            ("action", &self.action),
            ("entity", &self.entity),
        ];
        for (key, value) in texts {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                query.push((key, value.to_string()));
            }
        }
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(from) = self.from {
            query.push(("from", from.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        if let Some(to) = self.to {
            query.push(("to", to.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        query
    }
}

#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch(
        &self,
        query: &LogQuery,
        signal: &AbortSignal,
    ) -> Result<Page<ActivityLogEntry>, AppError>;
}

#[derive(Clone)]
pub struct LogService {
    client: ApiClient,
    endpoint: String,
}

impl LogService {
    pub fn new(client: ApiClient, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    pub async fn list(
        &self,
        query: &LogQuery,
        signal: Option<&AbortSignal>,
    ) -> Result<Page<ActivityLogEntry>, AppError> {
        let value = self
            .client
            .get_value(&self.endpoint, &query.to_query(), signal)
            .await?;
        Page::decode(value)
    }
}

#[async_trait]
impl LogSource for LogService {
    async fn fetch(
        &self,
        query: &LogQuery,
        signal: &AbortSignal,
    ) -> Result<Page<ActivityLogEntry>, AppError> {
        self.list(query, Some(signal)).await
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogViewState {
    /// Filters as edited; only `page` is committed by a successful fetch.
    pub params: LogQuery,
    pub items: Vec<ActivityLogEntry>,
    pub total: Option<u64>,
    pub error: Option<String>,
    pub loading: bool,
}

impl LogViewState {
    pub fn page_count(&self) -> Option<u32> {
        page_count(self.total, Some(self.params.limit))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// Superseded by a newer fetch; state untouched.
    Cancelled,
    Failed,
}

/// Activity-log browser. A new fetch aborts the one in flight.
pub struct LogViewer<S: LogSource> {
    source: S,
    state: Mutex<LogViewState>,
    in_flight: Mutex<Option<AbortController>>,
}

impl<S: LogSource> LogViewer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: Mutex::new(LogViewState::default()),
            in_flight: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> LogViewState {
        self.state.lock().unwrap().clone()
    }

    pub fn edit_filters(&self, edit: impl FnOnce(&mut LogQuery)) {
        edit(&mut self.state.lock().unwrap().params);
    }

    pub async fn fetch(&self, page: Option<u32>) -> FetchOutcome {
        let controller = AbortController::new();
        if let Some(previous) = self.in_flight.lock().unwrap().replace(controller.clone()) {
            previous.abort();
        }

        let query = {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
            let mut query = state.params.clone();
            if let Some(page) = page {
                query.page = page.max(1);
            }
            query
        };

        let result = self.source.fetch(&query, &controller.signal()).await;

        let mut state = self.state.lock().unwrap();
        match result {
            Err(e) if e.is_cancelled() => FetchOutcome::Cancelled,
            Ok(page) => {
                state.items = page.items;
                state.total = page.total;
                state.params.page = query.page;
                state.loading = false;
                FetchOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load activity log");
                state.error = e.user_message("Failed to load activity log");
                state.items.clear();
                state.loading = false;
                FetchOutcome::Failed
            }
        }
    }

    pub async fn search(&self) -> FetchOutcome {
        self.fetch(Some(1)).await
    }

    pub async fn next_page(&self) -> Option<FetchOutcome> {
        let (page, pages) = {
            let state = self.state.lock().unwrap();
            (state.params.page, state.page_count()?)
        };
        if page >= pages {
            return None;
        }
        Some(self.fetch(Some(page + 1)).await)
    }

    pub async fn prev_page(&self) -> Option<FetchOutcome> {
        let page = self.state.lock().unwrap().params.page;
        if page <= 1 {
            return None;
        }
        Some(self.fetch(Some(page - 1)).await)
    }

    /// Resets every filter to page 1, 20 per page, and reloads.
    pub async fn clear_filters(&self) -> FetchOutcome {
        self.state.lock().unwrap().params = LogQuery::default();
        self.fetch(Some(1)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn entry(id: &str) -> ActivityLogEntry {
        serde_json::from_value(serde_json::json!({"_id": id, "action": "CREATE"})).unwrap()
    }

    /// Pages of 45 entries; actor "slow" blocks until aborted, "broken" fails.
    #[derive(Default)]
    struct MockLogs {
        seen: Mutex<Vec<LogQuery>>,
    }

    #[async_trait]
    impl LogSource for Arc<MockLogs> {
        async fn fetch(
            &self,
            query: &LogQuery,
            signal: &AbortSignal,
        ) -> Result<Page<ActivityLogEntry>, AppError> {
            self.seen.lock().unwrap().push(query.clone());
            match query.actor.as_deref() {
                Some("slow") => {
                    signal.cancelled().await;
                    Err(AppError::Cancelled)
                }
                Some("broken") => Err(AppError::Status {
                    status: 500,
                    message: None,
                    details: None,
                }),
                _ => Ok(Page {
                    items: vec![entry(&format!("p{}", query.page))],
                    total: Some(45),
                    page: Some(query.page),
                    limit: Some(query.limit),
                }),
            }
        }
    }

    #[test]
    fn test_query_serialization() {
        let query = LogQuery {
            actor: Some(" admin ".into()),
            action: Some("".into()),
            status: Some(LogStatus::Success),
            from: Some("2024-05-01T00:00:00Z".parse().unwrap()),
            ..LogQuery::default()
        };
        assert_eq!(
            query.to_query(),
            vec![
                ("page", "1".to_string()),
                ("limit", "20".to_string()),
                ("actor", "admin".to_string()),
                ("status", "SUCCESS".to_string()),
                ("from", "2024-05-01T00:00:00.000Z".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_paging_is_clamped() {
        let mock = Arc::new(MockLogs::default());
        let viewer = LogViewer::new(Arc::clone(&mock));

        assert_eq!(viewer.prev_page().await, None);
        assert_eq!(viewer.search().await, FetchOutcome::Applied);
        assert_eq!(viewer.snapshot().page_count(), Some(3));

        assert_eq!(viewer.next_page().await, Some(FetchOutcome::Applied));
        assert_eq!(viewer.next_page().await, Some(FetchOutcome::Applied));
        assert_eq!(viewer.snapshot().params.page, 3);
        assert_eq!(viewer.next_page().await, None);

        assert_eq!(viewer.prev_page().await, Some(FetchOutcome::Applied));
        let state = viewer.snapshot();
        assert_eq!(state.params.page, 2);
        assert_eq!(state.items[0].id.as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn test_failure_sets_error_and_clears_items() {
        let mock = Arc::new(MockLogs::default());
        let viewer = LogViewer::new(Arc::clone(&mock));
        viewer.search().await;
        assert_eq!(viewer.snapshot().items.len(), 1);

        viewer.edit_filters(|q| q.actor = Some("broken".into()));
        assert_eq!(viewer.search().await, FetchOutcome::Failed);
        let state = viewer.snapshot();
        assert_eq!(state.error.as_deref(), Some("Failed to load activity log"));
        assert!(state.items.is_empty());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_newer_fetch_cancels_older_without_touching_state() {
        let mock = Arc::new(MockLogs::default());
        let viewer = Arc::new(LogViewer::new(Arc::clone(&mock)));
        viewer.search().await;

        viewer.edit_filters(|q| q.actor = Some("slow".into()));
        let slow = {
            let viewer = Arc::clone(&viewer);
            tokio::spawn(async move { viewer.fetch(None).await })
        };
        while mock.seen.lock().unwrap().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        viewer.edit_filters(|q| q.actor = None);
        assert_eq!(viewer.fetch(Some(2)).await, FetchOutcome::Applied);
        assert_eq!(slow.await.unwrap(), FetchOutcome::Cancelled);

        let state = viewer.snapshot();
        assert_eq!(state.error, None);
        assert_eq!(state.params.page, 2);
        assert_eq!(state.items[0].id.as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn test_clear_filters_resets_defaults() {
        let mock = Arc::new(MockLogs::default());
        let viewer = LogViewer::new(Arc::clone(&mock));
        viewer.edit_filters(|q| {
            q.entity = Some("Booking".into());
            q.limit = 50;
        });
        viewer.search().await;
        viewer.clear_filters().await;

        let seen = mock.seen.lock().unwrap();
        assert_eq!(seen[0].entity.as_deref(), Some("Booking"));
        assert_eq!(seen[1], LogQuery::default());
    }
}
