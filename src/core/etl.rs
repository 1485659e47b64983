use crate::adapters::{InvocationBudget, MemoryQueue};
use crate::config::{DEFAULT_INVOCATION_BUDGET_MS, DEFAULT_MAX_LIST_INVOCATIONS};
use crate::core::list_pages::ListPagesHandler;
use crate::core::split_page::SplitPageHandler;
use crate::core::transform::TransformHandler;
use crate::domain::model::{ListPagesState, SqsEvent};
use crate::domain::ports::{ConfigProvider, Handler, MetricsSink, ObjectStore};
use crate::utils::error::{EtlError, Result};
use crate::utils::monitor::SystemMonitor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Transform invocations receive at most this many queue records.
const TRANSFORM_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub list_invocations: usize,
    pub pages: usize,
    pub keys_enqueued: usize,
    pub objects_transformed: usize,
    pub lines_processed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Runs the whole pipeline in-process: the list-pages loop the state
/// machine drives in the cloud, then the two queues drained through their
/// consumers with in-memory queues in between.
pub struct EtlEngine<S, D, M, C>
where
    S: ObjectStore + Clone,
    D: ObjectStore,
    M: MetricsSink,
    C: ConfigProvider + Clone,
{
    list_pages: ListPagesHandler<S, MemoryQueue, C>,
    split_page: SplitPageHandler<MemoryQueue, C>,
    transform: TransformHandler<S, D, M, C>,
    pages_queue: MemoryQueue,
    objects_queue: MemoryQueue,
    invocation_budget: Duration,
    max_list_invocations: usize,
    time_buffer_millis: u64,
    monitor: SystemMonitor,
}

impl<S, D, M, C> EtlEngine<S, D, M, C>
where
    S: ObjectStore + Clone,
    D: ObjectStore,
    M: MetricsSink,
    C: ConfigProvider + Clone,
{
    pub fn new(source: S, destination: D, metrics: M, config: C) -> Self {
        let pages_queue = MemoryQueue::new();
        let objects_queue = MemoryQueue::new();
        let time_buffer_millis = config.time_buffer_millis();

        Self {
            list_pages: ListPagesHandler::new(source.clone(), pages_queue.clone(), config.clone()),
            split_page: SplitPageHandler::new(objects_queue.clone(), config.clone()),
            transform: TransformHandler::new(source, destination, metrics, config),
            pages_queue,
            objects_queue,
            invocation_budget: Duration::from_millis(DEFAULT_INVOCATION_BUDGET_MS),
            max_list_invocations: DEFAULT_MAX_LIST_INVOCATIONS,
            time_buffer_millis,
            monitor: SystemMonitor::default(),
        }
    }

    pub fn with_invocation_budget(mut self, budget: Duration) -> Self {
        self.invocation_budget = budget;
        self
    }

    pub fn with_max_list_invocations(mut self, max: usize) -> Self {
        self.max_list_invocations = max;
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub async fn run(&self, initial_state: ListPagesState) -> Result<RunSummary> {
        let budget_ms = u64::try_from(self.invocation_budget.as_millis()).unwrap_or(u64::MAX);
        if budget_ms <= self.time_buffer_millis {
            return Err(EtlError::ConfigValidationError {
                field: "invocation_budget_ms".to_string(),
                message: format!(
                    "Budget of {}ms leaves no time after the {}ms buffer",
                    budget_ms, self.time_buffer_millis
                ),
            });
        }

        let started_at = Utc::now();
        tracing::info!("Starting ETL run");
        self.monitor.log_stats("Start");

        let list_invocations = self.list_all_pages(initial_state).await?;
        self.monitor.log_stats("List pages");

        let (pages, keys_enqueued) = self.split_all_pages().await?;
        self.monitor.log_stats("Split pages");

        let (objects_transformed, lines_processed) = self.transform_all_objects().await?;
        self.monitor.log_stats("Transform");

        let summary = RunSummary {
            list_invocations,
            pages,
            keys_enqueued,
            objects_transformed,
            lines_processed,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            objects = summary.objects_transformed,
            lines = summary.lines_processed,
            "ETL run completed"
        );
        self.monitor.log_final_stats();
        Ok(summary)
    }

    async fn list_all_pages(&self, mut state: ListPagesState) -> Result<usize> {
        for invocation in 1..=self.max_list_invocations {
            let budget = InvocationBudget::start(self.invocation_budget);
            tracing::debug!(invocation, "Invoking {}", ListPagesHandler::<S, MemoryQueue, C>::NAME);
            state = self.list_pages.handle(state, &budget).await?;
            if state.is_complete() {
                return Ok(invocation);
            }
        }

        Err(EtlError::ProcessingError {
            message: format!(
                "listing did not finish after {} invocations (bookmark: {})",
                self.max_list_invocations,
                state.bookmark.as_deref().unwrap_or("<none>")
            ),
        })
    }

    async fn split_all_pages(&self) -> Result<(usize, usize)> {
        let mut pages = 0;
        let mut keys = 0;

        // 每個 page 訊息各觸發一次 split_page
        loop {
            let bodies = self.pages_queue.receive(1).await;
            if bodies.is_empty() {
                break;
            }
            let budget = InvocationBudget::start(self.invocation_budget);
            keys += self
                .split_page
                .handle(SqsEvent::from_bodies(bodies), &budget)
                .await?;
            pages += 1;
        }

        Ok((pages, keys))
    }

    async fn transform_all_objects(&self) -> Result<(usize, usize)> {
        let mut objects = 0;
        let mut lines = 0;

        loop {
            let bodies = self.objects_queue.receive(TRANSFORM_BATCH_SIZE).await;
            if bodies.is_empty() {
                break;
            }
            let budget = InvocationBudget::start(self.invocation_budget);
            let summary = self
                .transform
                .handle(SqsEvent::from_bodies(bodies), &budget)
                .await?;
            objects += summary.objects.len();
            lines += summary.lines_processed();
        }

        Ok((objects, lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryMetrics, MemoryStore};
    use crate::config::PipelineSettings;

    async fn source_with(objects: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..objects {
            store
                .insert(&format!("in/{:03}.json", i), format!("{{\"n\":{{\"i\":{}}}}}\n", i))
                .await;
        }
        store
    }

    #[tokio::test]
    async fn test_run_moves_every_object() {
        let source = source_with(23).await;
        let destination = MemoryStore::new();
        let metrics = MemoryMetrics::new();
        let settings = PipelineSettings {
            page_size: 5,
            ..Default::default()
        };

        let engine = EtlEngine::new(source, destination.clone(), metrics.clone(), settings);
        let summary = engine.run(ListPagesState::default()).await.unwrap();

        assert_eq!(summary.list_invocations, 1);
        assert_eq!(summary.pages, 5);
        assert_eq!(summary.keys_enqueued, 23);
        assert_eq!(summary.objects_transformed, 23);
        assert_eq!(summary.lines_processed, 23);
        assert_eq!(destination.keys().await.len(), 23);
        assert_eq!(
            destination.get("in/007.json").await.unwrap(),
            b"{\"n.i\":7}".to_vec()
        );
        assert_eq!(metrics.total("S3ObjectsProcessed"), 23.0);
    }

    #[tokio::test]
    async fn test_budget_smaller_than_buffer_is_rejected() {
        let engine = EtlEngine::new(
            MemoryStore::new(),
            MemoryStore::new(),
            MemoryMetrics::new(),
            PipelineSettings::default(),
        )
        .with_invocation_budget(Duration::from_millis(10_000));

        let err = engine.run(ListPagesState::default()).await.unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[tokio::test]
    async fn test_already_listed_bookmark_skips_earlier_keys() {
        let source = source_with(4).await;
        let destination = MemoryStore::new();
        let engine = EtlEngine::new(
            source,
            destination.clone(),
            MemoryMetrics::new(),
            PipelineSettings::default(),
        );

        let state = ListPagesState {
            bookmark: Some("in/001.json".to_string()),
            ..Default::default()
        };
        let summary = engine.run(state).await.unwrap();

        assert_eq!(summary.objects_transformed, 2);
        assert_eq!(destination.keys().await, vec!["in/002.json", "in/003.json"]);
    }
}
