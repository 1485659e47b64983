use crate::domain::model::{BatchEntry, BatchFailure, Metric, ObjectListing};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait ObjectStore: Send + Sync {
    /// Lists up to `max_keys` keys strictly after `start_after`, in key order.
    fn list_keys(
        &self,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> impl std::future::Future<Output = Result<ObjectListing>> + Send;

    fn get_object(&self, key: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    fn put_object(
        &self,
        key: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait MessageQueue: Send + Sync {
    fn send_message(&self, body: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Sends at most ten entries in one call and returns the entries the
    /// queue rejected.
    fn send_message_batch(
        &self,
        entries: Vec<BatchEntry>,
    ) -> impl std::future::Future<Output = Result<Vec<BatchFailure>>> + Send;
}

pub trait MetricsSink: Send + Sync {
    fn put_metrics(&self, namespace: &str, metrics: &[Metric]) -> Result<()>;
}

/// Time left before the platform stops the current invocation.
pub trait RemainingTime: Send + Sync {
    fn remaining_millis(&self) -> u64;
}

pub trait ConfigProvider: Send + Sync {
    fn page_size(&self) -> usize;
    fn batch_size(&self) -> usize;
    fn time_buffer_millis(&self) -> u64;
    fn flatten_separator(&self) -> &str;
    fn metrics_namespace(&self) -> &str;
}

/// One deployable function of the pipeline.
#[async_trait]
pub trait Handler: Send + Sync {
    type Event: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send;

    /// Name matched against the function's configured handler.
    const NAME: &'static str;

    async fn handle(&self, event: Self::Event, budget: &dyn RemainingTime)
        -> Result<Self::Output>;
}
