use crate::domain::model::{BatchEntry, BatchFailure, Metric, ObjectListing};
use crate::domain::ports::{MessageQueue, MetricsSink, ObjectStore};
use crate::utils::error::{EtlError, Result};
use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

/// Object store kept in memory; clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: &str, data: impl Into<Vec<u8>>) {
        self.objects.lock().await.insert(key.to_string(), data.into());
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }
}

impl ObjectStore for MemoryStore {
    async fn list_keys(&self, start_after: Option<&str>, max_keys: usize) -> Result<ObjectListing> {
        let objects = self.objects.lock().await;
        let lower = match start_after {
            Some(key) => Bound::Excluded(key.to_string()),
            None => Bound::Unbounded,
        };

        let mut remaining = objects.range((lower, Bound::Unbounded)).map(|(k, _)| k);
        let keys: Vec<String> = remaining.by_ref().take(max_keys).cloned().collect();
        let is_truncated = remaining.next().is_some();

        Ok(ObjectListing { keys, is_truncated })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| EtlError::storage("GetObject", key, "no such key"))
    }

    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        self.objects.lock().await.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

/// In-process FIFO standing in for an SQS queue during local runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    messages: Arc<Mutex<VecDeque<String>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns up to `max` messages, oldest first.
    pub async fn receive(&self, max: usize) -> Vec<String> {
        let mut messages = self.messages.lock().await;
        let count = max.min(messages.len());
        messages.drain(..count).collect()
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}

impl MessageQueue for MemoryQueue {
    async fn send_message(&self, body: &str) -> Result<()> {
        self.messages.lock().await.push_back(body.to_string());
        Ok(())
    }

    async fn send_message_batch(&self, entries: Vec<BatchEntry>) -> Result<Vec<BatchFailure>> {
        if entries.len() > 10 {
            return Err(EtlError::queue(format!(
                "batch of {} entries exceeds the limit of 10",
                entries.len()
            )));
        }
        let mut messages = self.messages.lock().await;
        messages.extend(entries.into_iter().map(|entry| entry.body));
        Ok(Vec::new())
    }
}

/// Keeps every metric it receives; used to assert on emitted metrics.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetrics {
    recorded: Arc<StdMutex<Vec<(String, Metric)>>>,
}

impl MemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<(String, Metric)> {
        self.recorded
            .lock()
            .map(|recorded| recorded.clone())
            .unwrap_or_default()
    }

    /// Sum of all values recorded under `name`.
    pub fn total(&self, name: &str) -> f64 {
        self.recorded()
            .iter()
            .filter(|(_, metric)| metric.name == name)
            .map(|(_, metric)| metric.value)
            .sum()
    }
}

impl MetricsSink for MemoryMetrics {
    fn put_metrics(&self, namespace: &str, metrics: &[Metric]) -> Result<()> {
        let mut recorded = self.recorded.lock().map_err(|_| EtlError::ProcessingError {
            message: "metrics recorder lock poisoned".to_string(),
        })?;
        recorded.extend(
            metrics
                .iter()
                .map(|metric| (namespace.to_string(), metric.clone())),
        );
        Ok(())
    }
}
