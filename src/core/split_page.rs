use crate::domain::model::{BatchEntry, Page, SqsEvent};
use crate::domain::ports::{ConfigProvider, Handler, MessageQueue, RemainingTime};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use uuid::Uuid;

/// Fans a page out into one objects-queue message per key. A page holds up
/// to 1000 keys while a batch send takes at most 10, so keys are sent in
/// chunks of `batch_size`.
pub struct SplitPageHandler<Q: MessageQueue, C: ConfigProvider> {
    objects: Q,
    config: C,
}

impl<Q: MessageQueue, C: ConfigProvider> SplitPageHandler<Q, C> {
    pub fn new(objects: Q, config: C) -> Self {
        Self { objects, config }
    }

    async fn enqueue_page(&self, page: &Page) -> Result<usize> {
        let batch_size = self.config.batch_size().max(1);
        let mut enqueued = 0;

        for batch in page.keys().chunks(batch_size) {
            let entries: Vec<BatchEntry> = batch
                .iter()
                .map(|key| BatchEntry {
                    id: Uuid::new_v4().to_string(),
                    body: key.clone(),
                })
                .collect();

            let failures = self.objects.send_message_batch(entries).await?;
            if let Some(first) = failures.first() {
                return Err(EtlError::queue(format!(
                    "{} of {} entries rejected (first: {} {})",
                    failures.len(),
                    batch.len(),
                    first.code,
                    first.message
                )));
            }
            enqueued += batch.len();
        }

        Ok(enqueued)
    }
}

#[async_trait]
impl<Q, C> Handler for SplitPageHandler<Q, C>
where
    Q: MessageQueue,
    C: ConfigProvider,
{
    type Event = SqsEvent;
    type Output = usize;

    const NAME: &'static str = "split_page";

    async fn handle(&self, event: SqsEvent, _budget: &dyn RemainingTime) -> Result<usize> {
        let mut enqueued = 0;

        for record in &event.records {
            let page: Page = serde_json::from_str(&record.body)?;
            enqueued += self.enqueue_page(&page).await?;
            tracing::debug!(
                message_id = record.message_id.as_deref().unwrap_or(""),
                keys = page.len(),
                "Split page"
            );
        }

        tracing::info!(records = event.records.len(), enqueued, "Pages split");
        Ok(enqueued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryQueue;
    use crate::config::PipelineSettings;
    use crate::domain::model::BatchFailure;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct NoDeadline;

    impl RemainingTime for NoDeadline {
        fn remaining_millis(&self) -> u64 {
            u64::MAX
        }
    }

    /// Records every batch and rejects the last entry of each one if asked to.
    #[derive(Default)]
    struct RecordingQueue {
        batches: Mutex<Vec<Vec<BatchEntry>>>,
        reject_last: bool,
    }

    impl MessageQueue for RecordingQueue {
        async fn send_message(&self, _body: &str) -> Result<()> {
            Ok(())
        }

        async fn send_message_batch(&self, entries: Vec<BatchEntry>) -> Result<Vec<BatchFailure>> {
            let failures = match (self.reject_last, entries.last()) {
                (true, Some(last)) => vec![BatchFailure {
                    id: last.id.clone(),
                    code: "InvalidParameterValue".to_string(),
                    message: "message too large".to_string(),
                    sender_fault: true,
                }],
                _ => Vec::new(),
            };
            self.batches.lock().unwrap().push(entries);
            Ok(failures)
        }
    }

    fn page_body(count: usize) -> String {
        let keys: Vec<String> = (0..count).map(|i| format!("obj-{}", i)).collect();
        serde_json::to_string(&keys).unwrap()
    }

    #[tokio::test]
    async fn test_page_is_sent_in_batches_of_ten() {
        let queue = RecordingQueue::default();
        let handler = SplitPageHandler::new(queue, PipelineSettings::default());

        let event = SqsEvent::from_bodies(vec![page_body(25)]);
        let enqueued = handler.handle(event, &NoDeadline).await.unwrap();

        assert_eq!(enqueued, 25);
        let batches = handler.objects.batches.lock().unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(batches[2][4].body, "obj-24");

        let ids: HashSet<&str> = batches.iter().flatten().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 25);
    }

    #[tokio::test]
    async fn test_every_record_of_the_event_is_split() {
        let queue = MemoryQueue::new();
        let handler = SplitPageHandler::new(queue.clone(), PipelineSettings::default());

        let event = SqsEvent::from_bodies(vec![page_body(3), page_body(2)]);
        assert_eq!(handler.handle(event, &NoDeadline).await.unwrap(), 5);
        assert_eq!(
            queue.receive(10).await,
            vec!["obj-0", "obj-1", "obj-2", "obj-0", "obj-1"]
        );
    }

    #[tokio::test]
    async fn test_empty_page_sends_nothing() {
        let handler = SplitPageHandler::new(RecordingQueue::default(), PipelineSettings::default());
        let event = SqsEvent::from_bodies(vec!["[]".to_string()]);

        assert_eq!(handler.handle(event, &NoDeadline).await.unwrap(), 0);
        assert!(handler.objects.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_page_fails_the_invocation() {
        let handler = SplitPageHandler::new(RecordingQueue::default(), PipelineSettings::default());
        let event = SqsEvent::from_bodies(vec!["not-json".to_string()]);

        let err = handler.handle(event, &NoDeadline).await.unwrap_err();
        assert!(matches!(err, EtlError::SerializationError(_)));
    }

    #[tokio::test]
    async fn test_rejected_entries_fail_the_invocation() {
        let queue = RecordingQueue {
            reject_last: true,
            ..Default::default()
        };
        let handler = SplitPageHandler::new(queue, PipelineSettings::default());
        let event = SqsEvent::from_bodies(vec![page_body(4)]);

        let err = handler.handle(event, &NoDeadline).await.unwrap_err();
        assert!(matches!(err, EtlError::QueueError { .. }));
        assert!(err.to_string().contains("InvalidParameterValue"));
    }
}
