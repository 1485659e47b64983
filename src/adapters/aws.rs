use crate::domain::model::{BatchEntry, BatchFailure, ObjectListing};
use crate::domain::ports::{MessageQueue, ObjectStore};
use crate::utils::error::{EtlError, Result};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sqs::types::SendMessageBatchRequestEntry;
use aws_sdk_sqs::Client as SqsClient;

#[derive(Debug, Clone)]
pub struct S3Store {
    client: S3Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

impl ObjectStore for S3Store {
    async fn list_keys(&self, start_after: Option<&str>, max_keys: usize) -> Result<ObjectListing> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(i32::try_from(max_keys).unwrap_or(1000))
            .set_start_after(start_after.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                EtlError::storage(
                    "ListObjectsV2",
                    start_after.unwrap_or_default(),
                    DisplayErrorContext(&e),
                )
            })?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        Ok(ObjectListing {
            keys,
            is_truncated: output.is_truncated().unwrap_or(false),
        })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| EtlError::storage("GetObject", key, DisplayErrorContext(&e)))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| EtlError::storage("GetObject", key, e))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| EtlError::storage("PutObject", key, DisplayErrorContext(&e)))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: SqsClient,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: SqsClient, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

impl MessageQueue for SqsQueue {
    async fn send_message(&self, body: &str) -> Result<()> {
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                EtlError::queue(format!(
                    "SendMessage to {} failed: {}",
                    self.queue_url,
                    aws_sdk_sqs::error::DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn send_message_batch(&self, entries: Vec<BatchEntry>) -> Result<Vec<BatchFailure>> {
        let entries = entries
            .into_iter()
            .map(|entry| {
                SendMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .message_body(entry.body)
                    .build()
                    .map_err(EtlError::queue)
            })
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| {
                EtlError::queue(format!(
                    "SendMessageBatch to {} failed: {}",
                    self.queue_url,
                    aws_sdk_sqs::error::DisplayErrorContext(&e)
                ))
            })?;

        Ok(output
            .failed()
            .iter()
            .map(|failure| BatchFailure {
                id: failure.id().to_string(),
                code: failure.code().to_string(),
                message: failure.message().unwrap_or_default().to_string(),
                sender_fault: failure.sender_fault(),
            })
            .collect())
    }
}
