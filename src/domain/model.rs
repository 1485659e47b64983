use serde::{Deserialize, Deserializer, Serialize};

/// A group of object keys carried by one message on the pages queue.
/// On the wire it is a bare JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Page {
    keys: Vec<String>,
}

impl Page {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, key: String) {
        self.keys.push(key);
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the collected keys and leaves the page empty for reuse.
    pub fn take(&mut self) -> Page {
        Page {
            keys: std::mem::take(&mut self.keys),
        }
    }
}

impl From<Vec<String>> for Page {
    fn from(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

/// Flag read by the state machine's choice state. The deployed definition
/// compares it as a string, so it serializes as `"TRUE"` / `"FALSE"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    #[default]
    #[serde(rename = "FALSE")]
    Incomplete,
    #[serde(rename = "TRUE")]
    Complete,
}

/// Payload passed into and returned from the list-pages step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPagesState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,

    #[serde(default, deserialize_with = "status_from_input")]
    pub all_pages_listed: ListingStatus,

    /// 執行輸入中的其他欄位原封不動地傳回
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 輸入端只認 `"TRUE"`，其他值一律視為未完成；handler 進來時會覆寫這個欄位
fn status_from_input<'de, D>(deserializer: D) -> Result<ListingStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("TRUE") => ListingStatus::Complete,
        _ => ListingStatus::Incomplete,
    })
}

impl ListPagesState {
    pub fn is_complete(&self) -> bool {
        self.all_pages_listed == ListingStatus::Complete
    }
}

/// Queue-triggered invocation payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records")]
    pub records: Vec<SqsMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsMessage {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub receipt_handle: Option<String>,
    pub body: String,
    #[serde(default)]
    pub event_source: Option<String>,
    #[serde(default, rename = "eventSourceARN")]
    pub event_source_arn: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl SqsEvent {
    /// Wraps raw message bodies the way the SQS event source mapping would.
    pub fn from_bodies<I>(bodies: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let records = bodies
            .into_iter()
            .map(|body| SqsMessage {
                message_id: Some(uuid::Uuid::new_v4().to_string()),
                body,
                event_source: Some("aws:sqs".to_string()),
                ..Default::default()
            })
            .collect();
        Self { records }
    }
}

/// One entry of a batch send. `id` only has to be unique within the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub id: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: String,
    pub code: String,
    pub message: String,
    pub sender_fault: bool,
}

/// One listing call's worth of keys, in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    pub keys: Vec<String>,
    pub is_truncated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Count,
}

impl MetricUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::Count => "Count",
        }
    }
}

impl Metric {
    pub fn count(name: &str, value: usize) -> Self {
        Self {
            name: name.to_string(),
            value: value as f64,
            unit: MetricUnit::Count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformOutcome {
    pub key: String,
    pub lines_processed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformSummary {
    pub objects: Vec<TransformOutcome>,
}

impl TransformSummary {
    pub fn lines_processed(&self) -> usize {
        self.objects.iter().map(|o| o.lines_processed).sum()
    }
}
