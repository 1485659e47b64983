use crate::core::flatten::flatten;
use crate::domain::model::{Metric, SqsEvent, TransformOutcome, TransformSummary};
use crate::domain::ports::{
    ConfigProvider, Handler, MetricsSink, ObjectStore, RemainingTime,
};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde_json::Value;

pub const METRIC_OBJECTS_PROCESSED: &str = "S3ObjectsProcessed";
pub const METRIC_LINES_PROCESSED: &str = "LinesProcessed";

/// Flattens every JSON line of a source object and writes the result to the
/// destination under the same key. Each queue record carries one key.
pub struct TransformHandler<S, D, M, C>
where
    S: ObjectStore,
    D: ObjectStore,
    M: MetricsSink,
    C: ConfigProvider,
{
    source: S,
    destination: D,
    metrics: M,
    config: C,
}

impl<S, D, M, C> TransformHandler<S, D, M, C>
where
    S: ObjectStore,
    D: ObjectStore,
    M: MetricsSink,
    C: ConfigProvider,
{
    pub fn new(source: S, destination: D, metrics: M, config: C) -> Self {
        Self {
            source,
            destination,
            metrics,
            config,
        }
    }

    pub async fn transform_object(&self, key: &str) -> Result<TransformOutcome> {
        let content = self.source.get_object(key).await?;
        let lines = transform_lines(key, &content, self.config.flatten_separator())?;

        self.destination
            .put_object(key, lines.join("\n").as_bytes())
            .await?;

        self.metrics.put_metrics(
            self.config.metrics_namespace(),
            &[
                Metric::count(METRIC_OBJECTS_PROCESSED, 1),
                Metric::count(METRIC_LINES_PROCESSED, lines.len()),
            ],
        )?;

        tracing::debug!(key, lines = lines.len(), "Object transformed");
        Ok(TransformOutcome {
            key: key.to_string(),
            lines_processed: lines.len(),
        })
    }
}

/// Parses each non-blank line as a JSON object and returns the flattened
/// lines, serialized compactly. Lines end at `\n`, `\r\n` or a lone `\r`.
pub fn transform_lines(key: &str, content: &[u8], separator: &str) -> Result<Vec<String>> {
    let text = std::str::from_utf8(content).map_err(|e| EtlError::InvalidRecordError {
        key: key.to_string(),
        line: line_of_offset(content, e.valid_up_to()),
        reason: format!("invalid UTF-8: {}", e),
    })?;

    let mut items = Vec::new();
    for (index, line) in text.lines().flat_map(|l| l.split('\r')).enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let invalid = |reason: String| EtlError::InvalidRecordError {
            key: key.to_string(),
            line: index + 1,
            reason,
        };

        let record = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(record)) => record,
            Ok(other) => {
                return Err(invalid(format!(
                    "expected a JSON object, found {}",
                    json_type(&other)
                )))
            }
            Err(e) => return Err(invalid(e.to_string())),
        };

        items.push(serde_json::to_string(&flatten(&record, separator))?);
    }

    Ok(items)
}

/// Line number of a byte offset, counting `\r\n`, `\r` and `\n` as one
/// line end each, the same way the records are split.
fn line_of_offset(content: &[u8], offset: usize) -> usize {
    let mut line = 1;
    let mut bytes = content[..offset].iter().peekable();
    while let Some(byte) = bytes.next() {
        match byte {
            b'\n' => line += 1,
            b'\r' => {
                bytes.next_if_eq(&&b'\n');
                line += 1;
            }
            _ => {}
        }
    }
    line
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl<S, D, M, C> Handler for TransformHandler<S, D, M, C>
where
    S: ObjectStore,
    D: ObjectStore,
    M: MetricsSink,
    C: ConfigProvider,
{
    type Event = SqsEvent;
    type Output = TransformSummary;

    const NAME: &'static str = "transform";

    async fn handle(&self, event: SqsEvent, _budget: &dyn RemainingTime) -> Result<TransformSummary> {
        let mut summary = TransformSummary::default();

        for record in &event.records {
            let key = record.body.as_str();
            let outcome = self.transform_object(key).await.inspect_err(|e| {
                tracing::error!(key, error = %e, "Transform failed");
            })?;
            summary.objects.push(outcome);
        }

        tracing::info!(
            objects = summary.objects.len(),
            lines = summary.lines_processed(),
            "Transform batch finished"
        );
        Ok(summary)
    }
}
