use crate::domain::model::Metric;
use crate::domain::ports::MetricsSink;
use crate::utils::error::Result;
use serde_json::{json, Value};

/// Writes metrics as CloudWatch Embedded Metric Format lines on stdout.
/// Lambda forwards stdout to CloudWatch Logs, which extracts the metrics.
#[derive(Debug, Clone, Default)]
pub struct EmfMetrics;

impl EmfMetrics {
    pub fn render(namespace: &str, metrics: &[Metric], timestamp_ms: i64) -> Value {
        let definitions: Vec<Value> = metrics
            .iter()
            .map(|m| json!({"Name": m.name, "Unit": m.unit.as_str()}))
            .collect();

        let mut document = json!({
            "_aws": {
                "Timestamp": timestamp_ms,
                "CloudWatchMetrics": [{
                    "Namespace": namespace,
                    "Dimensions": [[]],
                    "Metrics": definitions,
                }],
            },
        });
        if let Value::Object(fields) = &mut document {
            for metric in metrics {
                fields.insert(metric.name.clone(), json!(metric.value));
            }
        }
        document
    }
}

impl MetricsSink for EmfMetrics {
    fn put_metrics(&self, namespace: &str, metrics: &[Metric]) -> Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }
        let document = Self::render(namespace, metrics, chrono::Utc::now().timestamp_millis());
        // EMF 必須是獨立的一行 JSON，不能經過 tracing 的格式化
        println!("{}", serde_json::to_string(&document)?);
        Ok(())
    }
}

/// Reports metrics through the tracing subscriber; used for local runs.
#[derive(Debug, Clone, Default)]
pub struct LogMetrics;

impl MetricsSink for LogMetrics {
    fn put_metrics(&self, namespace: &str, metrics: &[Metric]) -> Result<()> {
        for metric in metrics {
            tracing::debug!(
                namespace,
                metric = %metric.name,
                value = metric.value,
                unit = metric.unit.as_str(),
                "metric"
            );
        }
        Ok(())
    }
}
