#[cfg(feature = "cli")]
pub mod cli;
pub mod lambda;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use serde::{Deserialize, Serialize};

/// Keys per pages-queue message; also the listing page size.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const MAX_PAGE_SIZE: usize = 1000;
/// SQS accepts at most ten entries per batch call.
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const MAX_BATCH_SIZE: usize = 10;
/// Stop listing when less than this much invocation time is left.
pub const DEFAULT_TIME_BUFFER_MS: u64 = 30_000;
pub const DEFAULT_FLATTEN_SEPARATOR: &str = ".";
pub const DEFAULT_METRICS_NAMESPACE: &str = "custom/lambda-etl";
/// Simulated function timeout for local runs.
pub const DEFAULT_INVOCATION_BUDGET_MS: u64 = 300_000;
pub const DEFAULT_MAX_LIST_INVOCATIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub page_size: usize,
    pub batch_size: usize,
    pub time_buffer_millis: u64,
    pub flatten_separator: String,
    pub metrics_namespace: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            time_buffer_millis: DEFAULT_TIME_BUFFER_MS,
            flatten_separator: DEFAULT_FLATTEN_SEPARATOR.to_string(),
            metrics_namespace: DEFAULT_METRICS_NAMESPACE.to_string(),
        }
    }
}

impl ConfigProvider for PipelineSettings {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn time_buffer_millis(&self) -> u64 {
        self.time_buffer_millis
    }

    fn flatten_separator(&self) -> &str {
        &self.flatten_separator
    }

    fn metrics_namespace(&self) -> &str {
        &self.metrics_namespace
    }
}

impl Validate for PipelineSettings {
    fn validate(&self) -> Result<()> {
        validate_range("page_size", self.page_size, 1, MAX_PAGE_SIZE)?;
        validate_range("batch_size", self.batch_size, 1, MAX_BATCH_SIZE)?;
        if self.flatten_separator.is_empty() {
            return Err(crate::utils::error::EtlError::InvalidConfigValueError {
                field: "flatten_separator".to_string(),
                value: String::new(),
                reason: "Separator cannot be empty".to_string(),
            });
        }
        validate_non_empty_string("metrics_namespace", &self.metrics_namespace)?;
        Ok(())
    }
}
