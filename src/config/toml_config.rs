use crate::config::{
    PipelineSettings, DEFAULT_BATCH_SIZE, DEFAULT_FLATTEN_SEPARATOR, DEFAULT_INVOCATION_BUDGET_MS,
    DEFAULT_MAX_LIST_INVOCATIONS, DEFAULT_METRICS_NAMESPACE, DEFAULT_PAGE_SIZE,
    DEFAULT_TIME_BUFFER_MS,
};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_path, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Local run description, e.g.
///
/// ```toml
/// [pipeline]
/// name = "nightly-flatten"
///
/// [source]
/// path = "${DATA_DIR}/raw"
///
/// [destination]
/// path = "./flattened"
///
/// [listing]
/// page_size = 500
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineInfo,
    pub source: LocationConfig,
    pub destination: LocationConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingConfig {
    pub page_size: Option<usize>,
    pub time_buffer_ms: Option<u64>,
    pub invocation_budget_ms: Option<u64>,
    pub max_invocations: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitConfig {
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    pub separator: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub system_stats: bool,
    pub namespace: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            page_size: self.listing.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            batch_size: self.split.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            time_buffer_millis: self.listing.time_buffer_ms.unwrap_or(DEFAULT_TIME_BUFFER_MS),
            flatten_separator: self
                .transform
                .separator
                .clone()
                .unwrap_or_else(|| DEFAULT_FLATTEN_SEPARATOR.to_string()),
            metrics_namespace: self
                .monitoring
                .namespace
                .clone()
                .unwrap_or_else(|| DEFAULT_METRICS_NAMESPACE.to_string()),
        }
    }

    pub fn invocation_budget_ms(&self) -> u64 {
        self.listing
            .invocation_budget_ms
            .unwrap_or(DEFAULT_INVOCATION_BUDGET_MS)
    }

    pub fn max_list_invocations(&self) -> usize {
        self.listing
            .max_invocations
            .unwrap_or(DEFAULT_MAX_LIST_INVOCATIONS)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_path("source.path", &self.source.path)?;
        validate_path("destination.path", &self.destination.path)?;
        if self.source.path == self.destination.path {
            return Err(EtlError::ConfigValidationError {
                field: "destination.path".to_string(),
                message: "Destination must differ from source".to_string(),
            });
        }
        self.settings().validate()
    }
}
