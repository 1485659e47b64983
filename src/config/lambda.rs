use crate::config::PipelineSettings;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_queue_url, validate_required_field, validate_s3_bucket_name, Validate,
};
use std::env;
use std::str::FromStr;

/// Function configuration read from the Lambda environment. Each function
/// of the stack only receives the variables its handler needs, so the
/// bucket and queue settings stay optional until a handler asks for them.
#[derive(Debug, Clone, Default)]
pub struct LambdaConfig {
    pub source_bucket: Option<String>,
    pub destination_bucket: Option<String>,
    pub pages_queue_url: Option<String>,
    pub objects_queue_url: Option<String>,
    pub settings: PipelineSettings,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PipelineSettings::default();
        let settings = PipelineSettings {
            page_size: parse_or("PAGE_SIZE", &lookup, defaults.page_size)?,
            batch_size: parse_or("BATCH_SIZE", &lookup, defaults.batch_size)?,
            time_buffer_millis: parse_or("TIME_BUFFER_MS", &lookup, defaults.time_buffer_millis)?,
            flatten_separator: lookup("FLATTEN_SEPARATOR").unwrap_or(defaults.flatten_separator),
            metrics_namespace: lookup("METRICS_NAMESPACE").unwrap_or(defaults.metrics_namespace),
        };

        Ok(Self {
            source_bucket: non_empty(lookup("SOURCE_BUCKET_NAME")),
            destination_bucket: non_empty(lookup("DESTINATION_BUCKET_NAME")),
            pages_queue_url: non_empty(lookup("PAGES_SQS_QUEUE_URL")),
            objects_queue_url: non_empty(lookup("S3_OBJECTS_SQS_QUEUE_URL")),
            settings,
        })
    }

    pub fn source_bucket(&self) -> Result<&str> {
        validate_required_field("SOURCE_BUCKET_NAME", &self.source_bucket).map(String::as_str)
    }

    pub fn destination_bucket(&self) -> Result<&str> {
        validate_required_field("DESTINATION_BUCKET_NAME", &self.destination_bucket)
            .map(String::as_str)
    }

    pub fn pages_queue_url(&self) -> Result<&str> {
        validate_required_field("PAGES_SQS_QUEUE_URL", &self.pages_queue_url).map(String::as_str)
    }

    pub fn objects_queue_url(&self) -> Result<&str> {
        validate_required_field("S3_OBJECTS_SQS_QUEUE_URL", &self.objects_queue_url)
            .map(String::as_str)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_or<T, F>(name: &str, lookup: &F, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| EtlError::InvalidConfigValueError {
                    field: name.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}

impl ConfigProvider for LambdaConfig {
    fn page_size(&self) -> usize {
        self.settings.page_size
    }

    fn batch_size(&self) -> usize {
        self.settings.batch_size
    }

    fn time_buffer_millis(&self) -> u64 {
        self.settings.time_buffer_millis
    }

    fn flatten_separator(&self) -> &str {
        &self.settings.flatten_separator
    }

    fn metrics_namespace(&self) -> &str {
        &self.settings.metrics_namespace
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        self.settings.validate()?;

        if let Some(bucket) = &self.source_bucket {
            validate_s3_bucket_name("SOURCE_BUCKET_NAME", bucket)?;
        }
        if let Some(bucket) = &self.destination_bucket {
            validate_s3_bucket_name("DESTINATION_BUCKET_NAME", bucket)?;
        }
        if let Some(url) = &self.pages_queue_url {
            validate_queue_url("PAGES_SQS_QUEUE_URL", url)?;
        }
        if let Some(url) = &self.objects_queue_url {
            validate_queue_url("S3_OBJECTS_SQS_QUEUE_URL", url)?;
        }

        tracing::debug!("Lambda configuration validation passed");
        Ok(())
    }
}

/// Which of the three functions this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    ListPages,
    SplitPage,
    Transform,
}

impl HandlerKind {
    /// Lambda exposes the function's `Handler` property as `_HANDLER`.
    pub fn from_env() -> Result<Self> {
        let raw = env::var("_HANDLER").map_err(|_| EtlError::MissingConfigError {
            field: "_HANDLER".to_string(),
        })?;
        raw.parse()
    }

    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::ListPages => "list_pages",
            HandlerKind::SplitPage => "split_page",
            HandlerKind::Transform => "transform",
        }
    }
}

impl FromStr for HandlerKind {
    type Err = EtlError;

    fn from_str(raw: &str) -> Result<Self> {
        // 接受 "module.handler_list_pages" 這類舊式寫法
        let name = raw.rsplit('.').next().unwrap_or(raw);
        let name = name.strip_prefix("handler_").unwrap_or(name);
        match name {
            "list_pages" => Ok(HandlerKind::ListPages),
            "split_page" => Ok(HandlerKind::SplitPage),
            "transform" => Ok(HandlerKind::Transform),
            _ => Err(EtlError::InvalidConfigValueError {
                field: "_HANDLER".to_string(),
                value: raw.to_string(),
                reason: "Expected one of list_pages, split_page, transform".to_string(),
            }),
        }
    }
}
