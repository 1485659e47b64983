use crate::config::toml_config::TomlConfig;
use crate::config::{PipelineSettings, DEFAULT_INVOCATION_BUDGET_MS, DEFAULT_MAX_LIST_INVOCATIONS};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_path, validate_positive_number, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "lambda-sqs-etl")]
#[command(about = "Flatten JSON-lines objects from a source to a destination, locally")]
pub struct CliConfig {
    /// Directory holding the source objects
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Directory the flattened objects are written to
    #[arg(long)]
    pub destination_dir: Option<PathBuf>,

    /// TOML run description; flags given on the command line win
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub page_size: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub time_buffer_ms: Option<u64>,

    /// Simulated function timeout for each list-pages invocation
    #[arg(long)]
    pub invocation_budget_ms: Option<u64>,

    #[arg(long)]
    pub separator: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

/// Everything a local run needs after merging the TOML file and the flags.
#[derive(Debug, Clone)]
pub struct LocalRunConfig {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub settings: PipelineSettings,
    pub invocation_budget_ms: u64,
    pub max_list_invocations: usize,
    pub monitor: bool,
}

impl CliConfig {
    pub fn resolve(&self) -> Result<LocalRunConfig> {
        let file = match &self.config {
            Some(path) => Some(TomlConfig::from_file(path)?),
            None => None,
        };

        let mut settings = file.as_ref().map(TomlConfig::settings).unwrap_or_default();
        if let Some(page_size) = self.page_size {
            settings.page_size = page_size;
        }
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = batch_size;
        }
        if let Some(buffer) = self.time_buffer_ms {
            settings.time_buffer_millis = buffer;
        }
        if let Some(separator) = &self.separator {
            settings.flatten_separator = separator.clone();
        }

        let source_dir = self
            .source_dir
            .clone()
            .or_else(|| file.as_ref().map(|f| PathBuf::from(&f.source.path)))
            .ok_or_else(|| EtlError::MissingConfigError {
                field: "source_dir".to_string(),
            })?;
        let destination_dir = self
            .destination_dir
            .clone()
            .or_else(|| file.as_ref().map(|f| PathBuf::from(&f.destination.path)))
            .ok_or_else(|| EtlError::MissingConfigError {
                field: "destination_dir".to_string(),
            })?;

        Ok(LocalRunConfig {
            source_dir,
            destination_dir,
            settings,
            invocation_budget_ms: self
                .invocation_budget_ms
                .or_else(|| file.as_ref().map(TomlConfig::invocation_budget_ms))
                .unwrap_or(DEFAULT_INVOCATION_BUDGET_MS),
            max_list_invocations: file
                .as_ref()
                .map(TomlConfig::max_list_invocations)
                .unwrap_or(DEFAULT_MAX_LIST_INVOCATIONS),
            monitor: self.monitor || file.as_ref().is_some_and(|f| f.monitoring.system_stats),
        })
    }
}

impl Validate for LocalRunConfig {
    fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        validate_path("source_dir", &self.source_dir.to_string_lossy())?;
        validate_path("destination_dir", &self.destination_dir.to_string_lossy())?;
        validate_positive_number("max_list_invocations", self.max_list_invocations, 1)?;

        if !self.source_dir.is_dir() {
            return Err(EtlError::InvalidConfigValueError {
                field: "source_dir".to_string(),
                value: self.source_dir.display().to_string(),
                reason: "Source directory does not exist".to_string(),
            });
        }
        if self.source_dir == self.destination_dir {
            return Err(EtlError::ConfigValidationError {
                field: "destination_dir".to_string(),
                message: "Destination must differ from source".to_string(),
            });
        }
        if self.invocation_budget_ms <= self.settings.time_buffer_millis {
            return Err(EtlError::ConfigValidationError {
                field: "invocation_budget_ms".to_string(),
                message: format!(
                    "Budget of {}ms leaves no time after the {}ms buffer",
                    self.invocation_budget_ms, self.settings.time_buffer_millis
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_flags_only() {
        let source = TempDir::new().unwrap();
        let cli = CliConfig::parse_from([
            "lambda-sqs-etl",
            "--source-dir",
            source.path().to_str().unwrap(),
            "--destination-dir",
            "./flat",
            "--page-size",
            "20",
        ]);

        let run = cli.resolve().unwrap();
        assert_eq!(run.settings.page_size, 20);
        assert_eq!(run.settings.batch_size, 10);
        assert_eq!(run.invocation_budget_ms, DEFAULT_INVOCATION_BUDGET_MS);
        assert!(run.validate().is_ok());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[pipeline]
name = "from-file"

[source]
path = "./raw"

[destination]
path = "./flat"

[split]
batch_size = 4

[transform]
separator = "_"
"#,
        )
        .unwrap();

        let cli = CliConfig::parse_from([
            "lambda-sqs-etl",
            "--config",
            file.path().to_str().unwrap(),
            "--separator",
            "/",
        ]);

        let run = cli.resolve().unwrap();
        assert_eq!(run.source_dir, PathBuf::from("./raw"));
        assert_eq!(run.settings.batch_size, 4);
        assert_eq!(run.settings.flatten_separator, "/");
    }

    #[test]
    fn test_missing_source_dir() {
        let cli = CliConfig::parse_from(["lambda-sqs-etl", "--destination-dir", "./flat"]);
        assert!(matches!(
            cli.resolve(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_budget_must_exceed_buffer() {
        let source = TempDir::new().unwrap();
        let cli = CliConfig::parse_from([
            "lambda-sqs-etl",
            "--source-dir",
            source.path().to_str().unwrap(),
            "--destination-dir",
            "./flat",
            "--invocation-budget-ms",
            "1000",
        ]);

        let run = cli.resolve().unwrap();
        assert!(run.validate().is_err());
    }
}
