use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Storage {operation} failed for '{key}': {message}")]
    StorageError {
        operation: String,
        key: String,
        message: String,
    },

    #[error("Queue error: {message}")]
    QueueError { message: String },

    #[error("Invalid record in '{key}' at line {line}: {reason}")]
    InvalidRecordError {
        key: String,
        line: usize,
        reason: String,
    },

    #[error("Invalid {handler} event: {message}")]
    InvalidEventError { handler: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    Queue,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn storage(operation: &str, key: &str, message: impl std::fmt::Display) -> Self {
        EtlError::StorageError {
            operation: operation.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    pub fn queue(message: impl std::fmt::Display) -> Self {
        EtlError::QueueError {
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::StorageError { .. } => ErrorCategory::Storage,
            EtlError::QueueError { .. } => ErrorCategory::Queue,
            EtlError::SerializationError(_)
            | EtlError::InvalidRecordError { .. }
            | EtlError::InvalidEventError { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    /// 嚴重程度決定 CLI 的退出碼；Medium 代表重試可能成功
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Storage | ErrorCategory::Queue => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } => {
                format!("Set the {} environment variable or config value", field)
            }
            EtlError::InvalidConfigValueError { field, .. }
            | EtlError::ConfigValidationError { field, .. } => {
                format!("Check the value configured for {}", field)
            }
            EtlError::StorageError { .. } => {
                "Check bucket names, object permissions and network access, then retry".to_string()
            }
            EtlError::QueueError { .. } => {
                "Check the queue URL and send permissions, then retry".to_string()
            }
            EtlError::InvalidRecordError { .. } | EtlError::SerializationError(_) => {
                "Every non-blank line of a source object must be a JSON object".to_string()
            }
            EtlError::InvalidEventError { .. } => {
                "Check the event source mapping; the payload does not match the handler".to_string()
            }
            EtlError::ProcessingError { .. } => {
                "Inspect the input data and run again with --verbose".to_string()
            }
            EtlError::IoError(_) => "Check file system permissions and free space".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Storage => format!("Could not access object storage: {}", self),
            ErrorCategory::Queue => format!("Could not send to the queue: {}", self),
            ErrorCategory::Data => format!("Input data could not be processed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
