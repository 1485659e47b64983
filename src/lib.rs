pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, LocalRunConfig};

#[cfg(feature = "lambda")]
pub use adapters::{S3Store, SqsQueue};

pub use adapters::{LocalStore, MemoryMetrics, MemoryQueue, MemoryStore};
pub use config::lambda::{HandlerKind, LambdaConfig};
pub use config::PipelineSettings;
pub use core::{
    etl::{EtlEngine, RunSummary},
    list_pages::ListPagesHandler,
    split_page::SplitPageHandler,
    transform::TransformHandler,
};
pub use domain::model::ListPagesState;
pub use utils::error::{EtlError, Result};
