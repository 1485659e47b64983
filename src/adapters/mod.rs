// Adapters layer: concrete implementations of the domain ports.

#[cfg(feature = "lambda")]
pub mod aws;
pub mod clock;
pub mod local;
pub mod memory;
pub mod metrics;

#[cfg(feature = "lambda")]
pub use aws::{S3Store, SqsQueue};
pub use clock::{InvocationBudget, LambdaDeadline};
pub use local::LocalStore;
pub use memory::{MemoryMetrics, MemoryQueue, MemoryStore};
pub use metrics::{EmfMetrics, LogMetrics};
