pub mod etl;
pub mod flatten;
pub mod invoke;
pub mod list_pages;
pub mod split_page;
pub mod transform;

pub use crate::domain::model::{ListPagesState, Page, SqsEvent, TransformSummary};
pub use crate::domain::ports::{ConfigProvider, Handler, MessageQueue, ObjectStore};
pub use crate::utils::error::Result;
