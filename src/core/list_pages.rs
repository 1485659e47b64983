use crate::domain::model::{ListPagesState, ListingStatus, Page};
use crate::domain::ports::{ConfigProvider, Handler, MessageQueue, ObjectStore, RemainingTime};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Lists the source bucket and sends its keys to the pages queue, one page
/// per message.
///
/// Listing a large bucket can outlast a single invocation, so the handler
/// stops once the remaining time drops under the configured buffer and
/// returns its state with `all_pages_listed = "FALSE"`. The state machine
/// invokes it again with that state and listing resumes after `bookmark`.
pub struct ListPagesHandler<S: ObjectStore, Q: MessageQueue, C: ConfigProvider> {
    source: S,
    pages: Q,
    config: C,
}

impl<S: ObjectStore, Q: MessageQueue, C: ConfigProvider> ListPagesHandler<S, Q, C> {
    pub fn new(source: S, pages: Q, config: C) -> Self {
        Self {
            source,
            pages,
            config,
        }
    }

    async fn send_page(&self, page: &mut Page) -> Result<usize> {
        if page.is_empty() {
            return Ok(0);
        }
        let page = page.take();
        let body = serde_json::to_string(&page)?;
        self.pages.send_message(&body).await?;
        tracing::debug!("Sent page of {} keys", page.len());
        Ok(page.len())
    }
}

#[async_trait]
impl<S, Q, C> Handler for ListPagesHandler<S, Q, C>
where
    S: ObjectStore,
    Q: MessageQueue,
    C: ConfigProvider,
{
    type Event = ListPagesState;
    type Output = ListPagesState;

    const NAME: &'static str = "list_pages";

    async fn handle(
        &self,
        mut state: ListPagesState,
        budget: &dyn RemainingTime,
    ) -> Result<ListPagesState> {
        state.all_pages_listed = ListingStatus::Incomplete;

        let page_size = self.config.page_size();
        let time_buffer = self.config.time_buffer_millis();
        let mut page = Page::with_capacity(page_size);
        let mut keys_sent = 0usize;

        tracing::info!(
            bookmark = state.bookmark.as_deref().unwrap_or(""),
            "Listing source objects"
        );

        let mut cursor = state.bookmark.clone();
        loop {
            let listing = self.source.list_keys(cursor.as_deref(), page_size).await?;
            let exhausted = !listing.is_truncated || listing.keys.is_empty();

            for key in listing.keys {
                if budget.remaining_millis() < time_buffer {
                    // 先送出未滿的 page，bookmark 已經越過這些 key
                    keys_sent += self.send_page(&mut page).await?;
                    tracing::info!(
                        keys_sent,
                        bookmark = state.bookmark.as_deref().unwrap_or(""),
                        "Time buffer reached, handing back to the state machine"
                    );
                    return Ok(state);
                }

                state.bookmark = Some(key.clone());
                page.push(key);
                if page.len() >= page_size {
                    keys_sent += self.send_page(&mut page).await?;
                }
            }

            if exhausted {
                break;
            }
            cursor = state.bookmark.clone();
        }

        keys_sent += self.send_page(&mut page).await?;
        state.all_pages_listed = ListingStatus::Complete;

        tracing::info!(keys_sent, "All pages listed");
        Ok(state)
    }
}
