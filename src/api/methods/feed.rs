use std::sync::Arc;

use crate::{
    api::types::{ListEnvelope, feed::Post},
    client::{ApiClient, ApiRequest},
    config::FeedConfig,
    error::Result,
    feed::{Page, Paginator},
};

pub async fn fetch_posts(client: &ApiClient, page: u32, limit: u32) -> Result<Page<Post>> {
    let request = ApiRequest::get("/posts/feed")
        .query("page", page)
        .query("limit", limit);

    let attributes = client
        .request::<ListEnvelope<Post>>(request)
        .await?
        .data
        .attributes;

    let has_more = !attributes.is_last_page();
    Ok(Page::new(attributes.results, has_more))
}

/// Drives a [`Paginator`] from the home feed.
pub struct FeedLoader {
    client: Arc<ApiClient>,
    paginator: Paginator<Post>,
    page_size: u32,
}

impl FeedLoader {
    pub fn new(client: Arc<ApiClient>, page_size: u32) -> Self {
        Self {
            client,
            paginator: Paginator::new(),
            page_size,
        }
    }

    pub fn from_config(client: Arc<ApiClient>, feed_config: &FeedConfig) -> Self {
        Self::new(client, feed_config.page_size)
    }

    /// Fetches the next page if the sentinel trigger is not suppressed. Returns how many new
    /// posts were added.
    pub async fn load_more(&mut self) -> Result<usize> {
        let Some(page) = self.paginator.on_sentinel_visible() else {
            return Ok(0);
        };

        match fetch_posts(&self.client, page, self.page_size).await {
            Ok(posts) => Ok(self.paginator.append_page(posts)),
            Err(e) => {
                self.paginator.fail_page();
                Err(e)
            }
        }
    }

    pub fn posts(&self) -> &[Post] {
        self.paginator.items()
    }

    pub fn is_exhausted(&self) -> bool {
        self.paginator.is_exhausted()
    }

    pub fn reset(&mut self) {
        self.paginator.reset();
    }
}
