//! Listing pagination state
//!
//! A [`PostList`] starts from the first page fetched at render time and grows
//! one page per "load more". At most one fetch runs at a time: a trigger that
//! arrives while another is pending is suppressed rather than queued, so the
//! list always equals the concatenation of the pages fetched, in order.

use std::collections::HashSet;
use tokio::sync::Mutex;

use crate::content::{PostPage, PostSummary};
use crate::error::SourceResult;
use crate::source::ContentSource;

/// Outcome of a "load more" trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// A page was fetched and this many posts appended
    Appended(usize),
    /// No cursor left, nothing fetched
    Exhausted,
    /// Another fetch is still pending, this trigger was dropped
    InFlight,
}

#[derive(Debug, Default)]
struct ListState {
    posts: Vec<PostSummary>,
    keys: HashSet<String>,
    cursor: Option<String>,
}

impl ListState {
    fn append(&mut self, page: PostPage) -> usize {
        let mut appended = 0;
        for post in page.items {
            if self.keys.insert(post.key.clone()) {
                self.posts.push(post);
                appended += 1;
            } else {
                tracing::warn!("Dropping repeated post {:?} from page", post.key);
            }
        }
        self.cursor = page.next_cursor;
        appended
    }
}

/// Posts shown on the listing plus the cursor of the next page
#[derive(Debug, Default)]
pub struct PostList {
    state: Mutex<ListState>,
}

impl PostList {
    /// Seed the list from the first page
    pub fn seed(page: PostPage) -> Self {
        let mut state = ListState::default();
        state.append(page);
        Self {
            state: Mutex::new(state),
        }
    }

    /// Fetch the first page of `document_type` and seed a list from it
    pub async fn first_page(
        source: &dyn ContentSource,
        document_type: &str,
        page_size: u32,
    ) -> SourceResult<Self> {
        let page = source.fetch_page(document_type, page_size).await?;
        Ok(Self::seed(PostPage::try_from(&page)?))
    }

    /// Fetch and append the next page
    ///
    /// On error the list and cursor are left as they were.
    pub async fn load_more(&self, source: &dyn ContentSource) -> SourceResult<LoadMore> {
        // Held across the fetch: this is the in-flight slot
        let Ok(mut state) = self.state.try_lock() else {
            tracing::debug!("Load more ignored, a fetch is already in flight");
            return Ok(LoadMore::InFlight);
        };

        let Some(cursor) = state.cursor.clone() else {
            return Ok(LoadMore::Exhausted);
        };

        let page = source.fetch_next_page(&cursor).await?;
        let page = PostPage::try_from(&page)?;
        let appended = state.append(page);
        tracing::debug!("Appended {} posts, {} total", appended, state.posts.len());

        Ok(LoadMore::Appended(appended))
    }

    /// Snapshot of the posts loaded so far
    pub async fn posts(&self) -> Vec<PostSummary> {
        self.state.lock().await.posts.clone()
    }

    /// Cursor of the next page, `None` once pagination is over
    pub async fn cursor(&self) -> Option<String> {
        self.state.lock().await.cursor.clone()
    }

    /// Whether "load more" should be offered
    pub async fn has_more(&self) -> bool {
        self.state.lock().await.cursor.is_some()
    }

    pub fn into_parts(self) -> (Vec<PostSummary>, Option<String>) {
        let state = self.state.into_inner();
        (state.posts, state.cursor)
    }
}
