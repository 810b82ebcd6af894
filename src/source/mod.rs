//! Content source adapter
//!
//! The blog reads every document through [`ContentSource`]. The production
//! backend is the Prismic document API ([`PrismicClient`]); [`MemorySource`]
//! serves documents from memory or from a JSON fixture file.

mod memory;
mod prismic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::SourceConfig;
use crate::error::{SourceError, SourceResult};

pub use memory::MemorySource;
pub use prismic::PrismicClient;

/// A document as returned by the content API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    /// Unique key within the document type (the post slug)
    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type")]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    /// Custom type fields
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Document {
    /// Key used in routes: the uid, or the id for documents without one
    pub fn key(&self) -> &str {
        self.uid.as_deref().unwrap_or(&self.id)
    }
}

/// One page of a paginated search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub results: Vec<Document>,

    /// Opaque cursor for the following page
    #[serde(default)]
    pub next_page: Option<String>,

    #[serde(default = "first_page")]
    pub page: u32,

    #[serde(default)]
    pub total_pages: u32,

    #[serde(default)]
    pub total_results_size: u32,
}

fn first_page() -> u32 {
    1
}

/// Read-only access to a paginated document store
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First page of documents of the given type
    async fn fetch_page(&self, document_type: &str, page_size: u32) -> SourceResult<DocumentPage>;

    /// Single document by its unique key
    async fn fetch_by_key(&self, document_type: &str, key: &str) -> SourceResult<Document>;

    /// Page designated by a cursor obtained from a previous page
    async fn fetch_next_page(&self, cursor: &str) -> SourceResult<DocumentPage>;
}

#[async_trait]
impl<S: ContentSource + ?Sized> ContentSource for Arc<S> {
    async fn fetch_page(&self, document_type: &str, page_size: u32) -> SourceResult<DocumentPage> {
        (**self).fetch_page(document_type, page_size).await
    }

    async fn fetch_by_key(&self, document_type: &str, key: &str) -> SourceResult<Document> {
        (**self).fetch_by_key(document_type, key).await
    }

    async fn fetch_next_page(&self, cursor: &str) -> SourceResult<DocumentPage> {
        (**self).fetch_next_page(cursor).await
    }
}

/// Bounds every call of the inner source by a timeout
pub struct Timed<S> {
    inner: S,
    timeout: Duration,
}

impl<S> Timed<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = SourceResult<T>>,
    ) -> SourceResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::SourceUnavailable(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl<S: ContentSource> ContentSource for Timed<S> {
    async fn fetch_page(&self, document_type: &str, page_size: u32) -> SourceResult<DocumentPage> {
        self.bounded(self.inner.fetch_page(document_type, page_size))
            .await
    }

    async fn fetch_by_key(&self, document_type: &str, key: &str) -> SourceResult<Document> {
        self.bounded(self.inner.fetch_by_key(document_type, key))
            .await
    }

    async fn fetch_next_page(&self, cursor: &str) -> SourceResult<DocumentPage> {
        self.bounded(self.inner.fetch_next_page(cursor)).await
    }
}

/// Build the configured source: a fixture file when one is set, Prismic otherwise
pub fn from_config(config: &SourceConfig) -> anyhow::Result<Arc<dyn ContentSource>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    if let Some(fixture) = &config.fixture {
        tracing::info!("Reading documents from fixture {:?}", fixture);
        let source = MemorySource::load(fixture)?;
        return Ok(Arc::new(Timed::new(source, timeout)));
    }

    let Some(endpoint) = config.endpoint.as_deref() else {
        anyhow::bail!("No content API endpoint configured (set PRISMIC_API_ENDPOINT or source.endpoint)");
    };

    let client = PrismicClient::new(endpoint, config.access_token.clone())?;
    Ok(Arc::new(Timed::new(client, timeout)))
}
