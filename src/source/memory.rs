//! In-memory document store

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use url::Url;

use super::{ContentSource, Document, DocumentPage};
use crate::error::{SourceError, SourceResult};

const CURSOR_SCHEME: &str = "memory";

/// Serves documents held in memory, paginated like the remote API
///
/// Cursors have the form `memory://{type}?page={n}&pageSize={size}`.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: Vec<Document>,
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Load a JSON array of documents
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("reading fixture {:?}", path))?;
        let documents: Vec<Document> =
            serde_json::from_str(&content).with_context(|| format!("parsing fixture {:?}", path))?;
        Ok(Self::new(documents))
    }

    fn of_type<'a>(&'a self, document_type: &'a str) -> impl Iterator<Item = &'a Document> {
        self.documents
            .iter()
            .filter(move |d| d.doc_type == document_type)
    }

    fn has_type(&self, document_type: &str) -> bool {
        self.of_type(document_type).next().is_some()
    }

    fn page(&self, document_type: &str, page: u32, page_size: u32) -> DocumentPage {
        let all: Vec<&Document> = self.of_type(document_type).collect();
        let total = all.len() as u32;
        let total_pages = total.div_ceil(page_size);
        // Both factors come from the cursor; in u64 the product cannot overflow
        let start = (u64::from(page.max(1)) - 1) * u64::from(page_size);
        let start = usize::try_from(start).unwrap_or(usize::MAX);

        let results = all
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();

        let next_page = (page < total_pages).then(|| {
            format!(
                "{}://{}?page={}&pageSize={}",
                CURSOR_SCHEME,
                document_type,
                page + 1,
                page_size
            )
        });

        DocumentPage {
            results,
            next_page,
            page,
            total_pages,
            total_results_size: total,
        }
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn fetch_page(&self, document_type: &str, page_size: u32) -> SourceResult<DocumentPage> {
        if !self.has_type(document_type) {
            return Err(SourceError::InvalidType(document_type.to_string()));
        }
        Ok(self.page(document_type, 1, page_size.max(1)))
    }

    async fn fetch_by_key(&self, document_type: &str, key: &str) -> SourceResult<Document> {
        if !self.has_type(document_type) {
            return Err(SourceError::InvalidType(document_type.to_string()));
        }
        self.of_type(document_type)
            .find(|d| d.key() == key)
            .cloned()
            .ok_or_else(|| SourceError::not_found(document_type, key))
    }

    async fn fetch_next_page(&self, cursor: &str) -> SourceResult<DocumentPage> {
        let invalid = || SourceError::InvalidCursor(cursor.to_string());

        let url = Url::parse(cursor).map_err(|_| invalid())?;
        if url.scheme() != CURSOR_SCHEME {
            return Err(invalid());
        }
        let document_type = url.host_str().ok_or_else(invalid)?;

        let mut page = None;
        let mut page_size = None;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "page" => page = value.parse::<u32>().ok(),
                "pageSize" => page_size = value.parse::<u32>().ok(),
                _ => {}
            }
        }

        let (Some(page), Some(page_size)) = (page, page_size) else {
            return Err(invalid());
        };
        if page < 2 || page_size == 0 || !self.has_type(document_type) {
            return Err(invalid());
        }

        let result = self.page(document_type, page, page_size);
        if result.results.is_empty() {
            return Err(invalid());
        }
        Ok(result)
    }
}
