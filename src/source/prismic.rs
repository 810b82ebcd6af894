//! Prismic document API client

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

use super::{ContentSource, Document, DocumentPage};
use crate::error::{SourceError, SourceResult};

const USER_AGENT: &str = concat!("spacetraveling/", env!("CARGO_PKG_VERSION"));

/// API root response: refs and the repository's custom types
#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
    #[serde(default)]
    types: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Resolved content release to query against
struct Release {
    master_ref: String,
    types: HashMap<String, String>,
}

/// Client for a Prismic repository (`https://{repo}.cdn.prismic.io/api/v2`)
pub struct PrismicClient {
    endpoint: Url,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl PrismicClient {
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self> {
        let mut endpoint =
            Url::parse(endpoint).with_context(|| format!("invalid API endpoint {}", endpoint))?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            endpoint,
            access_token: access_token.filter(|t| !t.is_empty()),
            client,
        })
    }

    fn search_url(&self) -> SourceResult<Url> {
        self.endpoint
            .join("documents/search")
            .map_err(|e| SourceError::SourceUnavailable(e.to_string()))
    }

    fn authorize(&self, mut url: Url) -> Url {
        if let Some(token) = &self.access_token {
            let present = url.query_pairs().any(|(k, _)| k == "access_token");
            if !present {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
        url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> SourceResult<T> {
        tracing::debug!("GET {}", url.path());
        let resp = self.client.get(self.authorize(url)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::SourceUnavailable(format!(
                "content API answered {}",
                status
            )));
        }
        Ok(resp.json().await?)
    }

    async fn release(&self) -> SourceResult<Release> {
        let root: ApiRoot = self.get_json(self.endpoint.clone()).await?;
        let master_ref = root
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| SourceError::MalformedResponse("no master ref".to_string()))?;
        Ok(Release {
            master_ref,
            types: root.types,
        })
    }

    async fn release_for_type(&self, document_type: &str) -> SourceResult<Release> {
        let release = self.release().await?;
        if !release.types.contains_key(document_type) {
            return Err(SourceError::InvalidType(document_type.to_string()));
        }
        Ok(release)
    }

    fn query(&self, release: &Release, predicates: &[String], page_size: u32) -> SourceResult<Url> {
        let mut url = self.search_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", &release.master_ref);
            for predicate in predicates {
                pairs.append_pair("q", &format!("[{}]", predicate));
            }
            pairs.append_pair("pageSize", &page_size.to_string());
        }
        Ok(url)
    }

    /// Drop the access token the API echoes back into `next_page`
    ///
    /// Cursors end up in public pages; [`PrismicClient::authorize`] adds the
    /// token again when a cursor is fetched.
    fn public_page(&self, mut page: DocumentPage) -> DocumentPage {
        page.next_page = page.next_page.and_then(|cursor| match Url::parse(&cursor) {
            Ok(url) => Some(without_token(url).to_string()),
            Err(_) => {
                tracing::warn!("Dropping unparseable next page cursor");
                None
            }
        });
        page
    }

    /// Accept only search URLs on this repository
    fn parse_cursor(&self, cursor: &str) -> SourceResult<Url> {
        let invalid = || SourceError::InvalidCursor(cursor.to_string());
        let url = Url::parse(cursor).map_err(|_| invalid())?;
        let search = self.search_url()?;

        if url.scheme() != search.scheme()
            || url.host_str() != search.host_str()
            || url.port_or_known_default() != search.port_or_known_default()
            || url.path() != search.path()
            || !url.query_pairs().any(|(k, _)| k == "ref")
        {
            return Err(invalid());
        }
        Ok(url)
    }
}

fn without_token(mut url: Url) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(k, _)| k != "access_token")
        .collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url
}

fn at(path: &str, value: &str) -> String {
    format!("[at({},\"{}\")]", path, value.replace('"', "\\\""))
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn fetch_page(&self, document_type: &str, page_size: u32) -> SourceResult<DocumentPage> {
        let release = self.release_for_type(document_type).await?;
        let url = self.query(&release, &[at("document.type", document_type)], page_size)?;
        Ok(self.public_page(self.get_json(url).await?))
    }

    async fn fetch_by_key(&self, document_type: &str, key: &str) -> SourceResult<Document> {
        let release = self.release_for_type(document_type).await?;
        let predicates = [
            at("document.type", document_type),
            at(&format!("my.{}.uid", document_type), key),
        ];
        let url = self.query(&release, &predicates, 1)?;
        let page: DocumentPage = self.get_json(url).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::not_found(document_type, key))
    }

    async fn fetch_next_page(&self, cursor: &str) -> SourceResult<DocumentPage> {
        let url = self.parse_cursor(cursor)?;
        let resp = self.client.get(self.authorize(url)).send().await?;
        let status = resp.status();

        if status.is_client_error() {
            tracing::debug!("cursor rejected with {}", status);
            return Err(SourceError::InvalidCursor(cursor.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::SourceUnavailable(format!(
                "content API answered {}",
                status
            )));
        }
        Ok(self.public_page(resp.json().await?))
    }
}

impl std::fmt::Debug for PrismicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrismicClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}
