//! HTTP server with incremental regeneration
//!
//! Generated pages are served from the public directory. A page older than
//! its revalidation interval is still served, and regenerated in the
//! background. Posts that were never generated answer with a loading page
//! while generation runs.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::PostPage;
use crate::error::SourceError;
use crate::generator::Generator;
use crate::helpers::is_valid_key;
use crate::templates::PostSummaryData;

/// Most keys remembered as missing at once
const MAX_MISSING: usize = 1024;

/// A page the server can regenerate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Page {
    Listing,
    Post(String),
}

/// Server state
pub struct ServerState {
    generator: Generator,
    public_dir: PathBuf,
    listing_ttl: Duration,
    post_ttl: Duration,
    fallback: bool,
    /// Pages with a regeneration task running
    pending: Mutex<HashSet<Page>>,
    /// Keys the source reported missing, and when
    missing: Mutex<HashMap<String, Instant>>,
}

impl ServerState {
    pub fn new(generator: Generator) -> Arc<Self> {
        let blog = generator.blog();
        let public_dir = blog.public_dir.clone();
        let listing_ttl = Duration::from_secs(blog.config.listing.revalidate_secs);
        let post_ttl = Duration::from_secs(blog.config.post.revalidate_secs);
        let fallback = blog.config.post.fallback;

        Arc::new(Self {
            generator,
            public_dir,
            listing_ttl,
            post_ttl,
            fallback,
            pending: Mutex::new(HashSet::new()),
            missing: Mutex::new(HashMap::new()),
        })
    }

    /// Whether `key` was reported missing within the post interval
    fn known_missing(&self, key: &str) -> bool {
        let Ok(mut missing) = self.missing.lock() else {
            return false;
        };
        match missing.get(key) {
            Some(at) if at.elapsed() < self.post_ttl => true,
            Some(_) => {
                missing.remove(key);
                false
            }
            None => false,
        }
    }

    /// Remember `key` as missing, evicting expired entries and, at capacity, the oldest
    fn mark_missing(&self, key: &str) {
        let Ok(mut missing) = self.missing.lock() else {
            return;
        };
        missing.retain(|_, at| at.elapsed() < self.post_ttl);

        if missing.len() >= MAX_MISSING && !missing.contains_key(key) {
            let oldest = missing
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                missing.remove(&oldest);
            }
        }
        missing.insert(key.to_string(), Instant::now());
    }

    fn path_of(&self, page: &Page) -> PathBuf {
        match page {
            Page::Listing => self.generator.listing_path(),
            Page::Post(key) => self.generator.post_path(key),
        }
    }

    fn ttl_of(&self, page: &Page) -> Duration {
        match page {
            Page::Listing => self.listing_ttl,
            Page::Post(_) => self.post_ttl,
        }
    }
}

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    let public_dir = state.public_dir.clone();
    Router::new()
        .route("/", get(listing_handler))
        .route("/post/:key", get(post_handler))
        .route("/post/:key/", get(post_handler))
        .route("/api/posts", get(api_posts_handler))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(generator: Generator, ip: &str, port: u16) -> Result<()> {
    let state = ServerState::new(generator);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve a generated page, scheduling regeneration when it is stale
///
/// Returns `None` when the page was never generated.
async fn serve_generated(state: &Arc<ServerState>, page: Page) -> Option<Response> {
    let path = state.path_of(&page);
    let html = tokio::fs::read_to_string(&path).await.ok()?;

    let age = tokio::fs::metadata(&path)
        .await
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .unwrap_or_default();
    if age >= state.ttl_of(&page) {
        tracing::debug!("Serving stale {:?} ({}s old)", page, age.as_secs());
        schedule(state, page);
    }

    Some(Html(html).into_response())
}

/// Regenerate a page in the background, once per page at a time
fn schedule(state: &Arc<ServerState>, page: Page) {
    match state.pending.lock() {
        Ok(mut pending) => {
            if !pending.insert(page.clone()) {
                return;
            }
        }
        Err(_) => return,
    }

    let state = Arc::clone(state);
    tokio::spawn(async move {
        let result = match &page {
            Page::Listing => state.generator.write_listing().await,
            Page::Post(key) => state.generator.write_post(key).await,
        };

        match (&page, result) {
            (_, Ok(path)) => tracing::info!("Regenerated: {:?}", path),
            (Page::Post(key), Err(e))
                if matches!(e.downcast_ref::<SourceError>(), Some(SourceError::NotFound { .. })) =>
            {
                tracing::info!("Post {:?} not found", key);
                state.mark_missing(key);
            }
            (_, Err(e)) => tracing::error!("Failed to regenerate {:?}: {}", page, e),
        }

        if let Ok(mut pending) = state.pending.lock() {
            pending.remove(&page);
        }
    });
}

fn not_found(state: &ServerState) -> Response {
    match state.generator.render_not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn listing_handler(State(state): State<Arc<ServerState>>) -> Response {
    if let Some(response) = serve_generated(&state, Page::Listing).await {
        return response;
    }

    // Never generated: render it in the request, like a build would
    match state.generator.write_listing().await {
        Ok(path) => match tokio::fs::read_to_string(&path).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => internal_error(e.into()),
        },
        Err(e) => internal_error(e),
    }
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(key): Path<String>,
) -> Response {
    if !is_valid_key(&key) || state.known_missing(&key) {
        return not_found(&state);
    }

    if let Some(response) = serve_generated(&state, Page::Post(key.clone())).await {
        return response;
    }

    if !state.fallback {
        return not_found(&state);
    }

    schedule(&state, Page::Post(key));
    match state.generator.render_loading() {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
struct CursorQuery {
    cursor: Option<String>,
}

/// One page of the listing as returned to the "load more" script
#[derive(Debug, Serialize)]
struct ApiPage {
    results: Vec<PostSummaryData>,
    next_page: Option<String>,
}

async fn api_posts_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<CursorQuery>,
) -> Result<Json<ApiPage>, ApiError> {
    let cursor = query
        .cursor
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| SourceError::InvalidCursor("missing cursor".to_string()))?;

    let page = state.generator.source().fetch_next_page(&cursor).await?;
    let page = PostPage::try_from(&page)?;

    Ok(Json(ApiPage {
        results: page
            .items
            .iter()
            .map(|p| state.generator.summary_data(p))
            .collect(),
        next_page: page.next_cursor,
    }))
}

/// Source failure surfaced by the JSON endpoint
struct ApiError(SourceError);

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SourceError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
            SourceError::NotFound { .. } => StatusCode::NOT_FOUND,
            SourceError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("Load more failed: {}", self.0);
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

fn internal_error(e: anyhow::Error) -> Response {
    tracing::error!("Request failed: {}", e);
    let status = match e.downcast_ref::<SourceError>() {
        Some(SourceError::SourceUnavailable(_)) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, "Server error").into_response()
}
