//! HTTP-level tests for the server router, driven through tower::ServiceExt::oneshot
//! over the demo fixture.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt as _;

use spacetraveling::config::SiteConfig;
use spacetraveling::generator::Generator;
use spacetraveling::server::{router, ServerState};
use spacetraveling::source::MemorySource;
use spacetraveling::Blog;

const BODY_LIMIT: usize = 1024 * 1024;

fn fixture() -> MemorySource {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/posts.json");
    MemorySource::load(path).expect("load demo fixture")
}

fn test_router(dir: &Path, config: SiteConfig) -> (Router, Blog) {
    let blog = Blog::with_config(dir, config);
    let generator = Generator::new(&blog, Arc::new(fixture())).expect("generator");
    (router(ServerState::new(generator)), blog)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf8"))
}

/// Poll `uri` until `done` holds, giving background regeneration time to run
async fn poll_until(app: &Router, uri: &str, done: impl Fn(StatusCode, &str) -> bool) -> String {
    for _ in 0..100 {
        let (status, body) = get(app, uri).await;
        if done(status, &body) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} never settled", uri);
}

#[tokio::test]
async fn listing_is_generated_on_first_request() {
    let dir = tempfile::tempdir().unwrap();
    let (app, blog) = test_router(dir.path(), SiteConfig::default());

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Como utilizar Hooks"));
    assert!(body.contains("Criando um app CRA do zero"));
    assert!(!body.contains("Mapas com React usando Leaflet"));
    assert!(body.contains(r#"id="load-more""#));
    assert!(blog.public_dir.join("index.html").exists());
}

#[tokio::test]
async fn load_more_endpoint_returns_next_page() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_router(dir.path(), SiteConfig::default());

    let (status, body) = get(
        &app,
        "/api/posts?cursor=memory%3A%2F%2Fpost%3Fpage%3D2%26pageSize%3D2",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let page: Json = serde_json::from_str(&body).unwrap();
    let keys: Vec<&str> = page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["mapas-com-react-usando-leaflet", "desvendando-o-next-js"]);
    assert_eq!(page["results"][0]["path"], "/post/mapas-com-react-usando-leaflet");
    assert_eq!(page["results"][0]["date"], "02 abr 2021");
    assert_eq!(page["next_page"], "memory://post?page=3&pageSize=2");

    let (_, body) = get(
        &app,
        "/api/posts?cursor=memory%3A%2F%2Fpost%3Fpage%3D3%26pageSize%3D2",
    )
    .await;
    let page: Json = serde_json::from_str(&body).unwrap();
    assert_eq!(page["results"][0]["date"], "Não publicado");
    assert!(page["next_page"].is_null());
}

#[tokio::test]
async fn load_more_endpoint_rejects_bad_cursors() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_router(dir.path(), SiteConfig::default());

    let (status, _) = get(&app, "/api/posts").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/posts?cursor=https%3A%2F%2Fexample.com%2F").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("error"));

    // Offset past the end of u32 must not wrap around to the first page
    let (status, _) = get(
        &app,
        "/api/posts?cursor=memory%3A%2F%2Fpost%3Fpage%3D2147483649%26pageSize%3D2",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_listing_requests_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_router(dir.path(), SiteConfig::default());

    let requests: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { get(&app, "/").await })
        })
        .collect();

    for request in requests {
        let (status, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Como utilizar Hooks"));
    }
}

#[tokio::test]
async fn unknown_post_shows_loading_then_generated_page() {
    let dir = tempfile::tempdir().unwrap();
    let (app, blog) = test_router(dir.path(), SiteConfig::default());

    let (status, body) = get(&app, "/post/desvendando-o-next-js").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Carregando..."));

    let body = poll_until(&app, "/post/desvendando-o-next-js", |_, body| {
        !body.contains("Carregando...")
    })
    .await;
    assert!(body.contains("<h1>Desvendando o Next.js</h1>"));
    assert!(body.contains("1 min"));
    assert!(blog
        .public_dir
        .join("post/desvendando-o-next-js/index.html")
        .exists());
}

#[tokio::test]
async fn missing_post_becomes_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (app, blog) = test_router(dir.path(), SiteConfig::default());

    let body = poll_until(&app, "/post/nao-existe", |status, _| {
        status == StatusCode::NOT_FOUND
    })
    .await;
    assert!(body.contains("Post não encontrado"));
    assert!(!blog.public_dir.join("post/nao-existe").exists());
}

#[tokio::test]
async fn fallback_disabled_answers_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SiteConfig::default();
    config.post.fallback = false;
    let (app, _) = test_router(dir.path(), config);

    let (status, _) = get(&app, "/post/como-utilizar-hooks").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_key_answers_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_router(dir.path(), SiteConfig::default());

    let (status, _) = get(&app, "/post/Not_A_Slug").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stale_post_is_served_then_regenerated() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SiteConfig::default();
    config.post.revalidate_secs = 0;
    let (app, blog) = test_router(dir.path(), config);

    let path = blog.public_dir.join("post/como-utilizar-hooks/index.html");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "stale copy").unwrap();

    let (status, body) = get(&app, "/post/como-utilizar-hooks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "stale copy");

    let body = poll_until(&app, "/post/como-utilizar-hooks", |_, body| body != "stale copy").await;
    assert!(body.contains("<h1>Como utilizar Hooks</h1>"));
    assert!(body.contains("<strong>Lorem ipsum</strong>"));
    assert!(body.contains("<ul><li>"));
}

#[tokio::test]
async fn other_files_come_from_public_dir() {
    let dir = tempfile::tempdir().unwrap();
    let (app, blog) = test_router(dir.path(), SiteConfig::default());

    std::fs::create_dir_all(&blog.public_dir).unwrap();
    std::fs::write(blog.public_dir.join("robots.txt"), "User-agent: *\n").unwrap();

    let (status, body) = get(&app, "/robots.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "User-agent: *\n");

    let (status, _) = get(&app, "/favicon.ico").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
