//! Generator module - renders the listing and post pages with the built-in templates

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tera::Context;

use crate::content::{PostDetail, PostSummary};
use crate::error::SourceError;
use crate::helpers::{
    date_xml, format_published, full_url_for, is_valid_key, post_url, posts_api_url, url_for,
};
use crate::i18n::Locale;
use crate::listing::PostList;
use crate::source::ContentSource;
use crate::templates::{ConfigData, PostSummaryData, PostViewData, SectionData, TemplateRenderer};
use crate::Blog;

/// Seconds before the loading placeholder reloads itself
const LOADING_REFRESH_SECS: u32 = 2;

/// Static page generator
pub struct Generator {
    blog: Blog,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    locale: Locale,
    tz: chrono_tz::Tz,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            source,
            renderer: TemplateRenderer::new()?,
            locale: Locale::from_tag(&blog.config.language),
            tz: blog.config.tz(),
        })
    }

    pub fn blog(&self) -> &Blog {
        &self.blog
    }

    pub fn source(&self) -> &Arc<dyn ContentSource> {
        &self.source
    }

    /// Generate the listing and the pre-rendered post pages
    pub async fn generate(&self) -> Result<GenerateReport> {
        tokio::fs::create_dir_all(&self.blog.public_dir).await?;

        self.write_listing().await?;

        let keys = self.static_keys().await?;
        for key in &keys {
            self.write_post(key).await?;
        }

        Ok(GenerateReport { posts: keys })
    }

    /// Keys rendered ahead of any request
    pub async fn static_keys(&self) -> Result<Vec<String>> {
        let page = self
            .source
            .fetch_page(
                &self.blog.config.source.document_type,
                self.blog.config.post.prerender_limit,
            )
            .await?;

        let keys = page
            .results
            .iter()
            .map(|d| d.key().to_string())
            .filter(|k| {
                let valid = is_valid_key(k);
                if !valid {
                    tracing::warn!("Skipping post with unusable key {:?}", k);
                }
                valid
            })
            .collect();
        Ok(keys)
    }

    /// Render the listing from the first page of posts
    pub async fn render_listing(&self) -> Result<String> {
        let list = PostList::first_page(
            self.source.as_ref(),
            &self.blog.config.source.document_type,
            self.blog.config.listing.page_size,
        )
        .await?;
        let (posts, next_page) = list.into_parts();

        let posts: Vec<PostSummaryData> = posts.iter().map(|p| self.summary_data(p)).collect();

        let mut context = self.base_context();
        context.insert("posts", &posts);
        context.insert("next_page", &next_page);
        context.insert("api_path", &posts_api_url(&self.blog.config));
        context.insert("canonical", &full_url_for(&self.blog.config, ""));
        self.renderer.render("index.html", &context)
    }

    /// Render one post page
    pub async fn render_post(&self, key: &str) -> Result<String> {
        let document_type = &self.blog.config.source.document_type;
        if !is_valid_key(key) {
            return Err(SourceError::not_found(document_type, key).into());
        }

        let document = self.source.fetch_by_key(document_type, key).await?;
        let post = PostDetail::try_from(&document)?;

        let mut context = self.base_context();
        context.insert("post", &self.post_view(&post));
        context.insert(
            "canonical",
            &full_url_for(&self.blog.config, &format!("post/{}", post.key)),
        );
        self.renderer.render("post.html", &context)
    }

    /// Placeholder shown while a post is generated; performs no data access
    pub fn render_loading(&self) -> Result<String> {
        let mut context = self.base_context();
        context.insert("refresh_secs", &LOADING_REFRESH_SECS);
        self.renderer.render("loading.html", &context)
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.renderer.render("not_found.html", &self.base_context())
    }

    /// Render and write `index.html`
    pub async fn write_listing(&self) -> Result<PathBuf> {
        let html = self.render_listing().await?;
        let path = self.listing_path();
        write_page(&path, &html).await?;
        tracing::debug!("Generated: {:?}", path);
        Ok(path)
    }

    /// Render and write `post/{key}/index.html`
    pub async fn write_post(&self, key: &str) -> Result<PathBuf> {
        let html = self.render_post(key).await?;
        let path = self.post_path(key);
        write_page(&path, &html).await?;
        tracing::debug!("Generated: {:?}", path);
        Ok(path)
    }

    pub fn listing_path(&self) -> PathBuf {
        self.blog.public_dir.join("index.html")
    }

    pub fn post_path(&self, key: &str) -> PathBuf {
        self.blog
            .public_dir
            .join("post")
            .join(key)
            .join("index.html")
    }

    /// View of a listing entry
    pub fn summary_data(&self, post: &PostSummary) -> PostSummaryData {
        let (date, datetime) = self.published(post.published_at.as_ref());
        PostSummaryData {
            key: post.key.clone(),
            path: post_url(&self.blog.config, &post.key),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date,
            datetime,
        }
    }

    /// View of a full post
    pub fn post_view(&self, post: &PostDetail) -> PostViewData {
        let (date, datetime) = self.published(post.published_at.as_ref());
        PostViewData {
            key: post.key.clone(),
            title: post.title.clone(),
            banner_url: post.banner_url.clone(),
            author: post.author.clone(),
            date,
            datetime,
            reading_minutes: post.reading_minutes(self.blog.config.post.words_per_minute),
            sections: post
                .sections
                .iter()
                .map(|s| SectionData {
                    heading: s.heading.clone(),
                    html: s.body.as_html(),
                })
                .collect(),
        }
    }

    /// Display and machine-readable dates; unpublished posts get the placeholder
    fn published(&self, date: Option<&chrono::DateTime<chrono::Utc>>) -> (String, Option<String>) {
        match format_published(date, &self.tz, &self.blog.config.date_format, self.locale) {
            Ok(display) => (display, date.map(|d| date_xml(&d.with_timezone(&self.tz)))),
            Err(_) => (self.locale.messages().unpublished.to_string(), None),
        }
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert(
            "config",
            &ConfigData {
                title: self.blog.config.title.clone(),
                description: self.blog.config.description.clone(),
                root: url_for(&self.blog.config, ""),
                lang: self.locale.tag().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        );
        context.insert("i18n", &self.locale.messages());
        context
    }
}

/// Pages written by a full generation
#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    pub posts: Vec<String>,
}

/// Write a page through a temporary file so readers never see a partial page
///
/// Each call gets its own temporary file, so concurrent writers of the same
/// page do not clobber each other; the last rename wins.
async fn write_page(path: &Path, html: &str) -> Result<()> {
    let path = path.to_path_buf();
    let html = html.to_string();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("no parent directory for {:?}", path))?;
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(html.as_bytes())?;
        tmp.persist(&path)?;
        Ok(())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Document, MemorySource};

    fn document(uid: &str, published: Option<&str>) -> Document {
        serde_json::from_value(serde_json::json!({
            "id": uid.to_uppercase(),
            "uid": uid,
            "type": "post",
            "first_publication_date": published,
            "data": {
                "title": format!("Title {}", uid),
                "subtitle": "Subtitle",
                "author": "Joseph Oliveira",
                "banner": {"url": "https://images.prismic.io/banner.png"},
                "content": [{
                    "heading": "Proin et varius",
                    "body": [{"type": "paragraph", "text": "Lorem ipsum dolor sit amet", "spans": [
                        {"start": 0, "end": 5, "type": "strong"}
                    ]}]
                }]
            }
        }))
        .unwrap()
    }

    fn generator(dir: &Path, n: usize) -> Generator {
        let blog = Blog::with_config(dir, crate::config::SiteConfig::default());
        let docs = (1..=n)
            .map(|i| document(&format!("post-{}", i), Some("2021-03-15T00:00:00Z")))
            .chain(std::iter::once(document("draft", None)))
            .collect();
        Generator::new(&blog, Arc::new(MemorySource::new(docs))).unwrap()
    }

    #[tokio::test]
    async fn test_listing_shows_first_page_and_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(dir.path(), 3);
        let html = gen.render_listing().await.unwrap();

        assert!(html.contains("Title post-1"));
        assert!(html.contains("Title post-2"));
        assert!(!html.contains("Title post-3"));
        assert!(html.contains("15 mar 2021"));
        assert!(html.contains(r#"href="/post/post-1""#));
        assert!(html.contains(r#"data-next-page="memory://post?page=2&amp;pageSize=2""#));
        assert!(html.contains("Carregar mais posts"));
    }

    #[tokio::test]
    async fn test_single_page_listing_hides_button() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::with_config(dir.path(), crate::config::SiteConfig::default());
        let source = MemorySource::new(vec![document("only", Some("2021-03-15T00:00:00Z"))]);
        let gen = Generator::new(&blog, Arc::new(source)).unwrap();
        let html = gen.render_listing().await.unwrap();
        assert!(!html.contains(r#"id="load-more""#));
    }

    #[tokio::test]
    async fn test_post_page() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(dir.path(), 1);
        let html = gen.render_post("post-1").await.unwrap();

        assert!(html.contains("<h1>Title post-1</h1>"));
        assert!(html.contains("<h2>Proin et varius</h2>"));
        assert!(html.contains("<p><strong>Lorem</strong> ipsum dolor sit amet</p>"));
        assert!(html.contains("1 min"));
        assert!(html.contains(r#"datetime="2021-03-15T00:00:00+00:00""#));
        assert!(html.contains("https://images.prismic.io/banner.png"));
        assert!(html.contains(r#"<link rel="canonical" href="http://localhost:3000/post/post-1">"#));
    }

    #[tokio::test]
    async fn test_unpublished_post_uses_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(dir.path(), 1);
        let html = gen.render_post("draft").await.unwrap();
        assert!(html.contains("Não publicado"));
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(dir.path(), 1);

        let err = gen.write_post("missing").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::NotFound { .. })
        ));
        assert!(!gen.post_path("missing").exists());

        let err = gen.render_post("../etc").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_writes_prerendered_posts() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(dir.path(), 7);
        let report = gen.generate().await.unwrap();

        // prerender_limit defaults to 5
        assert_eq!(report.posts.len(), 5);
        assert!(gen.listing_path().exists());
        assert!(gen.post_path("post-5").exists());
        assert!(!gen.post_path("post-6").exists());
    }

    #[test]
    fn test_loading_page_needs_no_source() {
        let dir = tempfile::tempdir().unwrap();
        let gen = generator(dir.path(), 0);
        assert!(gen.render_loading().unwrap().contains("Carregando..."));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_of_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let gen = Arc::new(generator(dir.path(), 3));

        for _ in 0..10 {
            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let gen = Arc::clone(&gen);
                    tokio::spawn(async move { gen.write_listing().await })
                })
                .collect();
            for task in tasks {
                task.await.unwrap().unwrap();
            }
        }

        let html = std::fs::read_to_string(gen.listing_path()).unwrap();
        assert!(html.contains("Title post-1"));

        // No temporary files left behind
        let leftovers: Vec<_> = std::fs::read_dir(&gen.blog().public_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name != "index.html")
            .collect();
        assert!(leftovers.is_empty(), "{:?}", leftovers);
    }
}
