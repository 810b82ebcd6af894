//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Date format (Moment.js tokens)
    pub date_format: String,

    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub post: PostConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: "UTC".to_string(),

            url: "http://localhost:3000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            date_format: "DD MMM YYYY".to_string(),

            listing: ListingConfig::default(),
            post: PostConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parsed time zone, UTC when unset or unknown
    pub fn tz(&self) -> chrono_tz::Tz {
        if self.timezone.is_empty() {
            return chrono_tz::UTC;
        }
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
            chrono_tz::UTC
        })
    }
}

/// Home page listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: u32,
    pub revalidate_secs: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 2,
            revalidate_secs: 60 * 30,
        }
    }
}

/// Post detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    pub revalidate_secs: u64,
    /// Number of posts rendered ahead of any request
    pub prerender_limit: u32,
    /// Generate unknown keys on first request
    pub fallback: bool,
    pub words_per_minute: usize,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            revalidate_secs: 60 * 60 * 24,
            prerender_limit: 5,
            fallback: true,
            words_per_minute: 200,
        }
    }
}

/// Content API connection
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
    pub document_type: String,
    pub timeout_secs: u64,
    /// JSON file of documents used instead of the remote API
    pub fixture: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_token: None,
            document_type: "post".to_string(),
            timeout_secs: 10,
            fixture: None,
        }
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("document_type", &self.document_type)
            .field("timeout_secs", &self.timeout_secs)
            .field("fixture", &self.fixture)
            .finish()
    }
}
