//! spacetraveling: a blog front-end over the Prismic content API
//!
//! Posts are fetched through a [`source::ContentSource`], rendered with the
//! embedded Tera theme, and served with incremental regeneration and a
//! "load more" endpoint for the paginated listing.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod listing;
pub mod server;
pub mod source;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog from a directory, reading `_config.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a Blog from an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, mut config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);

        if let Some(fixture) = config.source.fixture.as_mut() {
            if fixture.is_relative() {
                *fixture = base_dir.join(&*fixture);
            }
        }

        Self {
            config,
            base_dir,
            public_dir,
        }
    }

    /// The configured content source
    pub fn source(&self) -> Result<Arc<dyn source::ContentSource>> {
        source::from_config(&self.config.source)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.config.title, "spacetraveling");
        assert_eq!(blog.public_dir, dir.path().join("public"));
    }

    #[test]
    fn test_fixture_resolved_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("_config.yml"),
            "public_dir: out\nsource:\n  fixture: posts.json\n",
        )
        .unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.public_dir, dir.path().join("out"));
        assert_eq!(
            blog.config.source.fixture,
            Some(dir.path().join("posts.json"))
        );
    }
}
