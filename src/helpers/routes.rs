//! Route and URL helper functions

use crate::config::SiteConfig;

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/hello") // -> "/blog/post/hello"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Route of a post detail page
pub fn post_url(config: &SiteConfig, key: &str) -> String {
    url_for(config, &format!("post/{}", key))
}

/// Route of the "load more" endpoint
pub fn posts_api_url(config: &SiteConfig) -> String {
    url_for(config, "api/posts")
}

/// Whether a post key is safe to use as a route segment and output directory
///
/// Keys are the content API's uids, which are slugs.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && slug::slugify(key) == key
}
