//! List posts from the content source

use anyhow::Result;

use crate::content::PostSummary;
use crate::listing::{LoadMore, PostList};
use crate::Blog;

/// Print the first page of posts, or every page with `all`
pub async fn run(blog: &Blog, all: bool) -> Result<()> {
    let source = blog.source()?;
    let list = PostList::first_page(
        source.as_ref(),
        &blog.config.source.document_type,
        blog.config.listing.page_size,
    )
    .await?;

    if all {
        loop {
            match list.load_more(source.as_ref()).await? {
                LoadMore::Appended(n) => tracing::debug!("Fetched {} more posts", n),
                LoadMore::Exhausted | LoadMore::InFlight => break,
            }
        }
    }

    let more = list.has_more().await;
    let posts = list.posts().await;

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("  {}", describe(post));
    }
    if more {
        println!("  ... more available, use --all to list every post");
    }

    Ok(())
}

fn describe(post: &PostSummary) -> String {
    let date = post
        .published_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    format!("{} - {} [{}]", date, post.title, post.key)
}
