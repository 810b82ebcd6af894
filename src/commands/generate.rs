//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Blog;

/// Render the listing and the pre-rendered posts into the public directory
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog, blog.source()?)?;
    let report = generator.generate().await?;

    tracing::info!(
        "Generated listing and {} posts into {:?}",
        report.posts.len(),
        blog.public_dir
    );

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}
