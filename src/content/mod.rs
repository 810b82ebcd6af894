//! Content module - post models, rich text and reading time

mod post;
pub mod reading;
mod richtext;

pub use post::{PostDetail, PostPage, PostSummary, Section};
pub use richtext::{Block, RichText, Span};
