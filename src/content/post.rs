//! Post models mapped from content API documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading::{count_words, reading_minutes};
use super::RichText;
use crate::error::{SourceError, SourceResult};
use crate::helpers::parse_optional_timestamp;
use crate::source::{Document, DocumentPage};

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Unique key (slug)
    pub key: String,

    /// First publication date, absent for unpublished documents
    pub published_at: Option<DateTime<Utc>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// One page of the listing
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostPage {
    pub items: Vec<PostSummary>,

    /// Opaque cursor of the following page, `None` on the last one
    pub next_cursor: Option<String>,
}

/// A full post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub key: String,
    pub published_at: Option<DateTime<Utc>>,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub sections: Vec<Section>,
}

/// A titled section of a post body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: RichText,
}

impl PostDetail {
    /// Words across all section bodies
    pub fn word_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| count_words(&s.body.as_text()))
            .sum()
    }

    /// Estimated reading time in minutes
    pub fn reading_minutes(&self, words_per_minute: usize) -> usize {
        reading_minutes(self.word_count(), words_per_minute)
    }
}

/// A text field: plain key text, or a rich-text title
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TextField {
    Plain(String),
    Rich(RichText),
}

/// Empty fields arrive as `null`
fn text(field: Option<TextField>) -> String {
    match field {
        Some(TextField::Plain(s)) => s,
        Some(TextField::Rich(rt)) => rt.as_text(),
        None => String::new(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostFields {
    title: Option<TextField>,
    subtitle: Option<TextField>,
    author: Option<TextField>,
    banner: Option<Banner>,
    content: Option<Vec<SectionFields>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Banner {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SectionFields {
    heading: Option<TextField>,
    body: Option<RichText>,
}

fn post_fields(doc: &Document) -> SourceResult<PostFields> {
    if doc.data.is_null() {
        return Ok(PostFields::default());
    }
    serde_json::from_value(doc.data.clone())
        .map_err(|e| SourceError::MalformedResponse(format!("document {}: {}", doc.id, e)))
}

impl TryFrom<&Document> for PostSummary {
    type Error = SourceError;

    fn try_from(doc: &Document) -> SourceResult<Self> {
        let fields = post_fields(doc)?;
        Ok(Self {
            key: doc.key().to_string(),
            published_at: parse_optional_timestamp(doc.first_publication_date.as_deref())?,
            title: text(fields.title),
            subtitle: text(fields.subtitle),
            author: text(fields.author),
        })
    }
}

impl TryFrom<&Document> for PostDetail {
    type Error = SourceError;

    fn try_from(doc: &Document) -> SourceResult<Self> {
        let fields = post_fields(doc)?;
        Ok(Self {
            key: doc.key().to_string(),
            published_at: parse_optional_timestamp(doc.first_publication_date.as_deref())?,
            title: text(fields.title),
            banner_url: fields.banner.and_then(|b| b.url).unwrap_or_default(),
            author: text(fields.author),
            sections: fields
                .content
                .unwrap_or_default()
                .into_iter()
                .map(|s| Section {
                    heading: text(s.heading),
                    body: s.body.unwrap_or_default(),
                })
                .collect(),
        })
    }
}

impl TryFrom<&DocumentPage> for PostPage {
    type Error = SourceError;

    fn try_from(page: &DocumentPage) -> SourceResult<Self> {
        let items = page
            .results
            .iter()
            .map(PostSummary::try_from)
            .collect::<SourceResult<Vec<_>>>()?;
        let next_cursor = page.next_page.clone().filter(|c| !c.trim().is_empty());
        Ok(Self { items, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(json: serde_json::Value) -> Document {
        serde_json::from_value(json).unwrap()
    }

    fn words(n: usize) -> String {
        vec!["palavra"; n].join(" ")
    }

    #[test]
    fn test_summary_from_document() {
        let doc = document(serde_json::json!({
            "id": "YFk1",
            "uid": "como-utilizar-hooks",
            "type": "post",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                "author": "Joseph Oliveira",
                "banner": {}
            }
        }));
        let summary = PostSummary::try_from(&doc).unwrap();
        assert_eq!(summary.key, "como-utilizar-hooks");
        assert_eq!(summary.author, "Joseph Oliveira");
        assert!(summary.published_at.is_some());
    }

    #[test]
    fn test_rich_title_is_flattened() {
        let doc = document(serde_json::json!({
            "id": "1",
            "type": "post",
            "data": {"title": [{"type": "heading1", "text": "Rich title", "spans": []}]}
        }));
        let summary = PostSummary::try_from(&doc).unwrap();
        assert_eq!(summary.title, "Rich title");
        assert_eq!(summary.published_at, None);
    }

    #[test]
    fn test_bad_timestamp_is_invalid_date() {
        let doc = document(serde_json::json!({
            "id": "1",
            "type": "post",
            "first_publication_date": "someday",
            "data": {}
        }));
        assert!(matches!(
            PostSummary::try_from(&doc),
            Err(SourceError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_detail_reading_time_counts_all_sections() {
        let doc = document(serde_json::json!({
            "id": "1",
            "uid": "long-post",
            "type": "post",
            "data": {
                "title": "Long",
                "banner": {"url": "https://images.prismic.io/banner.png"},
                "author": "Danilo",
                "content": [
                    {"heading": "One", "body": [{"type": "paragraph", "text": words(150), "spans": []}]},
                    {"heading": "Two", "body": [{"type": "paragraph", "text": words(51), "spans": []}]}
                ]
            }
        }));
        let detail = PostDetail::try_from(&doc).unwrap();
        assert_eq!(detail.sections.len(), 2);
        assert_eq!(detail.banner_url, "https://images.prismic.io/banner.png");
        assert_eq!(detail.word_count(), 201);
        assert_eq!(detail.reading_minutes(200), 2);
    }

    #[test]
    fn test_empty_cursor_ends_pagination() {
        let page = DocumentPage {
            results: vec![],
            next_page: Some(String::new()),
            page: 1,
            total_pages: 1,
            total_results_size: 0,
        };
        assert_eq!(PostPage::try_from(&page).unwrap().next_cursor, None);
    }

    #[test]
    fn test_malformed_fields() {
        let doc = document(serde_json::json!({
            "id": "1",
            "type": "post",
            "data": {"content": "not a list"}
        }));
        assert!(matches!(
            PostDetail::try_from(&doc),
            Err(SourceError::MalformedResponse(_))
        ));
    }
}
