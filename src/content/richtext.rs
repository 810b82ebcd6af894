//! Structured rich text as delivered by the content API
//!
//! A rich-text field is an array of blocks. Text blocks carry inline spans
//! whose offsets count UTF-16 code units, as the API produces them.

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};

/// A rich-text field value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<Block>);

/// One block of rich text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Image source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Image alternative text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Embed>,
}

/// Inline markup over `[start, end)` of a block's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

/// Hyperlink target or label name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    /// Label name
    #[serde(default)]
    pub label: Option<String>,
}

/// Embedded media
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

impl RichText {
    /// Plain text of all blocks joined by a single space
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .filter(|b| b.is_text())
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render to HTML; consecutive list items share one list element
    pub fn as_html(&self) -> String {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;

        for block in &self.0 {
            let list = match block.kind.as_str() {
                "list-item" => Some("ul"),
                "o-list-item" => Some("ol"),
                _ => None,
            };

            if open_list != list {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list {
                    html.push_str(&format!("<{}>", tag));
                }
                open_list = list;
            }

            block.push_html(&mut html);
        }

        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }

        html
    }
}

impl Block {
    fn is_text(&self) -> bool {
        !matches!(self.kind.as_str(), "image" | "embed")
    }

    fn push_html(&self, html: &mut String) {
        match self.kind.as_str() {
            "paragraph" => wrap(html, "p", &self.inline_html()),
            "preformatted" => wrap(html, "pre", &self.inline_html()),
            "list-item" | "o-list-item" => wrap(html, "li", &self.inline_html()),
            "heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6" => {
                let tag = format!("h{}", &self.kind["heading".len()..]);
                wrap(html, &tag, &self.inline_html());
            }
            "image" => {
                let src = self.url.as_deref().unwrap_or_default();
                let alt = self.alt.as_deref().unwrap_or_default();
                html.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    encode_double_quoted_attribute(src),
                    encode_double_quoted_attribute(alt)
                ));
            }
            "embed" => {
                let embed = self.oembed.clone().unwrap_or_default();
                html.push_str(&format!(
                    r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
                    encode_double_quoted_attribute(embed.embed_url.as_deref().unwrap_or_default()),
                    encode_double_quoted_attribute(embed.kind.as_deref().unwrap_or_default()),
                    encode_double_quoted_attribute(
                        embed.provider_name.as_deref().unwrap_or_default()
                    ),
                    // oEmbed markup comes from the content backend and is trusted
                    embed.html.as_deref().unwrap_or_default()
                ));
            }
            other => {
                tracing::debug!("Rendering unknown block type {:?} as paragraph", other);
                wrap(html, "p", &self.inline_html());
            }
        }
    }

    /// Text with spans applied; newlines become `<br />`
    fn inline_html(&self) -> String {
        let offsets = utf16_boundaries(&self.text);
        let len = offsets.len() - 1;

        let spans: Vec<&Span> = self
            .spans
            .iter()
            .filter(|s| s.start < s.end && s.end <= len)
            .collect();

        let mut cuts: Vec<usize> = vec![0, len];
        for span in &spans {
            cuts.push(span.start);
            cuts.push(span.end);
        }
        cuts.sort_unstable();
        cuts.dedup();

        let mut out = String::new();
        let mut stack: Vec<&Span> = Vec::new();

        for pair in cuts.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let active = |s: &Span| s.start <= a && s.end >= b;

            // Close from the first inactive span up, then reopen what is still active
            if let Some(first_closed) = stack.iter().position(|s| !active(*s)) {
                let reopened: Vec<&Span> = stack[first_closed..]
                    .iter()
                    .copied()
                    .filter(|s| active(*s))
                    .collect();
                for span in stack.drain(first_closed..).rev() {
                    out.push_str(&close_tag(span));
                }
                for span in reopened {
                    out.push_str(&open_tag(span));
                    stack.push(span);
                }
            }

            let mut opening: Vec<&Span> = spans
                .iter()
                .copied()
                .filter(|s| active(*s) && !stack.iter().any(|o| std::ptr::eq(*o, *s)))
                .collect();
            opening.sort_by(|x, y| x.start.cmp(&y.start).then(y.end.cmp(&x.end)));
            for span in opening {
                out.push_str(&open_tag(span));
                stack.push(span);
            }

            let segment = &self.text[offsets[a]..offsets[b]];
            out.push_str(&encode_text(segment).replace('\n', "<br />"));
        }

        for span in stack.into_iter().rev() {
            out.push_str(&close_tag(span));
        }

        out
    }
}

fn wrap(html: &mut String, tag: &str, inner: &str) {
    html.push_str(&format!("<{tag}>{inner}</{tag}>"));
}

fn open_tag(span: &Span) -> String {
    let data = span.data.clone().unwrap_or_default();
    match span.kind.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "hyperlink" => {
            let href = encode_double_quoted_attribute(data.url.as_deref().unwrap_or("#")).into_owned();
            match data.target.as_deref() {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener noreferrer">"#,
                    href,
                    encode_double_quoted_attribute(target)
                ),
                None => format!(r#"<a href="{}">"#, href),
            }
        }
        "label" => format!(
            r#"<span class="{}">"#,
            encode_double_quoted_attribute(data.label.as_deref().unwrap_or_default())
        ),
        _ => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "</span>",
    }
}

/// Byte offset of every UTF-16 position, plus one past the end
///
/// Positions falling inside a surrogate pair map to the start of the character.
fn utf16_boundaries(text: &str) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(text.len() + 1);
    for (byte, c) in text.char_indices() {
        for _ in 0..c.len_utf16() {
            offsets.push(byte);
        }
    }
    offsets.push(text.len());
    offsets
}
