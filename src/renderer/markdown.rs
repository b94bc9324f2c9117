//! In-process markdown conversion.

use async_trait::async_trait;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

use super::{RenderError, TextRenderer};

/// URL schemes allowed in link and image destinations.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Converts markdown to HTML with `pulldown-cmark`.
///
/// Raw HTML in the source is emitted as escaped text, and link or image
/// destinations with a scheme other than http, https or mailto are blanked, so the
/// output is safe to inject without further sanitization.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::commonmark()
    }
}

impl MarkdownRenderer {
    /// Plain `CommonMark`, no extensions.
    pub fn commonmark() -> Self {
        Self {
            options: Options::empty(),
        }
    }

    /// `CommonMark` plus tables, strikethrough, task lists and footnotes.
    pub fn gfm() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        Self { options }
    }

    /// Render `text` synchronously.
    pub fn render(&self, text: &str) -> String {
        let parser = Parser::new_ext(text, self.options).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: safe_destination(dest_url),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Image {
                link_type,
                dest_url: safe_destination(dest_url),
                title,
                id,
            }),
            other => other,
        });

        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Keep relative and allowlisted destinations, blank everything else.
fn safe_destination(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_destination(&url) {
        url
    } else {
        CowStr::Borrowed("")
    }
}

fn is_safe_destination(url: &str) -> bool {
    // Browsers drop whitespace and control characters before reading the scheme.
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();

    match cleaned.find([':', '/', '?', '#']) {
        Some(i) if cleaned.as_bytes()[i] == b':' => SAFE_SCHEMES
            .iter()
            .any(|scheme| cleaned[..i].eq_ignore_ascii_case(scheme)),
        _ => true,
    }
}

#[async_trait]
impl TextRenderer for MarkdownRenderer {
    async fn convert_markdown_to_html(&self, text: &str) -> Result<String, RenderError> {
        Ok(self.render(text))
    }
}
