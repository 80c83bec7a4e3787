//! Readable-text extraction from HTML documents.

use dom_smoothie::{Article, Config, Readability, TextMode};

use crate::engine::types::{EngineError, EngineResult};

/// Readable content pulled out of an HTML page.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Document title, empty when the page has none.
    pub title: String,
    /// Main body text as Markdown.
    pub text: String,
}

/// Reduce an HTML document to its readable article text.
///
/// Boilerplate (navigation, headers, scripts) is stripped; the body is
/// returned as Markdown.
pub fn extract_html_text(html: &str) -> EngineResult<ExtractedDocument> {
    let config = Config {
        text_mode: TextMode::Markdown,
        ..Default::default()
    };

    let mut readability = Readability::new(html, None, Some(config))
        .map_err(|e| EngineError::UnreadableDocument(e.to_string()))?;
    let article: Article = readability
        .parse()
        .map_err(|e| EngineError::UnreadableDocument(e.to_string()))?;

    Ok(ExtractedDocument {
        title: article.title,
        text: article.text_content.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> String {
        let paragraphs: String = (0..8)
            .map(|i| {
                format!(
                    "<p>Discussion item {i}: the recording covers planning for the \
                     next quarter, including hiring targets, the migration of the \
                     storage layer, and how the transcription rollout will be staged \
                     across the remaining teams in the organisation.</p>"
                )
            })
            .collect();
        format!(
            "<!DOCTYPE html><html><head><title>Quarterly planning notes</title></head>\
             <body><nav><a href=\"/\">home</a></nav><article><h1>Quarterly planning \
             notes</h1>{paragraphs}</article></body></html>"
        )
    }

    #[test]
    fn extracts_title_and_body() {
        let doc = extract_html_text(&sample_page()).unwrap();
        assert_eq!(doc.title, "Quarterly planning notes");
        assert!(doc.text.contains("transcription rollout"));
        assert!(!doc.text.contains("href"));
    }
}
