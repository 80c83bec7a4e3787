//! Transcript data: scraped rows, assembled fragments, the final record.

use serde::{Deserialize, Serialize};

/// One caption row lifted from a transcript page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRow {
    pub index: usize,
    /// Timestamp label as shown on the page (never reparsed).
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub speaker: String,
    pub text: String,
}

/// The JSON artifact one scraping session writes: the link's display name,
/// its normalized URL and every collected row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedTranscript {
    pub name: String,
    pub url: String,
    pub rows: Vec<TranscriptRow>,
}

impl ScrapedTranscript {
    /// Row texts joined line by line, in row order. Empty rows are dropped;
    /// speakers and timestamps stay in the JSON only.
    pub fn rows_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One assembled piece of a transcript, ordered by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub index: usize,
    pub language: String,
    pub text: String,
}

impl Fragment {
    pub fn new(index: usize, language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            language: language.into(),
            text: text.into(),
        }
    }
}

/// The final per-logical-name transcript, written whole or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub logical_name: String,
    /// Fragments in ascending index order.
    pub fragments: Vec<Fragment>,
}

impl TranscriptRecord {
    pub fn new(logical_name: impl Into<String>, fragments: Vec<Fragment>) -> Self {
        Self {
            logical_name: logical_name.into(),
            fragments,
        }
    }

    /// Render the markdown body: a heading, then each fragment in order,
    /// optionally prefixed with its language tag.
    pub fn render(&self, tag_language: bool) -> String {
        let mut out = format!("# {}\n", self.logical_name);
        for fragment in &self.fragments {
            out.push('\n');
            if tag_language && !fragment.language.is_empty() {
                out.push_str(&format!("[{}] ", fragment.language));
            }
            out.push_str(fragment.text.trim_end());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scraped_transcript_serializes_expected_fields() {
        let scraped = ScrapedTranscript {
            name: "Weekly_Review".into(),
            url: "https://example.org/v".into(),
            rows: vec![TranscriptRow {
                index: 0,
                timestamp: "00:01".into(),
                speaker: "Ana".into(),
                text: "Hello".into(),
            }],
        };
        let json = serde_json::to_string(&scraped).unwrap();
        assert!(json.contains("\"name\":\"Weekly_Review\""));
        assert!(json.contains("\"rows\":[{"));
        assert!(json.contains("\"timestamp\":\"00:01\""));
    }

    #[test]
    fn rows_text_joins_trimmed_nonempty_texts() {
        let scraped = ScrapedTranscript {
            name: "n".into(),
            url: "u".into(),
            rows: vec![
                TranscriptRow {
                    index: 0,
                    timestamp: String::new(),
                    speaker: "Ana".into(),
                    text: "first ".into(),
                },
                TranscriptRow {
                    index: 1,
                    timestamp: String::new(),
                    speaker: String::new(),
                    text: "   ".into(),
                },
                TranscriptRow {
                    index: 2,
                    timestamp: String::new(),
                    speaker: String::new(),
                    text: "second".into(),
                },
            ],
        };
        assert_eq!(scraped.rows_text(), "first\nsecond");
    }

    #[test]
    fn record_renders_fragments_in_order() {
        let record = TranscriptRecord::new(
            "clip",
            vec![
                Fragment::new(0, "en", "part one"),
                Fragment::new(1, "en", "part two"),
            ],
        );
        let md = record.render(false);
        assert!(md.starts_with("# clip\n"));
        let one = md.find("part one").unwrap();
        let two = md.find("part two").unwrap();
        assert!(one < two);
    }

    #[test]
    fn record_renders_language_tags_when_asked() {
        let record = TranscriptRecord::new("clip", vec![Fragment::new(0, "de", "hallo")]);
        assert!(record.render(true).contains("[de] hallo"));
        assert!(!record.render(false).contains("[de]"));
    }
}
