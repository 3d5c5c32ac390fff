use tracing::info;

use crate::normalize::{normalize_text, strip_spaces};
use crate::platform::EmbedView;

/// A configured keyword with its precomputed match forms
#[derive(Debug, Clone)]
struct Keyword {
    raw: String,
    normalized: String,
    no_space: String,
}

/// Keyword filter applied to message text and embed fields.
///
/// An empty keyword list means every message passes.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<Keyword>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter_map(|raw: String| {
                let normalized = normalize_text(&raw);
                if normalized.is_empty() {
                    return None;
                }
                let no_space = strip_spaces(&normalized);
                Some(Keyword {
                    raw,
                    normalized,
                    no_space,
                })
            })
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Configured keywords, as written
    pub fn keywords(&self) -> Vec<&str> {
        self.keywords.iter().map(|k| k.raw.as_str()).collect()
    }

    /// First keyword found in the text or embeds, compared with and without spaces
    pub fn find_match(&self, content: Option<&str>, embeds: &[EmbedView]) -> Option<&str> {
        let haystack = normalize_text(&build_haystack(content, embeds));
        let haystack_no_space = strip_spaces(&haystack);

        self.keywords
            .iter()
            .find(|k| haystack.contains(&k.normalized) || haystack_no_space.contains(&k.no_space))
            .map(|k| k.raw.as_str())
    }

    pub fn should_forward(&self, content: Option<&str>, embeds: &[EmbedView]) -> bool {
        if self.is_empty() {
            return true;
        }

        match self.find_match(content, embeds) {
            Some(keyword) => {
                info!(keyword, "Keyword hit");
                true
            }
            None => {
                info!(keywords = ?self.keywords(), "No keyword hit");
                false
            }
        }
    }
}

/// Join message text with embed titles, descriptions and author names
pub fn build_haystack(content: Option<&str>, embeds: &[EmbedView]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(text) = content {
        parts.push(text);
    }
    for embed in embeds {
        for field in [&embed.title, &embed.description, &embed.author_name] {
            if let Some(v) = field.as_deref() {
                parts.push(v);
            }
        }
    }
    parts.retain(|p| !p.is_empty());
    parts.join("\n")
}
