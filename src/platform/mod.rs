pub mod discord;

/// A message received from the chat gateway, detached from the client library
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    /// Display tag of the author (`name` or `name#1234`)
    pub author_name: String,
    pub content: Option<String>,
    pub embeds: Vec<EmbedView>,
    pub attachments: Vec<AttachmentView>,
}

impl IncomingMessage {
    /// Message text, treating an empty string as absent
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|t| !t.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_none() && self.embeds.is_empty() && self.attachments.is_empty()
    }
}

/// Rich embed fields the relay reads
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(dead_code)]
pub struct EmbedView {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub author_name: Option<String>,
}

impl EmbedView {
    /// True when the gateway delivered the embed without any text yet
    pub fn is_blank(&self) -> bool {
        [&self.title, &self.description, &self.author_name]
            .iter()
            .all(|f| f.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentView {
    pub url: String,
    pub filename: String,
}
