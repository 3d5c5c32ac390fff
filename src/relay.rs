use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::filter::KeywordFilter;
use crate::platform::IncomingMessage;
use crate::slack::SlackForwarder;

/// Text that must appear on the first line of a forwarded message
pub const TWEET_MARKER: &str = "Tweeted";

/// Re-reads a message from the chat platform
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn refetch(&self, msg: &IncomingMessage) -> Result<IncomingMessage>;
}

/// Outcome of evaluating one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    OwnMessage,
    OtherChannel,
    Empty,
    NoKeywordHit,
    MissingMarker { first_line: String },
    Forward,
}

/// Decides which gateway messages reach Slack
pub struct Relay {
    filter: Arc<KeywordFilter>,
    target_channel_id: Option<u64>,
    forwarder: Arc<SlackForwarder>,
}

impl Relay {
    pub fn new(
        filter: Arc<KeywordFilter>,
        target_channel_id: Option<u64>,
        forwarder: Arc<SlackForwarder>,
    ) -> Self {
        Self {
            filter,
            target_channel_id,
            forwarder,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(KeywordFilter::new(config.keywords.iter().cloned())),
            config.target_channel_id,
            Arc::new(SlackForwarder::new(config.slack_webhook_url.clone())),
        )
    }

    pub fn log_startup(&self) {
        match self.target_channel_id {
            Some(id) => info!("Monitoring channel {}", id),
            None => warn!("No target channel set: monitoring all channels"),
        }
        if self.filter.is_empty() {
            info!("No search keywords: forwarding every message");
        } else {
            info!("Search keywords: {}", self.filter.keywords().join(", "));
        }
    }

    /// Run the checks in order. Returns the message as evaluated, which may carry
    /// re-fetched embeds.
    pub async fn evaluate(
        &self,
        mut msg: IncomingMessage,
        bot_user_id: Option<u64>,
        source: &dyn MessageSource,
    ) -> (IncomingMessage, Verdict) {
        if bot_user_id == Some(msg.author_id) {
            return (msg, Verdict::OwnMessage);
        }
        if self.target_channel_id.is_some_and(|id| id != msg.channel_id) {
            return (msg, Verdict::OtherChannel);
        }
        if msg.is_empty() {
            return (msg, Verdict::Empty);
        }

        // Link previews often arrive before the gateway fills them in
        if !msg.embeds.is_empty() && msg.embeds.iter().all(|e| e.is_blank()) {
            match source.refetch(&msg).await {
                Ok(fresh) => msg.embeds = fresh.embeds,
                Err(e) => warn!(message_id = msg.id, "Embed re-fetch failed: {:#}", e),
            }
        }

        if !self.filter.should_forward(msg.text(), &msg.embeds) {
            info!(
                author = %msg.author_name,
                channel_id = msg.channel_id,
                "Skipped: no keyword hit"
            );
            return (msg, Verdict::NoKeywordHit);
        }

        if let Some(text) = msg.text() {
            let first_line = text.lines().next().unwrap_or_default();
            if !first_line.contains(TWEET_MARKER) {
                info!("Skipped: first line lacks \"{}\": {}", TWEET_MARKER, first_line);
                let first_line = first_line.to_string();
                return (msg, Verdict::MissingMarker { first_line });
            }
        }

        (msg, Verdict::Forward)
    }

    /// Evaluate and, when accepted, post to Slack in a detached task
    pub async fn handle(
        &self,
        msg: IncomingMessage,
        bot_user_id: Option<u64>,
        source: &dyn MessageSource,
    ) -> Verdict {
        let (msg, verdict) = self.evaluate(msg, bot_user_id, source).await;
        if verdict != Verdict::Forward {
            return verdict;
        }

        let snippet: String = msg.text().unwrap_or_default().chars().take(50).collect();
        info!(
            author = %msg.author_name,
            channel_id = msg.channel_id,
            "Forwarding: {}",
            snippet
        );

        let forwarder = Arc::clone(&self.forwarder);
        tokio::spawn(async move {
            forwarder.forward(&msg).await;
        });

        verdict
    }
}
