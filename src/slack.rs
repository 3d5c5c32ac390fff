use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use rand::seq::IndexedRandom;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::platform::{AttachmentView, EmbedView, IncomingMessage};

/// Tag appended to author names of relayed tweets
const AUTHOR_SUFFIXES: [&str; 2] = ["• TweetShift#0000", "• TweetShift"];

pub const PREVIEW_CHARS: usize = 80;
const NO_TEXT: &str = "(media post)";
const NO_BODY: &str = "(no body)";
const NO_ATTACHMENTS: &str = "none";

/// Accent colors for the Slack attachment bar
pub const PALETTE: [&str; 8] = [
    "#3374ff", "#FF0000", "#FFFF00", "#0bff4a", "#e00bff", "#ff0b4e", "#0bf3ff", "#ff7a0b",
];

const JST_OFFSET_SECS: i32 = 9 * 3600;

// ── Payload ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub text: String,
    pub blocks: Vec<Block>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub color: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Divider,
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<TextObject>>,
    },
    Context {
        elements: Vec<TextObject>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl TextObject {
    fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn",
            text: text.into(),
        }
    }
}

// ── Formatting ─────────────────────────────────────────────────────────────────

pub fn display_author(name: &str) -> String {
    let mut name = name.to_string();
    for suffix in AUTHOR_SUFFIXES {
        name = name.replace(suffix, "");
    }
    name.trim().to_string()
}

/// First `PREVIEW_CHARS` characters of the message text
pub fn preview(content: Option<&str>) -> String {
    match content {
        Some(text) if !text.is_empty() => text.chars().take(PREVIEW_CHARS).collect(),
        _ => NO_TEXT.to_string(),
    }
}

pub fn embed_body(embeds: &[EmbedView]) -> String {
    let mut lines = Vec::new();
    for embed in embeds {
        if let Some(title) = embed.title.as_deref().filter(|t| !t.is_empty()) {
            lines.push(format!("*{title}*"));
        }
        if let Some(description) = embed.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(description.to_string());
        }
    }
    if lines.is_empty() {
        NO_BODY.to_string()
    } else {
        lines.join("\n")
    }
}

/// Slack link list of the message attachments
pub fn attachment_list(attachments: &[AttachmentView]) -> String {
    if attachments.is_empty() {
        return NO_ATTACHMENTS.to_string();
    }
    attachments
        .iter()
        .map(|a| format!("• <{}|{}>", a.url, a.filename))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn random_color() -> &'static str {
    PALETTE.choose(&mut rand::rng()).copied().unwrap_or(PALETTE[0])
}

pub fn jst_timestamp(now: DateTime<Utc>) -> String {
    let Some(jst) = FixedOffset::east_opt(JST_OFFSET_SECS) else {
        return now.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    };
    now.with_timezone(&jst)
        .format("%Y-%m-%d %H:%M:%S JST")
        .to_string()
}

pub fn build_payload(msg: &IncomingMessage, color: &str, timestamp: &str) -> WebhookPayload {
    let author = display_author(&msg.author_name);
    let body = format!("{}\n\n{}", preview(msg.text()), embed_body(&msg.embeds));

    let blocks = vec![
        Block::Section {
            text: None,
            fields: Some(vec![TextObject::mrkdwn(format!("✅ *{author}*"))]),
        },
        Block::Section {
            text: Some(TextObject::mrkdwn(body)),
            fields: None,
        },
        Block::Context {
            elements: vec![TextObject::mrkdwn(format!("🕒 {timestamp}"))],
        },
    ];

    WebhookPayload {
        text: format!("*{author}*"),
        blocks: vec![Block::Divider],
        attachments: vec![Attachment {
            color: color.to_string(),
            blocks,
        }],
    }
}

// ── Client ─────────────────────────────────────────────────────────────────────

/// Posts relayed messages to a Slack incoming webhook
pub struct SlackForwarder {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackForwarder {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }

    /// Post one message; returns the accent color used
    pub async fn send(&self, msg: &IncomingMessage) -> Result<&'static str> {
        let color = random_color();
        let payload = build_payload(msg, color, &jst_timestamp(Utc::now()));

        debug!(
            message_id = msg.id,
            attachments = %attachment_list(&msg.attachments),
            "Posting to Slack webhook"
        );

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to Slack webhook")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Slack webhook error ({}): {}", status, error_body);
        }

        Ok(color)
    }

    /// Send and log the outcome. Failures are dropped.
    pub async fn forward(&self, msg: &IncomingMessage) {
        match self.send(msg).await {
            Ok(color) => info!(message_id = msg.id, color, "Forwarded message to Slack"),
            Err(e) => error!(message_id = msg.id, "Slack forward failed: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message(content: Option<&str>) -> IncomingMessage {
        IncomingMessage {
            id: 42,
            channel_id: 7,
            author_id: 9,
            author_name: "Jane • TweetShift#0000".to_string(),
            content: content.map(str::to_string),
            embeds: vec![EmbedView {
                title: Some("Jane (@jane)".to_string()),
                description: Some("hello from the timeline".to_string()),
                url: Some("https://x.com/jane/status/1".to_string()),
                author_name: None,
            }],
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_display_author_strips_suffix() {
        assert_eq!(display_author("Jane • TweetShift#0000"), "Jane");
        assert_eq!(display_author("Jane • TweetShift"), "Jane");
        assert_eq!(display_author("plainuser"), "plainuser");
    }

    #[test]
    fn test_preview_truncates_to_80_chars() {
        let long = "あ".repeat(100);
        let p = preview(Some(&long));
        assert_eq!(p.chars().count(), 80);

        let ascii = "x".repeat(81);
        assert_eq!(preview(Some(&ascii)), "x".repeat(80));

        assert_eq!(preview(Some("short")), "short");
        assert_eq!(preview(None), NO_TEXT);
        assert_eq!(preview(Some("")), NO_TEXT);
    }

    #[test]
    fn test_embed_body() {
        assert_eq!(embed_body(&[]), NO_BODY);
        let embeds = vec![
            EmbedView {
                title: Some("T1".to_string()),
                description: Some("D1".to_string()),
                ..Default::default()
            },
            EmbedView {
                description: Some("D2".to_string()),
                ..Default::default()
            },
        ];
        assert_eq!(embed_body(&embeds), "*T1*\nD1\nD2");
        assert_eq!(embed_body(&[EmbedView::default()]), NO_BODY);
    }

    #[test]
    fn test_attachment_list() {
        assert_eq!(attachment_list(&[]), "none");
        let list = attachment_list(&[
            AttachmentView {
                url: "https://cdn/a.png".to_string(),
                filename: "a.png".to_string(),
            },
            AttachmentView {
                url: "https://cdn/b.mp4".to_string(),
                filename: "b.mp4".to_string(),
            },
        ]);
        assert_eq!(list, "• <https://cdn/a.png|a.png>\n• <https://cdn/b.mp4|b.mp4>");
    }

    #[test]
    fn test_random_color_in_palette() {
        for _ in 0..32 {
            assert!(PALETTE.contains(&random_color()));
        }
    }

    #[test]
    fn test_jst_timestamp() {
        let utc = Utc.with_ymd_and_hms(2024, 12, 31, 20, 5, 9).unwrap();
        assert_eq!(jst_timestamp(utc), "2025-01-01 05:05:09 JST");
    }

    #[test]
    fn test_payload_shape() {
        let long = format!("Tweeted by @jane\n{}", "z".repeat(120));
        let payload = build_payload(&message(Some(&long)), "#3374ff", "2025-01-01 05:05:09 JST");
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["text"], "*Jane*");
        assert_eq!(json["blocks"], serde_json::json!([{"type": "divider"}]));

        let att = &json["attachments"][0];
        assert_eq!(att["color"], "#3374ff");
        assert_eq!(att["blocks"][0]["type"], "section");
        assert_eq!(att["blocks"][0]["fields"][0]["type"], "mrkdwn");
        assert_eq!(att["blocks"][0]["fields"][0]["text"], "✅ *Jane*");
        assert!(att["blocks"][0].get("text").is_none());

        let expected_preview: String = long.chars().take(80).collect();
        assert_eq!(
            att["blocks"][1]["text"]["text"],
            format!("{expected_preview}\n\n*Jane (@jane)*\nhello from the timeline")
        );
        assert_eq!(att["blocks"][2]["type"], "context");
        assert_eq!(att["blocks"][2]["elements"][0]["text"], "🕒 2025-01-01 05:05:09 JST");
    }

    #[tokio::test]
    async fn test_send_posts_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/T/B/X"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({"text": "*Jane*"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let forwarder = SlackForwarder::new(format!("{}/services/T/B/X", mock_server.uri()));
        let color = forwarder
            .send(&message(Some("Tweeted by @jane")))
            .await
            .unwrap();
        assert!(PALETTE.contains(&color));
    }

    #[tokio::test]
    async fn test_send_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
            .mount(&mock_server)
            .await;

        let forwarder = SlackForwarder::new(mock_server.uri());
        let err = forwarder.send(&message(None)).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains("no_service"));
    }

    #[tokio::test]
    async fn test_send_transport_error() {
        let forwarder = SlackForwarder::new("http://127.0.0.1:1/hook");
        assert!(forwarder.send(&message(None)).await.is_err());
    }

    #[tokio::test]
    async fn test_forward_swallows_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let forwarder = SlackForwarder::new(mock_server.uri());
        forwarder.forward(&message(Some("Tweeted"))).await;
    }
}
