use std::sync::{Arc, OnceLock};

use anyhow::{Context as _, Result};
use serenity::{
    all::{ChannelId, Context, EventHandler, GatewayIntents, Message, MessageId, Ready},
    async_trait,
    http::Http,
};
use tracing::{debug, info};

use crate::platform::{AttachmentView, EmbedView, IncomingMessage};
use crate::relay::{MessageSource, Relay};

/// Gateway intents the relay needs: the defaults plus message content.
pub fn required_intents() -> GatewayIntents {
    GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT
}

/// Author tag as shown in the client. Webhook senders report `#0000`.
fn author_tag(msg: &Message) -> String {
    if msg.webhook_id.is_some() && msg.author.discriminator.is_none() {
        format!("{}#0000", msg.author.name)
    } else {
        msg.author.tag()
    }
}

pub fn to_incoming(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.get(),
        author_name: author_tag(msg),
        content: Some(msg.content.clone()),
        embeds: msg
            .embeds
            .iter()
            .map(|e| EmbedView {
                title: e.title.clone(),
                description: e.description.clone(),
                url: e.url.clone(),
                author_name: e.author.as_ref().map(|a| a.name.clone()),
            })
            .collect(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| AttachmentView {
                url: a.url.clone(),
                filename: a.filename.clone(),
            })
            .collect(),
    }
}

/// Fetches messages over the Discord REST API
struct DiscordSource {
    http: Arc<Http>,
}

#[async_trait]
impl MessageSource for DiscordSource {
    async fn refetch(&self, msg: &IncomingMessage) -> Result<IncomingMessage> {
        let fetched = ChannelId::new(msg.channel_id)
            .message(&*self.http, MessageId::new(msg.id))
            .await
            .with_context(|| format!("Failed to fetch message {}", msg.id))?;
        debug!(message_id = msg.id, embeds = fetched.embeds.len(), "Re-fetched message");
        Ok(to_incoming(&fetched))
    }
}

/// Serenity event handler feeding gateway messages into the relay
pub struct Handler {
    relay: Arc<Relay>,
    bot_user_id: OnceLock<u64>,
}

impl Handler {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            bot_user_id: OnceLock::new(),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let _ = self.bot_user_id.set(ready.user.id.get());
        info!(bot_user = %ready.user.tag(), "Logged in as {}", ready.user.tag());
        self.relay.log_startup();
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let source = DiscordSource {
            http: Arc::clone(&ctx.http),
        };
        let verdict = self
            .relay
            .handle(to_incoming(&msg), self.bot_user_id.get().copied(), &source)
            .await;
        debug!(message_id = msg.id.get(), ?verdict, "Message evaluated");
    }
}

/// Connect to the gateway and process events until the client stops
pub async fn run(token: &str, relay: Arc<Relay>) -> Result<()> {
    info!("Starting Discord client...");

    let mut client = serenity::Client::builder(token, required_intents())
        .event_handler(Handler::new(relay))
        .await
        .context("Failed to build Discord client")?;

    client
        .start()
        .await
        .context("Discord client stopped with error")?;

    Ok(())
}
