use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EditError, SendError};
use crate::notify::render::{Field, Message};

const API_BASE: &str = "https://discord.com/api/v10";

// JSON error codes returned by the Discord API
const UNKNOWN_CHANNEL: u64 = 10003;
const UNKNOWN_MESSAGE: u64 = 10008;
const MISSING_ACCESS: u64 = 50001;
const MISSING_PERMISSIONS: u64 = 50013;
const MESSAGE_TOO_OLD: u64 = 50034;

/// A sent message, with the content it currently shows
#[derive(Debug, Clone)]
pub struct MessageHandle {
    pub channel_id: u64,
    pub message_id: String,
    pub message: Message,
}

/// Where notifications go
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, channel_id: u64, message: Message) -> Result<MessageHandle, SendError>;

    /// Replace the value of one field of an already sent message
    async fn edit_field(
        &self,
        handle: &mut MessageHandle,
        index: usize,
        value: String,
    ) -> Result<(), EditError>;
}

/// Sends embeds through the Discord REST API with a bot token
pub struct DiscordSink {
    client: Client,
    token: String,
}

impl DiscordSink {
    pub fn new(token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create Discord HTTP client")?;

        Ok(Self {
            client,
            token: token.to_string(),
        })
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }
}

#[async_trait]
impl MessageSink for DiscordSink {
    async fn send(&self, channel_id: u64, message: Message) -> Result<MessageHandle, SendError> {
        let url = format!("{API_BASE}/channels/{channel_id}/messages");
        let payload = CreateMessage::from_message(&message);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ApiError = response.json().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND || body.code == Some(UNKNOWN_CHANNEL) {
                return Err(SendError::UnknownChannel(channel_id));
            }
            return Err(SendError::Rejected {
                status: status.as_u16(),
                message: body.message.unwrap_or_default(),
            });
        }

        let created: CreatedMessage = response.json().await?;
        debug!("Created message {} in channel {}", created.id, channel_id);

        Ok(MessageHandle {
            channel_id,
            message_id: created.id,
            message,
        })
    }

    async fn edit_field(
        &self,
        handle: &mut MessageHandle,
        index: usize,
        value: String,
    ) -> Result<(), EditError> {
        let mut updated = handle.message.clone();
        let field = updated
            .fields
            .get_mut(index)
            .ok_or_else(|| EditError::Other(format!("message has no field {index}")))?;
        field.value = value;

        let url = format!(
            "{API_BASE}/channels/{}/messages/{}",
            handle.channel_id, handle.message_id
        );
        let payload = EditMessage {
            embeds: vec![Embed::from_message(&updated)],
        };

        let response = self
            .client
            .patch(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            handle.message = updated;
            return Ok(());
        }

        let body: ApiError = response.json().await.unwrap_or_default();
        Err(classify_edit_failure(status, &body))
    }
}

fn classify_edit_failure(status: StatusCode, body: &ApiError) -> EditError {
    match body.code {
        Some(UNKNOWN_MESSAGE) => EditError::NotFound,
        Some(MESSAGE_TOO_OLD) => EditError::TooOld,
        Some(MISSING_ACCESS | MISSING_PERMISSIONS) => EditError::Forbidden,
        _ if status == StatusCode::NOT_FOUND => EditError::NotFound,
        _ if status == StatusCode::FORBIDDEN => EditError::Forbidden,
        _ => EditError::Other(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body.message.as_deref().unwrap_or("no message")
        )),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    code: Option<u64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreateMessage {
    embeds: Vec<Embed>,
    components: Vec<ActionRow>,
}

impl CreateMessage {
    fn from_message(message: &Message) -> Self {
        let buttons = message
            .links
            .iter()
            .filter(|link| link.url.starts_with("http"))
            .map(|link| Button {
                kind: 2,
                style: 5,
                label: link.label.clone(),
                url: link.url.clone(),
            })
            .collect();

        Self {
            embeds: vec![Embed::from_message(message)],
            components: vec![ActionRow {
                kind: 1,
                components: buttons,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct EditMessage {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<EmbedImage>,
    fields: Vec<Field>,
    footer: EmbedFooter,
}

impl Embed {
    fn from_message(message: &Message) -> Self {
        Self {
            title: message.title.clone(),
            description: message.description.clone(),
            url: Some(message.url.clone()).filter(|u| u.starts_with("http")),
            color: message.color,
            image: message.image_url.clone().map(|url| EmbedImage { url }),
            fields: message.fields.clone(),
            footer: EmbedFooter {
                text: message.footer.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedImage {
    url: String,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

/// Component type 1
#[derive(Debug, Serialize)]
struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    components: Vec<Button>,
}

/// Component type 2, style 5 is a link button
#[derive(Debug, Serialize)]
struct Button {
    #[serde(rename = "type")]
    kind: u8,
    style: u8,
    label: String,
    url: String,
}
