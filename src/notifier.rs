//! Posting change summaries to a chat webhook

use crate::change_detection::DiffSummary;
use crate::config::WebhookSettings;
use crate::error::{Result, SheetSyncError};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// A sink for sync summaries
pub trait Notifier {
    /// Send the summary; `Ok(false)` means the sink rejected or never got it
    fn post_summary(&self, summary: &DiffSummary, sheet_url: &str) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub text: String,
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub color: String,
    pub text: String,
    pub mrkdwn_in: Vec<String>,
}

/// Slack-style incoming webhook
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    channel: String,
    username: String,
    icon_emoji: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let defaults = WebhookSettings::default();
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SheetSyncError::notification(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            channel: defaults.channel,
            username: defaults.username,
            icon_emoji: defaults.icon_emoji,
        })
    }

    pub fn from_settings(settings: &WebhookSettings) -> Result<Self> {
        let url = settings
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                SheetSyncError::config(format!(
                    "Missing 'webhook.url' in configuration (or set {})",
                    crate::config::WEBHOOK_URL_ENV
                ))
            })?;

        let mut notifier = Self::new(url)?;
        notifier.channel = settings.channel.clone();
        notifier.username = settings.username.clone();
        notifier.icon_emoji = settings.icon_emoji.clone();
        Ok(notifier)
    }

    pub fn build_payload(&self, summary: &DiffSummary, sheet_url: &str) -> WebhookPayload {
        WebhookPayload {
            text: "✅ Sheets Bot Sync Completed".to_string(),
            channel: self.channel.clone(),
            username: self.username.clone(),
            icon_emoji: self.icon_emoji.clone(),
            attachments: vec![Attachment {
                color: "good".to_string(),
                text: format!(
                    "📊 *Changes*: {}\n🔗 *Sheet*: <{}|View Updated Sheet>",
                    summary, sheet_url
                ),
                mrkdwn_in: vec!["text".to_string()],
            }],
        }
    }
}

impl Notifier for WebhookNotifier {
    fn post_summary(&self, summary: &DiffSummary, sheet_url: &str) -> Result<bool> {
        let payload = self.build_payload(summary, sheet_url);

        let response = match self.client.post(&self.url).json(&payload).send() {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Webhook notification failed: {}", e);
                return Ok(false);
            }
        };

        let status = response.status();
        if status == StatusCode::OK {
            log::debug!("Webhook notification delivered");
            return Ok(true);
        }

        let body = response.text().unwrap_or_default();
        log::warn!(
            "Webhook notification failed with status {}: {}",
            status.as_u16(),
            body
        );
        Ok(false)
    }
}
