//! # Slack Notifier
//!
//! Posts summaries through the Slack Web API `chat.postMessage` method as a message
//! with a single colored attachment.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::{Notification, Notifier};
use crate::constants::SLACK_REQUEST_TIMEOUT_SECS;
use crate::error::TransportError;

/// Envelope every Web API method returns
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackNotifier {
    http_client: reqwest::Client,
    api_url: String,
    token: Zeroizing<String>,
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl SlackNotifier {
    /// Create a notifier for the Web API rooted at `api_url`
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(api_url: &str, token: &str) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SLACK_REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: Zeroizing::new(token.to_string()),
        })
    }

    fn post_message_url(&self) -> String {
        format!("{}/chat.postMessage", self.api_url)
    }
}

/// Request body for `chat.postMessage`
fn message_payload(notification: &Notification) -> Value {
    json!({
        "channel": notification.channel,
        "text": notification.title,
        "attachments": [{
            "title": notification.title,
            "color": notification.color.as_str(),
            "text": notification.body,
        }]
    })
}

/// Slack answers HTTP 200 for most failures and reports them in the body
fn check_response(response: SlackResponse) -> Result<(), String> {
    if response.ok {
        Ok(())
    } else {
        Err(format!(
            "Slack API error: {}",
            response.error.as_deref().unwrap_or("unknown")
        ))
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), TransportError> {
        let resource = format!("slack channel {}", notification.channel);
        debug!(channel = %notification.channel, "Posting message to Slack");

        let response = self
            .http_client
            .post(self.post_message_url())
            .bearer_auth(self.token.as_str())
            .json(&message_payload(notification))
            .send()
            .await
            .map_err(|e| TransportError::new("post message", resource.clone(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError::new(
                "post message",
                resource,
                format!("HTTP {status} - {error_text}"),
            ));
        }

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| TransportError::new("post message", resource.clone(), e))?;
        check_response(body).map_err(|e| TransportError::new("post message", resource, e))?;

        info!(channel = %notification.channel, "Notification sent to Slack");
        Ok(())
    }
}
