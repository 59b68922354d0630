//! # Notifier Configuration

use super::{ConfigError, Env};
use crate::constants::DEFAULT_SLACK_API_URL;
use zeroize::Zeroizing;

/// Where rotation summaries go
#[derive(Clone)]
pub enum NotifierConfig {
    /// Slack Web API `chat.postMessage`
    Slack {
        channel: String,
        token: Zeroizing<String>,
        /// Base URL of the Web API, overridable for tests
        api_url: String,
    },
    /// Summaries are written to the log only
    None,
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifierConfig::Slack {
                channel, api_url, ..
            } => f
                .debug_struct("Slack")
                .field("channel", channel)
                .field("api_url", api_url)
                .finish_non_exhaustive(),
            NotifierConfig::None => f.write_str("None"),
        }
    }
}

impl NotifierConfig {
    pub(crate) fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        match env.or_default("NOTIFIER", "slack").to_lowercase().as_str() {
            "slack" => Ok(NotifierConfig::Slack {
                token: Zeroizing::new(env.required("SLACK_API_TOKEN")?),
                channel: env.required("SLACK_CHANNEL_NAME")?,
                api_url: env.or_default("SLACK_API_URL", DEFAULT_SLACK_API_URL),
            }),
            "none" => Ok(NotifierConfig::None),
            other => Err(ConfigError::Invalid {
                key: "NOTIFIER",
                value: other.to_string(),
                expected: "slack or none",
            }),
        }
    }

    /// Channel summaries are posted to; empty when notifications only go to the log
    pub fn channel(&self) -> &str {
        match self {
            NotifierConfig::Slack { channel, .. } => channel,
            NotifierConfig::None => "",
        }
    }
}
