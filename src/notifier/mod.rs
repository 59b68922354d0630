//! # Notifier
//!
//! Formats a run summary and dispatches it to a chat channel.
//!
//! - `message` - builds [`Notification`]s from a [`RotationOutcome`]
//! - `slack` - Slack Web API delivery
//! - `log` - writes the summary to the log when no chat notifier is configured

mod log;
mod message;
mod slack;

pub use self::log::LogNotifier;
pub use self::message::{failure_notification, summary_notification};
pub use self::slack::SlackNotifier;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::NotifierConfig;
use crate::error::TransportError;

#[cfg(test)]
use mockall::automock;

/// Attachment color, as understood by Slack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationColor {
    Good,
    Warning,
    Danger,
}

impl NotificationColor {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationColor::Good => "good",
            NotificationColor::Warning => "warning",
            NotificationColor::Danger => "danger",
        }
    }
}

impl std::fmt::Display for NotificationColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A formatted summary ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: String,
    pub title: String,
    pub color: NotificationColor,
    pub body: String,
}

/// Delivers notifications
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), TransportError>;
}

/// Build the notifier selected by configuration
///
/// # Errors
///
/// Returns an error when the HTTP client for Slack cannot be built.
pub fn create_notifier(config: &NotifierConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match config {
        NotifierConfig::Slack { token, api_url, .. } => {
            Ok(Arc::new(SlackNotifier::new(api_url, token.as_str())?))
        }
        NotifierConfig::None => Ok(Arc::new(LogNotifier)),
    }
}
