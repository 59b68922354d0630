use async_trait::async_trait;
use tracing::{info, warn};

use super::{Notification, NotificationColor, Notifier};
use crate::error::TransportError;

/// Writes summaries to the log instead of a chat channel
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), TransportError> {
        match notification.color {
            NotificationColor::Good => {
                info!(title = %notification.title, "{}", notification.body);
            }
            NotificationColor::Warning | NotificationColor::Danger => {
                warn!(title = %notification.title, "{}", notification.body);
            }
        }
        Ok(())
    }
}
