//! Push relay and notification clicks.

use async_trait::async_trait;
use portal_core::Error;
use serde::{Deserialize, Serialize};
use url::Url;

use super::OfflineWorker;

/// Fixed key attached to every notification's data.
const PRIMARY_KEY: u32 = 1;

/// Expected push payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
}

impl PushMessage {
    /// Parse a push payload. Both fields are required strings.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(data).map_err(|e| Error::MalformedPush(e.to_string()))
    }
}

/// Delivery metadata attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationData {
    /// Unix milliseconds.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// A notification to present on the platform surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
}

/// Handle to a displayed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationId(pub u64);

/// Platform notification surface.
#[async_trait]
pub trait NotificationSurface: Send + Sync {
    async fn show(&self, notification: Notification) -> Result<NotificationId, Error>;

    async fn close(&self, id: NotificationId) -> Result<(), Error>;
}

/// Client windows controlled by the host.
#[async_trait]
pub trait ClientWindows: Send + Sync {
    /// Focus a window showing `url`, opening one if needed.
    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}

impl OfflineWorker {
    /// Present a notification for a push payload.
    ///
    /// A payload that is not `{title, body}` is an error and nothing is shown.
    pub async fn push(&self, data: &[u8]) -> Result<NotificationId, Error> {
        let message = PushMessage::parse(data).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected push payload");
        })?;

        let icon = self.settings.notification_icon.to_string();
        let notification = Notification {
            title: message.title,
            body: message.body,
            badge: icon.clone(),
            icon,
            vibrate: self.settings.vibrate.clone(),
            data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: PRIMARY_KEY },
        };

        let id = self.scope.notifications.show(notification).await?;
        tracing::debug!(notification = id.0, "notification shown");
        Ok(id)
    }

    /// Dismiss the notification and bring up the portal root.
    pub async fn notification_click(&self, id: NotificationId) -> Result<(), Error> {
        self.scope.notifications.close(id).await?;
        self.scope.clients.open_window(&self.settings.open_url).await
    }
}
