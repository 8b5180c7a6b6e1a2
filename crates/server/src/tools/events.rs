//! Functional events: portal_push, portal_notification_click, portal_sync.

use portal_client::{Host, NotificationId};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalPushParams {
    /// Raw push payload, expected to be JSON `{"title": ..., "body": ...}`.
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalPushOutput {
    pub notification: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalNotificationClickParams {
    /// Id returned by portal_push.
    pub notification: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalNotificationClickOutput {
    pub opened: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalSyncParams {
    /// Sync tag (default: sync-forms).
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_tag() -> String {
    "sync-forms".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalSyncOutput {
    pub tag: String,
    /// False when no handler exists for the tag.
    pub handled: bool,
}

pub async fn push_impl(host: &Host, params: PortalPushParams) -> Result<CallToolResult, McpError> {
    let id = host.registration().push(params.payload.into_bytes()).await?;
    json_result(&PortalPushOutput { notification: id.0 })
}

pub async fn notification_click_impl(
    host: &Host, params: PortalNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    host.registration()
        .notification_click(NotificationId(params.notification))
        .await?;
    let opened = host.resolve(&host.config().open_url)?.to_string();
    json_result(&PortalNotificationClickOutput { opened })
}

pub async fn sync_impl(host: &Host, params: PortalSyncParams) -> Result<CallToolResult, McpError> {
    let handled = host.registration().sync(&params.tag).await?;
    json_result(&PortalSyncOutput { tag: params.tag, handled })
}
