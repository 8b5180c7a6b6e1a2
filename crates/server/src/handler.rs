//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    CacheKeysParams, PortalFetchParams, PortalInstallParams, PortalNotificationClickParams, PortalPushParams,
    PortalSyncParams, activate_impl, fetch_impl, install_impl, keys_impl, notification_click_impl, push_impl,
    status_impl, sync_impl,
};

use portal_client::Host;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for portal-offline.
#[derive(Clone)]
pub struct PortalServer {
    tool_router: ToolRouter<Self>,
    host: Arc<Host>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PortalServer {
    /// Create a new server handler around a configured host.
    pub fn new(host: Arc<Host>) -> Self {
        Self { tool_router: Self::tool_router(), host }
    }

    /// Fetch a portal URL through the active worker.
    #[tool(
        description = "Fetch a URL through the offline worker. Serves from cache, then network, then the offline page for navigations."
    )]
    async fn portal_fetch(&self, params: Parameters<PortalFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    #[tool(description = "Install a worker version: precache the manifest into a new generation.")]
    async fn portal_install(&self, params: Parameters<PortalInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.host, params.0).await
    }

    #[tool(description = "Activate the waiting worker and delete superseded generations.")]
    async fn portal_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.host).await
    }

    #[tool(description = "Show registration state, stored generations, and registered sync tags.")]
    async fn portal_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.host).await
    }

    #[tool(description = "Deliver a push payload ({\"title\", \"body\"} JSON) to the active worker.")]
    async fn portal_push(&self, params: Parameters<PortalPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.host, params.0).await
    }

    #[tool(description = "Click a displayed notification: close it and open the portal root.")]
    async fn portal_notification_click(
        &self, params: Parameters<PortalNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.host, params.0).await
    }

    #[tool(description = "Fire a background sync event for a tag.")]
    async fn portal_sync(&self, params: Parameters<PortalSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.host, params.0).await
    }

    #[tool(description = "List request URLs stored in a cache generation.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.host, params.0).await
    }
}

impl ServerHandler for PortalServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "portal-offline".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
