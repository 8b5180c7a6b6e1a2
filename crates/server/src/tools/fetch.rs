//! portal_fetch tool implementation.
//!
//! Routes a request through the registration exactly as a page load would:
//! the active worker answers from its generation, the network, or the offline
//! page. With no active worker the request goes straight to the network.

use chrono::Utc;
use portal_client::{Host, ResponseSource};
use portal_core::{Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for portal_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalFetchParams {
    /// Absolute URL or a path relative to the portal origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET responses are stored.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level navigation, which falls back to the
    /// offline page when the network is unreachable.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for portal_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalFetchOutput {
    pub url: String,
    pub source: ResponseSource,
    /// Absent when the fetch failed with nothing to fall back to.
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8, lossily.
    pub body: Option<String>,
    pub bytes: usize,
    pub fetched_at: String,
}

pub async fn fetch_impl(host: &Host, params: PortalFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = host.resolve(&params.url)?;
    let mut request = if params.navigate { Request::navigate(url) } else { Request::get(url) };
    request.method = params.method.trim().to_ascii_uppercase();

    let requested = request.url.to_string();
    let outcome = host.registration().fetch(request).await?;
    let fetched_at = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    tracing::debug!(url = %requested, source = ?outcome.source, "portal_fetch");

    let output = match outcome.response {
        Some(response) => PortalFetchOutput {
            url: requested,
            source: outcome.source,
            status: Some(response.status),
            content_type: response.content_type().map(str::to_string),
            bytes: response.body.len(),
            body: Some(String::from_utf8_lossy(&response.body).into_owned()),
            fetched_at,
        },
        None => PortalFetchOutput {
            url: requested,
            source: outcome.source,
            status: None,
            content_type: None,
            body: None,
            bytes: 0,
            fetched_at,
        },
    };

    json_result(&output)
}
