//! cache_keys tool implementation.
//!
//! Lists the request URLs stored in one generation.

use portal_client::Host;
use portal_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Generation to list. Defaults to the active one, then the configured one.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub generation: String,
    /// Stored request URLs in insertion order.
    pub urls: Vec<String>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(host: &Host, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let generation = match params.generation {
        Some(name) => name,
        None => match host.registration().active_generation().await {
            Some(active) => active,
            None => host.config().generation_name(),
        },
    };

    if !host.db().has_generation(&generation).await? {
        return Err(Error::InvalidInput(format!("no generation named {generation}")).into());
    }

    let urls = host.db().entry_urls(&generation).await?;
    json_result(&CacheKeysOutput { generation, urls })
}
