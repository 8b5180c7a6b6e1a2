//! MCP tool implementations.
//!
//! This module contains all tools exposed by the portal-offline server.

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;

pub use cache::{CacheKeysParams, keys_impl};
pub use events::{
    PortalNotificationClickParams, PortalPushParams, PortalSyncParams, notification_click_impl, push_impl, sync_impl,
};
pub use fetch::{PortalFetchParams, fetch_impl};
pub use lifecycle::{PortalInstallParams, activate_impl, install_impl, status_impl};

use portal_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use portal_client::{FetchError, Host, LoggingSurface, LoggingWindows, Network, WorkerScope};
    use portal_core::{AppConfig, CacheDb, Request, Response, ResponseKind};
    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;
    use url::Url;

    pub(crate) const ORIGIN: &str = "https://portal.test";

    /// Answers 200 with the path as body for every URL except `/missing*`.
    #[derive(Default)]
    pub(crate) struct StaticNetwork {
        pub(crate) offline: AtomicBool,
        pub(crate) calls: AtomicUsize,
    }

    #[async_trait]
    impl Network for StaticNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(FetchError::Network("offline".into()));
            }
            let status = if request.url.path().starts_with("/missing") { 404 } else { 200 };
            Ok(Response {
                url: request.url.clone(),
                status,
                status_text: String::new(),
                headers: vec![("content-type".into(), "text/html".into())],
                body: request.url.path().as_bytes().to_vec(),
                kind: ResponseKind::classify(&request.url, &Url::parse(ORIGIN).unwrap()),
            })
        }
    }

    pub(crate) async fn host() -> (Arc<Host>, Arc<StaticNetwork>) {
        host_with(AppConfig { origin: ORIGIN.into(), ..Default::default() }).await
    }

    pub(crate) async fn host_with(config: AppConfig) -> (Arc<Host>, Arc<StaticNetwork>) {
        let network = Arc::new(StaticNetwork::default());
        let scope = WorkerScope {
            db: CacheDb::open_in_memory().await.unwrap(),
            network: network.clone(),
            notifications: Arc::new(LoggingSurface::default()),
            clients: Arc::new(LoggingWindows::default()),
        };
        (Arc::new(Host::with_scope(config, scope).unwrap()), network)
    }

    /// Parse the JSON text of the first content item.
    pub(crate) fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
