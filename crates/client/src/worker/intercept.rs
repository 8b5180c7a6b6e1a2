//! Fetch interception: cache first, then network, then the offline page.

use portal_core::{Request, Response};
use serde::{Deserialize, Serialize};

use super::{OfflineWorker, WaitUntil};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Network failed on a navigation; the offline document was served.
    OfflineFallback,
    /// Network failed and there was nothing to fall back to.
    Failed,
}

/// Result of handling one request.
#[derive(Debug)]
pub struct FetchOutcome {
    /// None when the fetch failed with no fallback.
    pub response: Option<Response>,
    pub source: ResponseSource,
    /// Settles once the network response has been written to the cache.
    /// Already settled when nothing was stored.
    pub cache_write: WaitUntil<()>,
}

impl FetchOutcome {
    pub(crate) fn immediate(response: Option<Response>, source: ResponseSource) -> Self {
        Self { response, source, cache_write: WaitUntil::done() }
    }

    pub fn is_failed(&self) -> bool {
        self.source == ResponseSource::Failed
    }
}

impl OfflineWorker {
    /// Answer a request.
    ///
    /// Cache hits are returned as stored, without revalidation. On a miss the
    /// network response is returned right away; if it is a same-origin `200`
    /// for a `GET`, a copy is written in the background and `cache_write`
    /// tracks that write. Store failures count as misses.
    pub async fn fetch(&self, request: Request) -> FetchOutcome {
        let generation = self.generation();
        let db = &self.scope.db;

        match db.match_entry(generation, &request.method, &request.url).await {
            Ok(Some(entry)) => {
                tracing::debug!(url = %request.url, "cache hit");
                return FetchOutcome::immediate(Some(entry.response), ResponseSource::Cache);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache lookup failed, treating as miss"),
        }

        match self.scope.network.fetch(&request).await {
            Ok(response) => {
                if !response.is_cache_eligible() || !request.method.eq_ignore_ascii_case("GET") {
                    return FetchOutcome::immediate(Some(response), ResponseSource::Network);
                }

                let db = db.clone();
                let generation = generation.to_string();
                let copy = response.clone();
                let cache_write = WaitUntil::spawn(async move {
                    db.put_entry(&generation, &request, &copy).await.inspect_err(|e| {
                        tracing::warn!(url = %request.url, error = %e, "failed to store response");
                    })
                });

                FetchOutcome { response: Some(response), source: ResponseSource::Network, cache_write }
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, navigation = request.is_navigation(), "network fetch failed");
                if !request.is_navigation() {
                    return FetchOutcome::immediate(None, ResponseSource::Failed);
                }
                self.offline_fallback().await
            }
        }
    }

    async fn offline_fallback(&self) -> FetchOutcome {
        let page = &self.settings.offline_page;
        match self.scope.db.match_entry(self.generation(), "GET", page).await {
            Ok(Some(entry)) => FetchOutcome::immediate(Some(entry.response), ResponseSource::OfflineFallback),
            Ok(None) => {
                tracing::warn!(offline_page = %page, "offline page not cached");
                FetchOutcome::immediate(None, ResponseSource::Failed)
            }
            Err(e) => {
                tracing::warn!(offline_page = %page, error = %e, "offline page lookup failed");
                FetchOutcome::immediate(None, ResponseSource::Failed)
            }
        }
    }
}
