//! Install: populate the worker's generation from the precache manifest.

use futures_util::future::try_join_all;
use portal_core::{Error, Request, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use super::OfflineWorker;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub generation: String,
    /// Entries written.
    pub entries: usize,
}

impl OfflineWorker {
    /// Fetch every manifest URL and store them as one batch.
    ///
    /// Fetches run concurrently and the first failure aborts the install. The
    /// store is only touched after every response is in hand, and then in a
    /// single transaction, so a failed install leaves no trace.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let generation = self.generation().to_string();
        tracing::info!(generation = %generation, urls = self.settings.precache.len(), "installing");

        let batch = try_join_all(self.settings.precache.iter().map(|url| self.precache_one(url))).await;
        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(generation = %generation, error = %e, "install failed");
                return Err(e);
            }
        };

        let entries = self.scope.db.put_entries(&generation, &batch).await?;

        for tag in &self.settings.sync_tags {
            self.scope.db.register_sync(tag).await?;
        }

        tracing::info!(generation = %generation, entries, "installed");

        Ok(InstallReport { generation, entries })
    }

    async fn precache_one(&self, url: &Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url.clone());
        let response = self
            .scope
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;

        if !response.is_success() {
            return Err(Error::InstallFailed { url: url.to_string(), reason: format!("status {}", response.status) });
        }

        Ok((request, response))
    }
}
