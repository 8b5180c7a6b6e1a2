//! Background sync.

use portal_core::Error;

use super::OfflineWorker;

/// Tag for queued form submissions.
pub const SYNC_FORMS: &str = "sync-forms";

impl OfflineWorker {
    /// Run the handler for a sync tag. Returns false for tags without one.
    pub async fn sync(&self, tag: &str) -> Result<bool, Error> {
        if tag != SYNC_FORMS {
            tracing::debug!(tag, "ignoring sync tag");
            return Ok(false);
        }
        self.sync_forms().await?;
        Ok(true)
    }

    // TODO: replay drafts queued by the portal's form pages once they persist them
    // somewhere the worker can read.
    async fn sync_forms(&self) -> Result<(), Error> {
        tracing::info!(generation = %self.generation(), "syncing forms");
        Ok(())
    }
}
