//! Activate: garbage-collect superseded generations.

use futures_util::future::join_all;
use portal_core::Error;
use serde::{Deserialize, Serialize};

use super::OfflineWorker;

/// Result of an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub generation: String,
    /// Stale generations removed.
    pub deleted: Vec<String>,
    /// Stale generations that could not be removed.
    pub failed: Vec<String>,
}

impl OfflineWorker {
    /// Delete every generation other than this worker's and mark it current.
    ///
    /// Deletions are independent: one failing does not stop the others and
    /// does not fail the activation. Nothing is deleted unless this worker's
    /// generation is installed.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let generation = self.generation().to_string();
        let db = &self.scope.db;

        if !db.has_generation(&generation).await? {
            return Err(Error::UnknownGeneration(generation));
        }

        let stale: Vec<String> = db
            .generation_names()
            .await?
            .into_iter()
            .filter(|name| name != &generation)
            .collect();

        let results = join_all(stale.iter().map(|name| db.delete_generation(name))).await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(_) => deleted.push(name),
                Err(e) => {
                    tracing::warn!(generation = %name, error = %e, "failed to delete stale generation");
                    failed.push(name);
                }
            }
        }

        db.mark_activated(&generation).await?;

        tracing::info!(generation = %generation, deleted = deleted.len(), failed = failed.len(), "activated");

        Ok(ActivateReport { generation, deleted, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::ResponseSource;
    use crate::worker::testing::{Harness, portal_config, portal_config_at, url};
    use portal_core::{CacheDb, Request};

    #[tokio::test]
    async fn test_activate_removes_other_generations() {
        let harness = Harness::new().await;
        harness.serve_manifest();
        harness.db.open_generation("irise-trust-portal-v0").await.unwrap();
        harness.db.open_generation("some-other-cache").await.unwrap();

        let worker = harness.worker(portal_config());
        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();

        assert_eq!(report.generation, "irise-trust-portal-v1");
        assert_eq!(report.deleted.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(harness.db.generation_names().await.unwrap(), vec!["irise-trust-portal-v1".to_string()]);
        assert_eq!(harness.db.activated_generation().await.unwrap().as_deref(), Some("irise-trust-portal-v1"));
    }

    #[tokio::test]
    async fn test_version_bump_invalidates_previous_entries() {
        let harness = Harness::new().await;
        harness.serve_manifest();

        let v1 = harness.worker(portal_config());
        v1.install().await.unwrap();
        v1.activate().await.unwrap();

        let v2 = harness.worker(portal_config_at("v2"));
        v2.install().await.unwrap();
        let report = v2.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["irise-trust-portal-v1".to_string()]);
        assert_eq!(harness.db.count_entries("irise-trust-portal-v1").await.unwrap(), 0);
        assert_eq!(harness.db.count_entries("irise-trust-portal-v2").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_activate_without_install_fails() {
        let harness = Harness::new().await;
        harness.serve_manifest();
        let live = harness.worker(portal_config());
        live.install().await.unwrap();
        live.activate().await.unwrap();
        harness.db.open_generation("some-other-cache").await.unwrap();

        let result = harness.worker(portal_config_at("v2")).activate().await;

        assert!(matches!(result, Err(Error::UnknownGeneration(ref name)) if name == "irise-trust-portal-v2"));
        let mut remaining = harness.db.generation_names().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["irise-trust-portal-v1".to_string(), "some-other-cache".to_string()]);
        assert_eq!(harness.db.activated_generation().await.unwrap().as_deref(), Some("irise-trust-portal-v1"));
    }

    #[tokio::test]
    async fn test_late_write_from_superseded_worker_is_dropped() {
        let harness = Harness::new().await;
        harness.serve_manifest();
        harness.network.respond("https://portal.test/late.html", 200, "late");

        let v1 = harness.worker(portal_config());
        v1.install().await.unwrap();
        v1.activate().await.unwrap();

        let v2 = harness.worker(portal_config_at("v2"));
        v2.install().await.unwrap();
        v2.activate().await.unwrap();

        let outcome = v1.fetch(Request::get(url("https://portal.test/late.html"))).await;
        assert_eq!(outcome.source, ResponseSource::Network);
        let write = outcome.cache_write.settled().await;

        assert!(matches!(write, Err(Error::UnknownGeneration(_))));
        assert_eq!(harness.db.generation_names().await.unwrap(), vec!["irise-trust-portal-v2".to_string()]);
        assert_eq!(harness.db.count_entries("irise-trust-portal-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_deletion_does_not_stop_the_others() {
        let path = std::env::temp_dir().join(format!(
            "portal-activate-{}-{}.sqlite",
            std::process::id(),
            std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
        ));

        let mut harness = Harness::new().await;
        harness.db = CacheDb::open(&path).await.unwrap();
        harness.serve_manifest();
        for name in ["irise-trust-portal-v0", "pinned", "some-other-cache"] {
            harness.db.open_generation(name).await.unwrap();
        }

        // A second connection installs a trigger that refuses to drop one generation.
        let side = tokio_rusqlite::Connection::open(&path).await.unwrap();
        side.call(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER keep_pinned BEFORE DELETE ON generations
                 WHEN old.name = 'pinned'
                 BEGIN SELECT RAISE(ABORT, 'pinned generation'); END;",
            )
        })
        .await
        .unwrap();

        let worker = harness.worker(portal_config());
        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();

        assert_eq!(report.failed, vec!["pinned".to_string()]);
        assert_eq!(report.deleted.len(), 2);
        let mut remaining = harness.db.generation_names().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["irise-trust-portal-v1".to_string(), "pinned".to_string()]);
        assert_eq!(harness.db.activated_generation().await.unwrap().as_deref(), Some("irise-trust-portal-v1"));

        drop(side);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
