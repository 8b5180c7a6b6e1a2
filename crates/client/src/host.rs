//! Headless host wiring shared by the server and CLI.
//!
//! There is no platform notification tray or browser window here, so
//! notifications and window requests are logged and kept in memory.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use portal_core::{AppConfig, CacheDb, Error};
use url::Url;

use crate::fetch::{FetchConfig, HttpNetwork, resolve};
use crate::worker::{
    ClientWindows, Notification, NotificationId, NotificationSurface, OfflineWorker, Registration, WorkerScope,
    WorkerSettings,
};

/// Notification surface that logs and tracks displayed notifications.
#[derive(Debug, Default)]
pub struct LoggingSurface {
    next_id: AtomicU64,
    displayed: Mutex<BTreeMap<u64, Notification>>,
}

impl LoggingSurface {
    /// Notifications shown and not yet closed, oldest first.
    pub fn displayed(&self) -> Vec<(NotificationId, Notification)> {
        self.displayed
            .lock()
            .map(|d| d.iter().map(|(id, n)| (NotificationId(*id), n.clone())).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSurface for LoggingSurface {
    async fn show(&self, notification: Notification) -> Result<NotificationId, Error> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(notification = id, title = %notification.title, body = %notification.body, "notification");
        self.displayed
            .lock()
            .map_err(|e| Error::NotificationFailed(e.to_string()))?
            .insert(id, notification);
        Ok(NotificationId(id))
    }

    async fn close(&self, id: NotificationId) -> Result<(), Error> {
        let removed = self
            .displayed
            .lock()
            .map_err(|e| Error::NotificationFailed(e.to_string()))?
            .remove(&id.0);
        match removed {
            Some(_) => Ok(()),
            None => Err(Error::NotificationFailed(format!("no notification with id {}", id.0))),
        }
    }
}

/// Client windows that log each open request.
#[derive(Debug, Default)]
pub struct LoggingWindows {
    opened: Mutex<Vec<Url>>,
}

impl LoggingWindows {
    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ClientWindows for LoggingWindows {
    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(url = %url, "open window");
        self.opened
            .lock()
            .map_err(|e| Error::ClientWindowFailed(e.to_string()))?
            .push(url.clone());
        Ok(())
    }
}

/// Configuration, collaborators and registration for one portal scope.
pub struct Host {
    config: AppConfig,
    scope: WorkerScope,
    registration: Registration,
}

impl Host {
    /// Open the store at `config.db_path` and use the real network.
    pub async fn open(config: AppConfig) -> Result<Self, Error> {
        let db = CacheDb::open(&config.db_path).await?;
        let network = HttpNetwork::new(FetchConfig::from_app_config(&config)?)?;
        let scope = WorkerScope {
            db,
            network: Arc::new(network),
            notifications: Arc::new(LoggingSurface::default()),
            clients: Arc::new(LoggingWindows::default()),
        };
        Self::with_scope(config, scope)
    }

    pub fn with_scope(config: AppConfig, scope: WorkerScope) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let registration = Registration::new(origin, scope.network.clone(), config.skip_waiting);
        Ok(Self { config, scope, registration })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.scope.db
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// A worker for the configured version, or for `cache_version` if given.
    pub fn worker(&self, cache_version: Option<&str>) -> Result<OfflineWorker, Error> {
        let settings = match cache_version {
            Some(version) => {
                let config = AppConfig { cache_version: version.to_string(), ..self.config.clone() };
                WorkerSettings::from_config(&config)?
            }
            None => WorkerSettings::from_config(&self.config)?,
        };
        Ok(OfflineWorker::new(settings, self.scope.clone()))
    }

    /// Reattach a worker for the generation the store has activated, even
    /// when the configured version has moved on since. Registering the
    /// configured version afterwards then runs as an update. Returns whether
    /// a worker was restored.
    pub async fn restore(&self) -> Result<bool, Error> {
        let Some(generation) = self.db().activated_generation().await? else {
            return Ok(false);
        };
        let settings = WorkerSettings::from_config(&self.config)?.for_generation(generation);
        self.registration.restore(OfflineWorker::new(settings, self.scope.clone())).await
    }

    /// Resolve a path or URL against the portal origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        let origin = self.config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        resolve(input, &origin).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }
}
