//! Offline worker for the documentation portal.
//!
//! ### Lifecycle
//! - **install**: fetch every precache URL, then write the generation in one
//!   transaction. Any failed fetch aborts the install and writes nothing.
//! - **activate**: delete every generation except the worker's own, then mark
//!   it current.
//!
//! ### Functional events
//! - **fetch**: cache, then network (storing eligible responses), then the
//!   offline page for navigations.
//! - **push**: `{title, body}` payload relayed to the notification surface.
//! - **notificationclick**: close the notification, open the portal root.
//! - **sync**: `sync-forms` placeholder.
//!
//! Handlers keep no state between invocations; everything shared lives in the
//! cache store.

pub mod activate;
pub mod dispatch;
pub mod install;
pub mod intercept;
pub mod push;
pub mod registration;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use portal_core::{AppConfig, CacheDb, Error};
use url::Url;

use crate::fetch::{Network, resolve};

pub use activate::ActivateReport;
pub use dispatch::{Dispatcher, Event, EventHandler, EventKind, EventOutcome, WaitUntil};
pub use install::InstallReport;
pub use intercept::{FetchOutcome, ResponseSource};
pub use push::{ClientWindows, Notification, NotificationData, NotificationId, NotificationSurface, PushMessage};
pub use registration::{RegisterOutcome, Registration, RegistrationStatus, WorkerState};

/// Resolved, immutable settings for one worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Generation this worker installs and serves from.
    pub generation: String,
    pub origin: Url,
    /// Precache manifest in declaration order.
    pub precache: Vec<Url>,
    pub offline_page: Url,
    pub notification_icon: Url,
    pub vibrate: Vec<u32>,
    pub open_url: Url,
    pub sync_tags: Vec<String>,
}

impl WorkerSettings {
    /// Resolve every configured URL against the portal origin.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resolve_one =
            |input: &str| resolve(input, &origin).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")));

        let precache = config
            .precache
            .iter()
            .map(|u| resolve_one(u))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            generation: config.generation_name(),
            offline_page: resolve_one(&config.offline_page)?,
            notification_icon: resolve_one(&config.notification_icon)?,
            open_url: resolve_one(&config.open_url)?,
            vibrate: config.vibrate.clone(),
            sync_tags: config.sync_tags.clone(),
            precache,
            origin,
        })
    }

    /// The same settings bound to another, already installed generation.
    pub fn for_generation(self, generation: impl Into<String>) -> Self {
        Self { generation: generation.into(), ..self }
    }
}

/// External collaborators available to the worker.
#[derive(Clone)]
pub struct WorkerScope {
    pub db: CacheDb,
    pub network: Arc<dyn Network>,
    pub notifications: Arc<dyn NotificationSurface>,
    pub clients: Arc<dyn ClientWindows>,
}

/// One version of the offline worker.
#[derive(Clone)]
pub struct OfflineWorker {
    settings: Arc<WorkerSettings>,
    scope: WorkerScope,
}

impl OfflineWorker {
    pub fn new(settings: WorkerSettings, scope: WorkerScope) -> Self {
        Self { settings: Arc::new(settings), scope }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn generation(&self) -> &str {
        &self.settings.generation
    }

    pub fn scope(&self) -> &WorkerScope {
        &self.scope
    }

    /// A dispatcher with this worker registered for every event kind.
    pub fn dispatcher(self: &Arc<Self>) -> Dispatcher {
        let mut dispatcher = Dispatcher::new();
        for kind in EventKind::ALL {
            dispatcher.register(kind, self.clone());
        }
        dispatcher
    }
}

impl std::fmt::Debug for OfflineWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineWorker")
            .field("generation", &self.settings.generation)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventHandler for OfflineWorker {
    async fn handle(&self, event: Event) -> Result<EventOutcome, Error> {
        match event {
            Event::Install => self.install().await.map(EventOutcome::Installed),
            Event::Activate => self.activate().await.map(EventOutcome::Activated),
            Event::Fetch(request) => Ok(EventOutcome::Fetched(self.fetch(request).await)),
            Event::Push(data) => self.push(&data).await.map(EventOutcome::Notified),
            Event::NotificationClick(id) => self.notification_click(id).await.map(|_| EventOutcome::WindowOpened),
            Event::Sync(tag) => {
                let handled = self.sync(&tag).await?;
                Ok(EventOutcome::Synced { tag, handled })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{Harness, portal_config, portal_config_at};

    #[test]
    fn test_settings_resolve_manifest() {
        let settings = WorkerSettings::from_config(&portal_config()).unwrap();
        assert_eq!(settings.generation, "irise-trust-portal-v1");
        assert_eq!(settings.precache.len(), 8);
        assert_eq!(settings.precache[0].as_str(), "https://portal.test/");
        assert_eq!(settings.precache[2].as_str(), "https://portal.test/css/style.css");
        assert_eq!(settings.precache[6].host_str(), Some("cdn.jsdelivr.net"));
        assert_eq!(settings.offline_page.as_str(), "https://portal.test/offline.html");
        assert_eq!(settings.open_url.as_str(), "https://portal.test/");
        assert_eq!(settings.notification_icon.as_str(), "https://portal.test/icon-192.png");
    }

    #[test]
    fn test_settings_for_installed_generation() {
        let settings = WorkerSettings::from_config(&portal_config_at("v2")).unwrap();
        let restored = settings.clone().for_generation("irise-trust-portal-v1");
        assert_eq!(restored.generation, "irise-trust-portal-v1");
        assert_eq!(restored.precache, settings.precache);
    }

    #[test]
    fn test_settings_reject_bad_manifest_entry() {
        let config = AppConfig { precache: vec!["ftp://portal.test/file".into()], ..portal_config() };
        assert!(matches!(WorkerSettings::from_config(&config), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_dispatcher_covers_every_kind() {
        let harness = Harness::new().await;
        let worker = Arc::new(harness.worker(portal_config()));
        let dispatcher = worker.dispatcher();
        for kind in EventKind::ALL {
            assert!(dispatcher.is_registered(kind));
        }
    }

    #[tokio::test]
    async fn test_install_and_fetch_through_dispatcher() {
        let harness = Harness::new().await;
        harness.serve_manifest();
        let worker = Arc::new(harness.worker(portal_config()));
        let dispatcher = worker.dispatcher();

        let outcome = dispatcher.dispatch(Event::Install).unwrap().settled().await.unwrap();
        assert!(matches!(outcome, EventOutcome::Installed(ref r) if r.entries == 8));

        harness.network.reset_calls();
        let request = portal_core::Request::get(Url::parse("https://portal.test/js/app.js").unwrap());
        let outcome = dispatcher.dispatch(Event::Fetch(request)).unwrap().settled().await.unwrap();
        match outcome {
            EventOutcome::Fetched(fetched) => assert_eq!(fetched.source, ResponseSource::Cache),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(harness.network.calls(), 0);
    }
}
