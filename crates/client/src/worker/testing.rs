//! Test doubles for the worker's collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use portal_core::{AppConfig, CacheDb, Error, Request, Response, ResponseKind};
use url::Url;

use super::{ClientWindows, Notification, NotificationId, NotificationSurface, OfflineWorker, WorkerScope, WorkerSettings};
use crate::fetch::{FetchError, Network};

pub(crate) const ORIGIN: &str = "https://portal.test";

pub(crate) fn portal_config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), ..Default::default() }
}

pub(crate) fn portal_config_at(version: &str) -> AppConfig {
    AppConfig { cache_version: version.into(), ..portal_config() }
}

pub(crate) fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[derive(Clone)]
enum Route {
    Respond { status: u16, body: Vec<u8> },
    Fail,
}

/// Scripted network with a call counter.
#[derive(Default)]
pub(crate) struct MockNetwork {
    routes: Mutex<HashMap<String, Route>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl MockNetwork {
    pub(crate) fn respond(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Respond { status, body: body.as_bytes().to_vec() });
    }

    pub(crate) fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Fail);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network("offline".into()));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        let (status, body) = match route {
            Some(Route::Respond { status, body }) => (status, body),
            Some(Route::Fail) => return Err(FetchError::Network("connection refused".into())),
            None => (404, b"not found".to_vec()),
        };

        Ok(Response {
            url: request.url.clone(),
            status,
            status_text: if status == 200 { "OK".into() } else { String::new() },
            headers: vec![("content-type".into(), "text/plain".into())],
            body,
            kind: ResponseKind::classify(&request.url, &url(ORIGIN)),
        })
    }
}

/// Notification surface that records what it was asked to do.
#[derive(Default)]
pub(crate) struct RecordingSurface {
    next_id: AtomicU64,
    pub(crate) shown: Mutex<Vec<(NotificationId, Notification)>>,
    pub(crate) closed: Mutex<Vec<NotificationId>>,
}

#[async_trait]
impl NotificationSurface for RecordingSurface {
    async fn show(&self, notification: Notification) -> Result<NotificationId, Error> {
        let id = NotificationId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.shown.lock().unwrap().push((id, notification));
        Ok(id)
    }

    async fn close(&self, id: NotificationId) -> Result<(), Error> {
        self.closed.lock().unwrap().push(id);
        Ok(())
    }
}

/// Client windows that record opened URLs.
#[derive(Default)]
pub(crate) struct RecordingWindows {
    pub(crate) opened: Mutex<Vec<Url>>,
}

#[async_trait]
impl ClientWindows for RecordingWindows {
    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.opened.lock().unwrap().push(url.clone());
        Ok(())
    }
}

/// An in-memory store plus scripted collaborators.
pub(crate) struct Harness {
    pub(crate) db: CacheDb,
    pub(crate) network: Arc<MockNetwork>,
    pub(crate) surface: Arc<RecordingSurface>,
    pub(crate) windows: Arc<RecordingWindows>,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        Self {
            db: CacheDb::open_in_memory().await.unwrap(),
            network: Arc::new(MockNetwork::default()),
            surface: Arc::new(RecordingSurface::default()),
            windows: Arc::new(RecordingWindows::default()),
        }
    }

    pub(crate) fn scope(&self) -> WorkerScope {
        WorkerScope {
            db: self.db.clone(),
            network: self.network.clone(),
            notifications: self.surface.clone(),
            clients: self.windows.clone(),
        }
    }

    pub(crate) fn worker(&self, config: AppConfig) -> OfflineWorker {
        OfflineWorker::new(WorkerSettings::from_config(&config).unwrap(), self.scope())
    }

    /// Answer 200 for every URL in the default precache manifest.
    pub(crate) fn serve_manifest(&self) {
        let settings = WorkerSettings::from_config(&portal_config()).unwrap();
        for u in &settings.precache {
            self.network.respond(u.as_str(), 200, u.path());
        }
    }
}
