//! Host-side registration: which worker version is installing, waiting or
//! active for the portal scope.
//!
//! The state is derived from the occupied slots:
//!
//! | slots                          | state         |
//! |--------------------------------|---------------|
//! | none                           | `Uninstalled` |
//! | installing, no active          | `Installing`  |
//! | waiting, no active/installing  | `Waiting`     |
//! | active only                    | `Active`      |
//! | active + installing or waiting | `Updating`    |

use std::sync::Arc;

use portal_core::{Error, Request};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use super::{
    ActivateReport, Dispatcher, Event, EventOutcome, FetchOutcome, InstallReport, NotificationId, OfflineWorker,
    ResponseSource,
};
use crate::fetch::Network;

/// Lifecycle state of the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Uninstalled,
    Installing,
    Waiting,
    /// Serving fetches.
    Active,
    /// Serving fetches while a newer version installs or waits.
    Updating,
}

/// Result of `Registration::register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// The generation is already active or waiting; nothing was installed.
    Unchanged { generation: String },
    /// Installed and waiting for the active version to be replaced.
    Waiting { install: InstallReport },
    /// Installed and activated straight away.
    Activated { install: InstallReport, activate: ActivateReport },
}

/// Snapshot of the registration for hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RegistrationStatus {
    pub scope: String,
    pub state: WorkerState,
    pub installing: Option<String>,
    pub waiting: Option<String>,
    pub active: Option<String>,
}

#[derive(Clone)]
struct Slot {
    worker: Arc<OfflineWorker>,
    dispatcher: Dispatcher,
}

impl Slot {
    fn new(worker: OfflineWorker) -> Self {
        let worker = Arc::new(worker);
        let dispatcher = worker.dispatcher();
        Self { worker, dispatcher }
    }

    fn generation(&self) -> &str {
        self.worker.generation()
    }

    async fn run(&self, event: Event) -> Result<EventOutcome, Error> {
        self.dispatcher.dispatch(event)?.settled().await
    }
}

#[derive(Default)]
struct Slots {
    installing: Option<Slot>,
    waiting: Option<Slot>,
    active: Option<Slot>,
}

impl Slots {
    fn state(&self) -> WorkerState {
        match (&self.installing, &self.waiting, &self.active) {
            (None, None, None) => WorkerState::Uninstalled,
            (_, _, Some(_)) if self.installing.is_some() || self.waiting.is_some() => WorkerState::Updating,
            (_, _, Some(_)) => WorkerState::Active,
            (Some(_), _, None) => WorkerState::Installing,
            (None, Some(_), None) => WorkerState::Waiting,
        }
    }

    fn holds(&self, generation: &str) -> bool {
        [&self.waiting, &self.active]
            .into_iter()
            .flatten()
            .any(|slot| slot.generation() == generation)
    }
}

fn unexpected(outcome: EventOutcome) -> Error {
    Error::HandlerAborted(format!("unexpected outcome: {outcome:?}"))
}

/// Worker slots for one scope.
pub struct Registration {
    scope: Url,
    network: Arc<dyn Network>,
    skip_waiting: bool,
    slots: RwLock<Slots>,
}

impl Registration {
    /// `network` serves requests while no worker is active.
    pub fn new(scope: Url, network: Arc<dyn Network>, skip_waiting: bool) -> Self {
        Self { scope, network, skip_waiting, slots: RwLock::new(Slots::default()) }
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub async fn state(&self) -> WorkerState {
        self.slots.read().await.state()
    }

    pub async fn status(&self) -> RegistrationStatus {
        let slots = self.slots.read().await;
        let name = |slot: &Option<Slot>| slot.as_ref().map(|s| s.generation().to_string());
        RegistrationStatus {
            scope: self.scope.to_string(),
            state: slots.state(),
            installing: name(&slots.installing),
            waiting: name(&slots.waiting),
            active: name(&slots.active),
        }
    }

    pub async fn active_generation(&self) -> Option<String> {
        self.slots
            .read()
            .await
            .active
            .as_ref()
            .map(|s| s.generation().to_string())
    }

    /// Make `worker` active without reinstalling if the store already holds
    /// its generation as the activated one. Returns whether it did.
    pub async fn restore(&self, worker: OfflineWorker) -> Result<bool, Error> {
        let activated = worker.scope().db.activated_generation().await?;
        if activated.as_deref() != Some(worker.generation()) {
            return Ok(false);
        }

        let mut slots = self.slots.write().await;
        tracing::info!(generation = %worker.generation(), "restored active worker");
        slots.active = Some(Slot::new(worker));
        Ok(true)
    }

    /// Install `worker` unless its generation is already active or waiting.
    ///
    /// On success the worker waits for `activate` while an older version is
    /// active. A first install, or one on a registration that skips waiting,
    /// is activated at once. On failure the worker is discarded and the active
    /// worker, if any, keeps serving.
    pub async fn register(&self, worker: OfflineWorker) -> Result<RegisterOutcome, Error> {
        let generation = worker.generation().to_string();

        let slot = {
            let mut slots = self.slots.write().await;
            if slots.holds(&generation) {
                tracing::debug!(generation = %generation, "generation already registered");
                return Ok(RegisterOutcome::Unchanged { generation });
            }
            if let Some(installing) = &slots.installing {
                return Err(Error::InvalidInput(format!("{} is already installing", installing.generation())));
            }
            let slot = Slot::new(worker);
            slots.installing = Some(slot.clone());
            tracing::info!(generation = %generation, state = ?slots.state(), "install started");
            slot
        };

        let result = slot.run(Event::Install).await;

        let install = {
            let mut slots = self.slots.write().await;
            slots.installing = None;
            match result {
                Ok(EventOutcome::Installed(report)) => {
                    if let Some(previous) = slots.waiting.replace(slot) {
                        tracing::info!(generation = %previous.generation(), "waiting worker superseded");
                    }
                    report
                }
                Ok(other) => return Err(unexpected(other)),
                Err(e) => {
                    tracing::warn!(generation = %generation, state = ?slots.state(), error = %e, "install failed");
                    return Err(e);
                }
            }
        };

        let first = self.slots.read().await.active.is_none();
        if !first && !self.skip_waiting {
            return Ok(RegisterOutcome::Waiting { install });
        }

        let activate = self.activate().await?;
        Ok(RegisterOutcome::Activated { install, activate })
    }

    /// Promote the waiting worker and clean up stale generations.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let slot = self
            .slots
            .write()
            .await
            .waiting
            .take()
            .ok_or_else(|| Error::InvalidInput("no waiting worker to activate".into()))?;

        let result = slot.run(Event::Activate).await;

        let mut slots = self.slots.write().await;
        match result {
            Ok(EventOutcome::Activated(report)) => {
                slots.active = Some(slot);
                Ok(report)
            }
            Ok(other) => {
                if slots.waiting.is_none() {
                    slots.waiting = Some(slot);
                }
                Err(unexpected(other))
            }
            Err(e) => {
                tracing::warn!(generation = %slot.generation(), error = %e, "activation failed");
                if slots.waiting.is_none() {
                    slots.waiting = Some(slot);
                }
                Err(e)
            }
        }
    }

    async fn active(&self) -> Result<Slot, Error> {
        self.slots
            .read()
            .await
            .active
            .clone()
            .ok_or_else(|| Error::NoActiveWorker(self.scope.to_string()))
    }

    /// Route a request through the active worker, or straight to the network
    /// when none is active.
    pub async fn fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        let active = self.slots.read().await.active.clone();
        let Some(slot) = active else {
            return Ok(match self.network.fetch(&request).await {
                Ok(response) => FetchOutcome::immediate(Some(response), ResponseSource::Network),
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "uncontrolled fetch failed");
                    FetchOutcome::immediate(None, ResponseSource::Failed)
                }
            });
        };

        match slot.run(Event::Fetch(request)).await? {
            EventOutcome::Fetched(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    pub async fn push(&self, data: Vec<u8>) -> Result<NotificationId, Error> {
        match self.active().await?.run(Event::Push(data)).await? {
            EventOutcome::Notified(id) => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    pub async fn notification_click(&self, id: NotificationId) -> Result<(), Error> {
        match self.active().await?.run(Event::NotificationClick(id)).await? {
            EventOutcome::WindowOpened => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Returns whether the tag had a handler.
    pub async fn sync(&self, tag: &str) -> Result<bool, Error> {
        match self.active().await?.run(Event::Sync(tag.to_string())).await? {
            EventOutcome::Synced { handled, .. } => Ok(handled),
            other => Err(unexpected(other)),
        }
    }
}
