//! Client code for portal-offline.
//!
//! This crate provides the HTTP network pipeline and the offline worker
//! (install, activate, fetch interception, push relay, notification clicks,
//! background sync) and the headless host wiring shared by the server and CLI.

pub mod fetch;
pub mod host;
pub mod worker;

pub use fetch::{FetchConfig, FetchError, HttpNetwork, Network, resolve};
pub use host::{Host, LoggingSurface, LoggingWindows};

pub use worker::{
    ActivateReport, ClientWindows, Dispatcher, Event, EventHandler, EventKind, EventOutcome, FetchOutcome,
    InstallReport, Notification, NotificationId, NotificationSurface, OfflineWorker, PushMessage, RegisterOutcome,
    Registration, RegistrationStatus, ResponseSource, WaitUntil, WorkerScope, WorkerSettings, WorkerState,
};
