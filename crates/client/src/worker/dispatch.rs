//! Event dispatch and completion tokens.
//!
//! Each lifecycle or functional event is routed to the handler registered for
//! its kind. The handler runs as its own tokio task and the host receives a
//! `WaitUntil` token; the event counts as resolved only once that token settles.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use portal_core::{Error, Request};
use tokio::task::JoinHandle;

use super::activate::ActivateReport;
use super::install::InstallReport;
use super::intercept::FetchOutcome;
use super::push::NotificationId;

/// Completion token for work the host must await before tearing down or
/// treating the triggering event as done.
pub struct WaitUntil<T> {
    state: Settle<T>,
}

enum Settle<T> {
    Ready(Result<T, Error>),
    Pending(JoinHandle<Result<T, Error>>),
}

impl<T: Send + 'static> WaitUntil<T> {
    /// Run `future` on the runtime and hand back its token.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, Error>> + Send + 'static,
    {
        Self { state: Settle::Pending(tokio::spawn(future)) }
    }
}

impl<T> WaitUntil<T> {
    /// A token that is already settled with `value`.
    pub fn ready(value: T) -> Self {
        Self { state: Settle::Ready(Ok(value)) }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            Settle::Ready(_) => true,
            Settle::Pending(handle) => handle.is_finished(),
        }
    }

    /// Wait for the work to finish.
    pub async fn settled(self) -> Result<T, Error> {
        match self.state {
            Settle::Ready(result) => result,
            Settle::Pending(handle) => handle.await.map_err(|e| Error::HandlerAborted(e.to_string()))?,
        }
    }
}

impl WaitUntil<()> {
    /// Nothing left to wait for.
    pub fn done() -> Self {
        Self::ready(())
    }
}

impl<T> fmt::Debug for WaitUntil<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitUntil")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Event kinds a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Push,
    NotificationClick,
    Sync,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Install,
        EventKind::Activate,
        EventKind::Fetch,
        EventKind::Push,
        EventKind::NotificationClick,
        EventKind::Sync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
            EventKind::Fetch => "fetch",
            EventKind::Push => "push",
            EventKind::NotificationClick => "notificationclick",
            EventKind::Sync => "sync",
        }
    }
}

/// An event delivered to the worker.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    /// Raw push payload bytes.
    Push(Vec<u8>),
    NotificationClick(NotificationId),
    /// Background sync tag.
    Sync(String),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Install => EventKind::Install,
            Event::Activate => EventKind::Activate,
            Event::Fetch(_) => EventKind::Fetch,
            Event::Push(_) => EventKind::Push,
            Event::NotificationClick(_) => EventKind::NotificationClick,
            Event::Sync(_) => EventKind::Sync,
        }
    }
}

/// What a handler produced.
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    Notified(NotificationId),
    WindowOpened,
    /// `handled` is false for tags with no handler.
    Synced { tag: String, handled: bool },
}

/// Handles events of the kinds it is registered for.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> Result<EventOutcome, Error>;
}

/// Routes events to registered handlers.
#[derive(Default, Clone)]
pub struct Dispatcher {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, returning the handler it replaces.
    pub fn register(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Option<Arc<dyn EventHandler>> {
        self.handlers.insert(kind, handler)
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Deliver an event and return its completion token.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoHandler` if nothing is registered for the event's kind.
    pub fn dispatch(&self, event: Event) -> Result<WaitUntil<EventOutcome>, Error> {
        let kind = event.kind();
        let handler = self
            .handlers
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::NoHandler(kind.as_str().to_string()))?;

        tracing::trace!(event = kind.as_str(), "dispatching event");

        Ok(WaitUntil::spawn(async move { handler.handle(event).await }))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        f.debug_struct("Dispatcher").field("handlers", &kinds).finish()
    }
}
