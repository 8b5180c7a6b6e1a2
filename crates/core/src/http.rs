//! Request and response types exchanged between the host, the worker and the
//! cache store.
//!
//! Bodies are held fully in memory. Headers keep their original order and
//! casing; lookups are case-insensitive.

use serde::{Deserialize, Serialize};
use url::Url;

/// How the request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
}

/// An outgoing request seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// A `GET` sub-resource request.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::NoCors, headers: Vec::new() }
    }

    /// A `GET` top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::Navigate, headers: Vec::new() }
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// Response classification.
///
/// Only `Basic` responses can be inspected and therefore stored. Network
/// failures never produce a `Response`; they surface as a fetch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response.
    Basic,
    /// Cross-origin response.
    Opaque,
}

impl ResponseKind {
    /// Classify a response by comparing its URL with the portal origin.
    pub fn classify(response_url: &Url, origin: &Url) -> Self {
        if response_url.origin() == origin.origin() { ResponseKind::Basic } else { ResponseKind::Opaque }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Opaque => "opaque",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseKind::Basic),
            "opaque" => Some(ResponseKind::Opaque),
            _ => None,
        }
    }
}

/// A captured HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub kind: ResponseKind,
}

impl Response {
    /// True for a `200` same-origin response.
    pub fn is_cache_eligible(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
