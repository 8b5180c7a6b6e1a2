//! Subcommand execution. Every command prints one JSON document.

use anyhow::{Context, Result, bail};
use portal_client::Host;
use portal_core::Request;
use serde_json::{Value, json};

use crate::cli::Command;

pub async fn run(host: &Host, command: Command) -> Result<Value> {
    match command {
        Command::Status => status(host).await,
        Command::Install { cache_version } => install(host, cache_version.as_deref()).await,
        Command::Activate { cache_version } => activate(host, cache_version.as_deref()).await,
        Command::Fetch { url, navigate, method } => fetch(host, &url, navigate, &method).await,
        Command::Push { payload } => {
            let id = host.registration().push(payload.into_bytes()).await?;
            Ok(json!({ "notification": id.0 }))
        }
        Command::Sync { tag } => {
            let handled = host.registration().sync(&tag).await?;
            Ok(json!({ "tag": tag, "handled": handled }))
        }
        Command::Keys { generation } => keys(host, generation).await,
    }
}

async fn status(host: &Host) -> Result<Value> {
    let registration = host.registration().status().await;
    let generations = host.db().list_generations().await?;
    let sync_tags = host.db().sync_tags().await?;
    Ok(json!({ "registration": registration, "generations": generations, "sync_tags": sync_tags }))
}

async fn install(host: &Host, cache_version: Option<&str>) -> Result<Value> {
    let outcome = host.registration().register(host.worker(cache_version)?).await?;
    Ok(serde_json::to_value(outcome)?)
}

/// Each invocation is a fresh process, so a version installed here cannot be
/// left waiting for a later `activate`; it is promoted in the same run.
async fn activate(host: &Host, cache_version: Option<&str>) -> Result<Value> {
    let registration = host.registration();
    let outcome = registration.register(host.worker(cache_version)?).await?;

    let activated = match registration.status().await.waiting {
        Some(_) => Some(registration.activate().await?),
        None => None,
    };

    Ok(json!({ "register": outcome, "activate": activated }))
}

async fn fetch(host: &Host, url: &str, navigate: bool, method: &str) -> Result<Value> {
    let url = host.resolve(url)?;
    let mut request = if navigate { Request::navigate(url) } else { Request::get(url) };
    request.method = method.to_ascii_uppercase();
    let requested = request.url.to_string();

    let outcome = host.registration().fetch(request).await?;
    // Settle the background store before the process exits.
    outcome
        .cache_write
        .settled()
        .await
        .context("storing the response failed")?;

    let Some(response) = outcome.response else {
        return Ok(json!({ "url": requested, "source": outcome.source, "status": null }));
    };

    Ok(json!({
        "url": requested,
        "source": outcome.source,
        "status": response.status,
        "content_type": response.content_type(),
        "bytes": response.body.len(),
        "body": String::from_utf8_lossy(&response.body),
    }))
}

async fn keys(host: &Host, generation: Option<String>) -> Result<Value> {
    let generation = match generation {
        Some(name) => name,
        None => match host.registration().active_generation().await {
            Some(active) => active,
            None => host.config().generation_name(),
        },
    };

    if !host.db().has_generation(&generation).await? {
        bail!("no generation named {generation}");
    }

    let urls = host.db().entry_urls(&generation).await?;
    Ok(json!({ "generation": generation, "urls": urls }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use portal_client::{FetchError, LoggingSurface, LoggingWindows, Network, WorkerScope};
    use portal_core::{AppConfig, CacheDb, Response, ResponseKind};

    use super::*;

    const ORIGIN: &str = "https://portal.test";

    #[derive(Default)]
    struct EchoNetwork {
        offline: AtomicBool,
    }

    #[async_trait]
    impl Network for EchoNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(FetchError::Network("offline".into()));
            }
            Ok(Response {
                url: request.url.clone(),
                status: 200,
                status_text: "OK".into(),
                headers: vec![("content-type".into(), "text/html".into())],
                body: request.url.path().as_bytes().to_vec(),
                kind: ResponseKind::Basic,
            })
        }
    }

    async fn host(db: CacheDb, network: Arc<EchoNetwork>) -> Host {
        let scope = WorkerScope {
            db,
            network,
            notifications: Arc::new(LoggingSurface::default()),
            clients: Arc::new(LoggingWindows::default()),
        };
        Host::with_scope(AppConfig { origin: ORIGIN.into(), ..Default::default() }, scope).unwrap()
    }

    #[tokio::test]
    async fn test_activate_then_keys() {
        let host = host(CacheDb::open_in_memory().await.unwrap(), Arc::default()).await;

        let activated = run(&host, Command::Activate { cache_version: None }).await.unwrap();
        assert_eq!(activated["register"]["outcome"], "activated");

        let keys = run(&host, Command::Keys { generation: None }).await.unwrap();
        assert_eq!(keys["generation"], "irise-trust-portal-v1");
        assert_eq!(keys["urls"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_activate_new_version_in_one_run() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = host(db.clone(), Arc::default()).await;
        run(&first, Command::Activate { cache_version: None }).await.unwrap();

        let second = host(db.clone(), Arc::default()).await;
        assert!(second.restore().await.unwrap());
        let value = run(&second, Command::Activate { cache_version: Some("v2".into()) })
            .await
            .unwrap();

        assert_eq!(value["register"]["outcome"], "waiting");
        assert_eq!(value["activate"]["generation"], "irise-trust-portal-v2");
        assert_eq!(db.generation_names().await.unwrap(), vec!["irise-trust-portal-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_stores_before_returning() {
        let network = Arc::new(EchoNetwork::default());
        let host = host(CacheDb::open_in_memory().await.unwrap(), network.clone()).await;
        run(&host, Command::Activate { cache_version: None }).await.unwrap();

        let fetch = |url: &str| Command::Fetch { url: url.into(), navigate: false, method: "GET".into() };

        let first = run(&host, fetch("/guide/onboarding.html")).await.unwrap();
        assert_eq!(first["source"], "network");

        network.offline.store(true, Ordering::SeqCst);
        let second = run(&host, fetch("/guide/onboarding.html")).await.unwrap();
        assert_eq!(second["source"], "cache");
        assert_eq!(second["body"], "/guide/onboarding.html");
    }

    #[tokio::test]
    async fn test_keys_unknown_generation() {
        let host = host(CacheDb::open_in_memory().await.unwrap(), Arc::default()).await;
        assert!(run(&host, Command::Keys { generation: Some("nope".into()) }).await.is_err());
    }
}
