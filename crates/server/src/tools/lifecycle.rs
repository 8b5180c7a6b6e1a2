//! portal_install, portal_activate and portal_status.

use portal_client::{ActivateReport, Host, RegisterOutcome, RegistrationStatus, WorkerState};
use portal_core::{Error, Generation};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the portal_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PortalInstallParams {
    /// Install this cache version instead of the configured one.
    #[serde(default)]
    pub cache_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalInstallOutput {
    pub outcome: RegisterOutcome,
    pub state: WorkerState,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalActivateOutput {
    pub report: ActivateReport,
    pub state: WorkerState,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PortalStatusOutput {
    pub registration: RegistrationStatus,
    /// Generations present in the store, oldest first.
    pub generations: Vec<Generation>,
    pub sync_tags: Vec<String>,
}

pub async fn install_impl(host: &Host, params: PortalInstallParams) -> Result<CallToolResult, McpError> {
    if params.cache_version.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(Error::InvalidInput("cache_version cannot be empty".into()).into());
    }

    let worker = host.worker(params.cache_version.as_deref())?;
    let outcome = host.registration().register(worker).await?;
    let state = host.registration().state().await;

    json_result(&PortalInstallOutput { outcome, state })
}

pub async fn activate_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let report = host.registration().activate().await?;
    let state = host.registration().state().await;

    json_result(&PortalActivateOutput { report, state })
}

pub async fn status_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let output = PortalStatusOutput {
        registration: host.registration().status().await,
        generations: host.db().list_generations().await?,
        sync_tags: host.db().sync_tags().await?,
    };

    json_result(&output)
}
