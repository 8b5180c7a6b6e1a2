//! Command-line interface parsing for portal-offline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Offline cache manager for the documentation portal
#[derive(Parser, Debug)]
#[command(name = "portal-offline")]
#[command(about = "Install, activate and inspect the portal's offline cache")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Cache database path (overrides PORTAL_OFFLINE_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show registration state and stored generations
    Status,

    /// Precache the manifest into a new generation
    Install {
        /// Cache version to install instead of the configured one
        #[arg(long = "cache-version", value_name = "VERSION")]
        cache_version: Option<String>,
    },

    /// Install if needed, then make the version current and drop the others
    Activate {
        /// Cache version to activate instead of the configured one
        #[arg(long = "cache-version", value_name = "VERSION")]
        cache_version: Option<String>,
    },

    /// Fetch a URL or portal path through the offline worker
    Fetch {
        url: String,

        /// Treat the request as a page navigation
        #[arg(long)]
        navigate: bool,

        #[arg(long, default_value = "GET")]
        method: String,
    },

    /// Deliver a push payload, e.g. '{"title":"Deadline","body":"Review due"}'
    Push { payload: String },

    /// Fire a background sync event
    Sync {
        #[arg(default_value = "sync-forms")]
        tag: String,
    },

    /// List request URLs stored in a generation (default: the active one)
    Keys { generation: Option<String> },
}
