//! Configuration for the lobby TCP server.
//!
//! The server takes a single JSON config file with two required keys:
//!
//! ```json
//! { "port": 8020, "userDatabase": "~/users.json" }
//! ```
//!
//! Any problem here is fatal: the process must refuse to start before the
//! listener binds rather than run with a half-valid setup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Deserialize;

/// Valid listening ports: non-privileged TCP range.
pub const PORT_RANGE: std::ops::RangeInclusive<i64> = 1024..=65535;

/// Raw config shape; both keys are validated by hand so missing ones can
/// be reported together, the way operators expect.
#[derive(Debug, Deserialize)]
struct RawConfig {
    port: Option<i64>,
    #[serde(rename = "userDatabase")]
    user_database: Option<String>,
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to listen on.
    pub port: u16,

    /// Path of the user record store.
    pub user_database: PathBuf,
}

impl Config {
    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("server config {} cannot be read", path.display()))?;
        let raw: RawConfig =
            serde_json::from_str(&text).context("server config is not in a valid JSON format")?;

        let mut missing = Vec::new();
        if raw.port.is_none() {
            missing.push("port");
        }
        if raw.user_database.is_none() {
            missing.push("userDatabase");
        }
        if !missing.is_empty() {
            bail!("server config missing key(s): {}", missing.join(", "));
        }

        let port = raw.port.unwrap_or_default();
        if !PORT_RANGE.contains(&port) {
            bail!("port must be an integer in [1024, 65535], got {port}");
        }

        let user_database = expand_home(raw.user_database.unwrap_or_default());

        Ok(Config {
            port: port as u16,
            user_database,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// Expand a leading `~/` via `$HOME`, leaving other paths untouched.
fn expand_home(path: String) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
