//! Configuration type definitions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Registered driver name to open (default: "spanner").
    #[serde(default = "default_spanner")]
    pub driver: String,

    /// Connection descriptor handed to the driver.
    pub connection: ConnectionConfig,
}

/// Connection descriptor for a Spanner database.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Full database path: `projects/<p>/instances/<i>/databases/<d>`.
    pub database: String,

    /// API endpoint (default: "https://spanner.googleapis.com").
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// OAuth2 bearer token. Falls back to `access_token_env` when unset.
    /// Never written back out.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Emulator `host:port`. When unset, `SPANNER_EMULATOR_HOST` is consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulator_host: Option<String>,

    /// Per-request timeout in seconds (default: 60).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ConnectionConfig {
    /// Descriptor for `database` with every other field at its default.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            endpoint: default_endpoint(),
            access_token: None,
            access_token_env: default_access_token_env(),
            emulator_host: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Manual Debug keeps the bearer token out of logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("database", &self.database)
            .field("endpoint", &self.endpoint)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("access_token_env", &self.access_token_env)
            .field("emulator_host", &self.emulator_host)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_spanner() -> String {
    "spanner".to_string()
}

fn default_endpoint() -> String {
    "https://spanner.googleapis.com".to_string()
}

fn default_access_token_env() -> String {
    "SPANNER_ACCESS_TOKEN".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}
