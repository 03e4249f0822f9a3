//! Connection settings and the YAML configuration file

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{CmkError, Result};

/// Connection parameters for a Check_MK site.
///
/// Immutable for the duration of a call; every client takes its own copy
/// instead of reading shared state.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Monitoring server host name
    pub server: String,
    /// OMD site name on that server
    pub site: String,
    /// Web-API user name
    pub user: String,
    /// Automation secret for that user
    pub apikey: String,
    /// Echo outbound requests (key masked) and raw responses
    pub debug: bool,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server", &self.server)
            .field("site", &self.site)
            .field("user", &self.user)
            .field("apikey", &"...")
            .field("debug", &self.debug)
            .finish()
    }
}

impl ConnectionConfig {
    /// Every request needs all four connection fields; reject early so no
    /// half-formed URL ever goes out.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("server", &self.server),
            ("site", &self.site),
            ("user", &self.user),
            ("apikey", &self.apikey),
        ] {
            if value.is_empty() {
                return Err(CmkError::InvalidParameter(format!("{name} is not set")));
            }
        }
        Ok(())
    }
}

/// Connection defaults read from the YAML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub apikey: Option<String>,
}

impl FileConfig {
    /// Merge file defaults with explicit overrides into a full
    /// [`ConnectionConfig`]. Overrides win.
    pub fn merge(
        &self,
        server: Option<String>,
        site: Option<String>,
        user: Option<String>,
        apikey: Option<String>,
        debug: bool,
    ) -> ConnectionConfig {
        ConnectionConfig {
            server: server.or_else(|| self.server.clone()).unwrap_or_default(),
            site: site.or_else(|| self.site.clone()).unwrap_or_default(),
            user: user.or_else(|| self.user.clone()).unwrap_or_default(),
            apikey: apikey.or_else(|| self.apikey.clone()).unwrap_or_default(),
            debug,
        }
    }
}

/// Load connection defaults from a YAML file.
///
/// An unreadable file and a file with broken syntax are distinct errors so
/// callers can tell "not set up yet" from "set up wrong".
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CmkError::ConfigRead(format!("{}: {}", path.display(), e)))?;
    let config: FileConfig =
        serde_yaml::from_str(&content).map_err(|e| CmkError::ConfigParse(e.to_string()))?;
    Ok(config)
}
