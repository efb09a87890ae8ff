use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CATALOG_FILE: &str = "inputs.csv";
pub const DEFAULT_HISTORY_FILE: &str = "states.json";
pub const DEFAULT_MIN_DISPATCH_SPACING_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// RunOptions
// ---------------------------------------------------------------------------

/// Everything one run needs besides its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Upper bound of the random server-side delivery delay. 0 disables it.
    #[serde(default)]
    pub delivery_delay_secs: u64,
    #[serde(default = "default_min_spacing")]
    pub min_dispatch_spacing_secs: u64,
    #[serde(default)]
    pub verbose: bool,
    /// Push the catalog to the configured task list before evaluating.
    #[serde(default)]
    pub sync_task_list: bool,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from(DEFAULT_CATALOG_FILE)
}

fn default_history_path() -> PathBuf {
    PathBuf::from(DEFAULT_HISTORY_FILE)
}

fn default_min_spacing() -> u64 {
    DEFAULT_MIN_DISPATCH_SPACING_SECS
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            history_path: default_history_path(),
            delivery_delay_secs: 0,
            min_dispatch_spacing_secs: default_min_spacing(),
            verbose: false,
            sync_task_list: false,
        }
    }
}

impl RunOptions {
    pub fn min_dispatch_spacing(&self) -> Duration {
        Duration::from_secs(self.min_dispatch_spacing_secs)
    }
}

// ---------------------------------------------------------------------------
// CaldavConfig
// ---------------------------------------------------------------------------

pub const CALDAV_URL_VAR: &str = "CALDAV_TASKS_API_URL";
pub const CALDAV_USERNAME_VAR: &str = "CALDAV_TASKS_API_USERNAME";
pub const CALDAV_PASSWORD_VAR: &str = "CALDAV_TASKS_API_PASSWORD";
pub const CALDAV_LIST_UID_VAR: &str = "CALDAV_TASKS_API_LIST_UID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaldavConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Target collection. When unset the first collection on the server is used.
    pub list_uid: Option<String>,
}

impl CaldavConfig {
    /// Read the `CALDAV_TASKS_API_*` variables. Returns `None` when no URL is
    /// configured.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            url: get(CALDAV_URL_VAR)?,
            username: get(CALDAV_USERNAME_VAR),
            password: get(CALDAV_PASSWORD_VAR),
            list_uid: get(CALDAV_LIST_UID_VAR),
        })
    }
}
