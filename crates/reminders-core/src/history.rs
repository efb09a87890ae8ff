use crate::error::{ReminderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Past firing timestamps (epoch seconds) per task, each list sorted ascending.
///
/// On disk this is a plain JSON object of `task -> [timestamps]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiringHistory {
    entries: BTreeMap<String, Vec<i64>>,
}

impl FiringHistory {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    /// Load the history at `path`.
    ///
    /// A missing file is materialized as `{}` so that a first run and an empty
    /// history look the same afterwards. Timestamps are re-sorted on load since
    /// the file may have been edited by hand.
    pub fn load(path: &Path) -> Result<Self> {
        if crate::io::write_if_missing(path, b"{}")? {
            tracing::debug!(path = %path.display(), "created empty history file");
            return Ok(Self::new());
        }

        let data = std::fs::read(path)?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }

        let mut history: FiringHistory =
            serde_json::from_slice(&data).map_err(|e| ReminderError::StateCorruption {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        for stamps in history.entries.values_mut() {
            stamps.sort_unstable();
        }
        Ok(history)
    }

    /// Overwrite `path` with the full mapping.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // ---------------------------------------------------------------------------
    // Queries and mutations
    // ---------------------------------------------------------------------------

    /// `None` means the task has never been seen; `Some(&[])` means it has an
    /// entry with no firings.
    pub fn timestamps(&self, task: &str) -> Option<&[i64]> {
        self.entries.get(task).map(Vec::as_slice)
    }

    pub fn record_firing(&mut self, task: &str, timestamp: i64) {
        let stamps = self.entries.entry(task.to_string()).or_default();
        stamps.push(timestamp);
        stamps.sort_unstable();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
