use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A task name that appears on more than one catalog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub task: String,
    /// Zero-based record indices (blank and comment lines are not records).
    pub records: Vec<usize>,
}

impl fmt::Display for Duplicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let records: Vec<String> = self.records.iter().map(|r| r.to_string()).collect();
        write!(f, "'{}' (records {})", self.task, records.join(", "))
    }
}

fn join_duplicates(dups: &[Duplicate]) -> String {
    dups.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("notification channel identifier is empty")]
    MissingChannel,

    #[error("cannot read catalog {}: {source}", path.display())]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog contains no reminders")]
    EmptyCatalog,

    #[error("record {record} (line {line}): expected '<interval_days>,<task>'")]
    MalformedRecord { record: usize, line: usize },

    #[error("record {record} (line {line}): interval must be a positive integer, got '{value}'")]
    InvalidInterval {
        record: usize,
        line: usize,
        value: String,
    },

    #[error("record {record} (line {line}): task text is empty")]
    EmptyTaskName { record: usize, line: usize },

    #[error("duplicate reminder texts: {}", join_duplicates(.0))]
    DuplicateTasks(Vec<Duplicate>),

    #[error("history file {} is corrupt: {reason}", path.display())]
    StateCorruption { path: PathBuf, reason: String },

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("task-list integration failed: {0}")]
    Integration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ReminderError {
    /// Validation failures abort before any dispatch and are never reported
    /// through the notification channel.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ReminderError::MissingChannel
                | ReminderError::CatalogRead { .. }
                | ReminderError::EmptyCatalog
                | ReminderError::MalformedRecord { .. }
                | ReminderError::InvalidInterval { .. }
                | ReminderError::EmptyTaskName { .. }
                | ReminderError::DuplicateTasks(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ReminderError>;
