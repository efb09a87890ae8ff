//! Reminder catalog: the validated `(interval_days, task)` list for one run.
//!
//! Input is newline-delimited. Blank lines and lines starting with `#` are
//! skipped; every other line splits on its first comma into the interval and
//! the task text, both trimmed. There is no header row.

use crate::error::{Duplicate, ReminderError, Result};
use std::collections::HashMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ReminderSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSpec {
    pub interval_days: u64,
    pub task_name: String,
}

impl ReminderSpec {
    /// Per-check probability of an early firing.
    pub fn threshold(&self) -> f64 {
        1.0 / self.interval_days as f64
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    specs: Vec<ReminderSpec>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ReminderError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a whole catalog. Nothing is returned unless every
    /// record is valid.
    pub fn parse(content: &str) -> Result<Self> {
        let mut specs = Vec::new();
        for (record, (line, raw)) in records(content).enumerate() {
            specs.push(parse_record(record, line, raw)?);
        }
        if specs.is_empty() {
            return Err(ReminderError::EmptyCatalog);
        }
        check_unique(&specs)?;
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[ReminderSpec] {
        &self.specs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReminderSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a ReminderSpec;
    type IntoIter = std::slice::Iter<'a, ReminderSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Yields `(line_number, trimmed_line)` for every record line, 1-based.
fn records(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

fn parse_record(record: usize, line: usize, raw: &str) -> Result<ReminderSpec> {
    let Some((interval, task)) = raw.split_once(',') else {
        return Err(ReminderError::MalformedRecord { record, line });
    };

    let interval = interval.trim();
    let interval_days = match interval.parse::<i64>() {
        Ok(n) if n > 0 => n as u64,
        _ => {
            return Err(ReminderError::InvalidInterval {
                record,
                line,
                value: interval.to_string(),
            })
        }
    };

    let task_name = task.trim();
    if task_name.is_empty() {
        return Err(ReminderError::EmptyTaskName { record, line });
    }

    Ok(ReminderSpec {
        interval_days,
        task_name: task_name.to_string(),
    })
}

fn check_unique(specs: &[ReminderSpec]) -> Result<()> {
    let mut seen: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (i, spec) in specs.iter().enumerate() {
        let entry = seen.entry(spec.task_name.as_str()).or_default();
        if entry.is_empty() {
            order.push(spec.task_name.as_str());
        }
        entry.push(i);
    }

    let dups: Vec<Duplicate> = order
        .into_iter()
        .filter_map(|task| {
            let records = &seen[task];
            (records.len() > 1).then(|| Duplicate {
                task: task.to_string(),
                records: records.clone(),
            })
        })
        .collect();

    if dups.is_empty() {
        Ok(())
    } else {
        Err(ReminderError::DuplicateTasks(dups))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
