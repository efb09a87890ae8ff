//! One pass over the catalog: evaluate, dispatch, record, persist.
//!
//! Phases advance `Init -> CatalogLoaded -> HistoryLoaded -> (Evaluating ->
//! Dispatching -> Recording)* -> Done`. The first error stops the pass;
//! history for tasks already processed is on disk by then.

use crate::caldav::TaskListSink;
use crate::catalog::{Catalog, ReminderSpec};
use crate::clock::{Clock, RandomSource};
use crate::config::RunOptions;
use crate::dispatch::{self, Dispatcher};
use crate::eligibility::{self, EligibilityDecision, Reason};
use crate::error::{ReminderError, Result};
use crate::history::FiringHistory;
use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// RunPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    CatalogLoaded,
    HistoryLoaded,
    Evaluating(usize),
    Dispatching(usize),
    Recording(usize),
    Done,
    Failed,
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub task: String,
    pub reason: Reason,
    pub fired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fired_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<TaskOutcome>,
    /// Set when the task-list sync failed; the pass still ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_error: Option<String>,
}

impl RunSummary {
    pub fn fired(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.fired)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<D, C, R> {
    options: RunOptions,
    dispatcher: D,
    clock: C,
    rng: R,
    sink: Option<Box<dyn TaskListSink>>,
    phase: RunPhase,
    last_dispatch: Option<DateTime<Utc>>,
}

impl<D: Dispatcher, C: Clock, R: RandomSource> Orchestrator<D, C, R> {
    pub fn new(options: RunOptions, dispatcher: D, clock: C, rng: R) -> Self {
        Self {
            options,
            dispatcher,
            clock,
            rng,
            sink: None,
            phase: RunPhase::Init,
            last_dispatch: None,
        }
    }

    /// Enable the task-list sync. Only used when `options.sync_task_list` is set.
    pub fn with_task_list(mut self, sink: Box<dyn TaskListSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::trace!(?phase, "run phase");
        self.phase = phase;
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        let result = self.run_inner();
        self.enter(if result.is_ok() {
            RunPhase::Done
        } else {
            RunPhase::Failed
        });
        result
    }

    fn run_inner(&mut self) -> Result<RunSummary> {
        self.enter(RunPhase::Init);
        let catalog = Catalog::load(&self.options.catalog_path)?;
        self.enter(RunPhase::CatalogLoaded);
        tracing::debug!(reminders = catalog.len(), "catalog loaded");

        let mut history = FiringHistory::load(&self.options.history_path)?;
        self.enter(RunPhase::HistoryLoaded);
        tracing::debug!(tasks = history.len(), "history loaded");

        let mut summary = RunSummary::default();
        if self.options.sync_task_list {
            if let Err(e) = self.sync_task_list(&catalog) {
                tracing::warn!(error = %e, "task-list sync failed");
                self.notify_best_effort(&dispatch::integration_error_title(&e), &e.to_string());
                summary.integration_error = Some(e.to_string());
            }
        }

        for (i, spec) in catalog.iter().enumerate() {
            self.enter(RunPhase::Evaluating(i));
            let now = self.clock.now().timestamp();
            let decision = eligibility::evaluate(
                spec,
                history.timestamps(&spec.task_name),
                now,
                &mut self.rng,
            );
            tracing::debug!(
                task = %spec.task_name,
                reason = %decision.reason,
                context = %decision.display_context,
                "evaluated"
            );

            let fired_at = if decision.should_fire {
                Some(self.fire(i, spec, &decision, &mut history)?)
            } else {
                None
            };
            summary.outcomes.push(TaskOutcome {
                task: spec.task_name.clone(),
                reason: decision.reason,
                fired: decision.should_fire,
                fired_at,
            });
        }
        Ok(summary)
    }

    fn fire(
        &mut self,
        index: usize,
        spec: &ReminderSpec,
        decision: &EligibilityDecision,
        history: &mut FiringHistory,
    ) -> Result<i64> {
        self.enter(RunPhase::Dispatching(index));
        let body = decision.notification_body(self.options.verbose);
        self.dispatch(&dispatch::reminder_title(&spec.task_name), &body)?;

        self.enter(RunPhase::Recording(index));
        let at = self.clock.now().timestamp();
        history.record_firing(&spec.task_name, at);
        history.save(&self.options.history_path)?;
        tracing::info!(task = %spec.task_name, reason = %decision.reason, "reminder fired");
        Ok(at)
    }

    fn sync_task_list(&mut self, catalog: &Catalog) -> Result<()> {
        // Callers warn when the sink could not be configured.
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        for spec in catalog {
            let id = sink.add_task(spec)?;
            tracing::debug!(task = %spec.task_name, id = %id, "task-list entry created");
        }
        Ok(())
    }

    /// Rate-limited send. Sleeps whatever remains of the minimum spacing since
    /// the previous dispatch of this run.
    fn dispatch(&mut self, title: &str, body: &str) -> Result<()> {
        let spacing = self.options.min_dispatch_spacing();
        if let Some(last) = self.last_dispatch {
            let elapsed = (self.clock.now() - last).to_std().unwrap_or_default();
            if elapsed < spacing {
                let wait = spacing - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "spacing out notifications");
                self.clock.sleep(wait);
            }
        }
        let now = self.clock.now();
        self.last_dispatch = Some(now);
        let scheduled_at = self.scheduled_at(now);
        self.dispatcher.send(title, body, scheduled_at)
    }

    fn scheduled_at(&mut self, now: DateTime<Utc>) -> Option<i64> {
        match self.options.delivery_delay_secs {
            0 => None,
            max => {
                let offset = (self.rng.next_f64() * max as f64) as i64;
                Some(now.timestamp() + offset)
            }
        }
    }

    fn notify_best_effort(&mut self, title: &str, body: &str) {
        if let Err(e) = self.dispatch(title, body) {
            tracing::warn!(error = %e, title, "could not deliver failure notification");
        }
    }

    /// Report a failed run through the notification channel. Validation errors
    /// are only reported by exit status. Never fails.
    pub fn report_failure(&mut self, err: &ReminderError) {
        if err.is_validation() {
            return;
        }
        self.notify_best_effort(&dispatch::error_title(err), &err.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
