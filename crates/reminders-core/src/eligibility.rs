use crate::catalog::ReminderSpec;
use crate::clock::RandomSource;
use serde::Serialize;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    FirstRun,
    IntervalElapsed,
    ProbabilisticHit,
    NotDue,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Reason::FirstRun => "first_run",
            Reason::IntervalElapsed => "interval_elapsed",
            Reason::ProbabilisticHit => "probabilistic_hit",
            Reason::NotDue => "not_due",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityDecision {
    pub should_fire: bool,
    pub reason: Reason,
    /// Human-readable explanation. Only ever shown to the user.
    pub display_context: String,
}

impl EligibilityDecision {
    fn fire(reason: Reason, display_context: String) -> Self {
        Self {
            should_fire: true,
            reason,
            display_context,
        }
    }

    fn skip(display_context: String) -> Self {
        Self {
            should_fire: false,
            reason: Reason::NotDue,
            display_context,
        }
    }

    /// Notification body for a fired decision. Probabilistic hits only carry
    /// their chance/threshold detail when `verbose` is set.
    pub fn notification_body(&self, verbose: bool) -> String {
        match self.reason {
            Reason::ProbabilisticHit if !verbose => String::new(),
            _ => self.display_context.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Decide whether `spec` fires at `now` (epoch seconds).
///
/// `history` is the task's sorted firing list, or `None` if the task has no
/// entry at all. The random source is only consulted when the task has fired
/// before and its interval has not yet elapsed.
pub fn evaluate(
    spec: &ReminderSpec,
    history: Option<&[i64]>,
    now: i64,
    rng: &mut dyn RandomSource,
) -> EligibilityDecision {
    let Some(stamps) = history else {
        return EligibilityDecision::fire(Reason::FirstRun, "First run".to_string());
    };

    // Known but never fired: wait rather than bootstrap again.
    let Some(&last) = stamps.last() else {
        return EligibilityDecision::skip("No firing recorded yet".to_string());
    };

    let interval = spec.interval_days;
    let days_since = now.saturating_sub(last) as f64 / SECONDS_PER_DAY;
    if days_since >= interval as f64 {
        return EligibilityDecision::fire(
            Reason::IntervalElapsed,
            format!("Message every {interval} days"),
        );
    }

    let chance = rng.next_f64();
    let threshold = spec.threshold();
    let detail = format!(
        "Chance: {chance:.4}\nThreshold: {threshold:.4}\nMessage every {interval} days"
    );
    if chance <= threshold {
        EligibilityDecision::fire(Reason::ProbabilisticHit, detail)
    } else {
        EligibilityDecision::skip(format!("{detail}\nLast fired {days_since:.2} days ago"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
