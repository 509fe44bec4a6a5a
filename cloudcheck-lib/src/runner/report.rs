use chrono::{DateTime, Utc};
use serde::Serialize;

/// Terminal status of one control in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Fail,
    /// The control's `only_if` precondition did not hold; nothing was
    /// fetched or evaluated.
    Skip,
    /// Resource resolution failed (not found, provider fault, timeout).
    /// A false predicate is `Fail`, never `Error`.
    Error,
}

/// The per-control result of one run. Created once, immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub control_id: String,
    pub status: Status,
    pub impact: f64,

    /// Indices into the control's assertion list, in declared order.
    pub failing_assertions: Vec<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The aggregate result of running one profile. Outcomes are sorted by
/// control id so identical runs serialize byte-identically modulo
/// `generated_at`.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub profile: String,
    pub generated_at: DateTime<Utc>,
    pub summary_score: f64,
    pub outcomes: Vec<Outcome>,
}

/// Decimal places kept in `summary_score`.
const SCORE_PRECISION: f64 = 10_000.0;

impl Report {
    #[must_use]
    pub fn new(profile: String, mut outcomes: Vec<Outcome>) -> Self {
        outcomes.sort_by(|a, b| a.control_id.cmp(&b.control_id));
        Self {
            profile,
            generated_at: Utc::now(),
            summary_score: summary_score(&outcomes),
            outcomes,
        }
    }

    /// True when the run contains no `Fail` and no `Error`; drives the
    /// process exit code.
    #[must_use]
    pub fn clean(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| !matches!(outcome.status, Status::Fail | Status::Error))
    }
}

/// Impact-weighted pass ratio: Σ impact over Pass / Σ impact over
/// Pass+Fail+Error. Skips are inapplicable checks and stay out of the
/// denominator; an empty denominator scores 1.0.
fn summary_score(outcomes: &[Outcome]) -> f64 {
    let mut passed = 0.0;
    let mut total = 0.0;
    for outcome in outcomes {
        match outcome.status {
            Status::Pass => {
                passed += outcome.impact;
                total += outcome.impact;
            }
            Status::Fail | Status::Error => total += outcome.impact,
            Status::Skip => {}
        }
    }

    if total == 0.0 {
        return 1.0;
    }
    (passed / total * SCORE_PRECISION).round() / SCORE_PRECISION
}
