use crate::utils::finite_or_zero;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What the achieved amount is measured against. The numeric policy is the
/// same for both; only the wording of the zero-goal case differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum StatusContext {
    /// A BD against their monthly target.
    Target,
    /// A client or a week against the BD's projection.
    Projection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    Achieved,
    PartialAchieved,
    NotAchieved,
    NoTarget,
    NotProjected,
}

impl StatusKind {
    pub fn text(&self) -> &'static str {
        match self {
            StatusKind::Achieved => "Achieved",
            StatusKind::PartialAchieved => "Partial Achieved",
            StatusKind::NotAchieved => "Not Achieved",
            StatusKind::NoTarget => "No Target",
            StatusKind::NotProjected => "Not Projected",
        }
    }

    /// Sort order for status columns, best first.
    pub fn severity(&self) -> u8 {
        match self {
            StatusKind::Achieved => 0,
            StatusKind::PartialAchieved => 1,
            StatusKind::NotAchieved => 2,
            StatusKind::NoTarget | StatusKind::NotProjected => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub kind: StatusKind,
    pub text: String,
    /// Progress towards the goal, always within 0..=100.
    pub progress: f64,
    pub severity: u8,
}

impl StatusReport {
    fn new(kind: StatusKind, progress: f64) -> Self {
        Self {
            kind,
            text: kind.text().to_string(),
            progress: progress.clamp(0.0, 100.0),
            severity: kind.severity(),
        }
    }
}

/// Classifies `achieved` against `target`. Negative or non-finite inputs are
/// treated as zero, so the result never carries NaN or infinity.
pub fn classify(achieved: f64, target: f64, context: StatusContext) -> StatusReport {
    let achieved = finite_or_zero(achieved).max(0.0);
    let target = finite_or_zero(target).max(0.0);

    if target == 0.0 {
        let kind = match context {
            StatusContext::Target => StatusKind::NoTarget,
            StatusContext::Projection => StatusKind::NotProjected,
        };
        let progress = if achieved > 0.0 { 100.0 } else { 0.0 };
        return StatusReport::new(kind, progress);
    }

    let ratio = achieved / target * 100.0;
    if achieved >= target {
        StatusReport::new(StatusKind::Achieved, ratio.min(100.0))
    } else if achieved > 0.0 {
        StatusReport::new(StatusKind::PartialAchieved, ratio)
    } else {
        StatusReport::new(StatusKind::NotAchieved, 0.0)
    }
}
