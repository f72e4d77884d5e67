//! Structured review results produced by the review engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest score a review can award.
pub const MAX_OVERALL_SCORE: u8 = 100;

/// Issue severity, ordered from most to least urgent.
///
/// Serialised as the integers `1..=5` the review engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Severity {
    /// Must be fixed before merge (security flaws, data corruption).
    Critical = 1,
    /// Likely to cause production issues.
    High = 2,
    /// Violates best practices or adds technical debt.
    Medium = 3,
    /// Minor issues and style nits.
    Low = 4,
    /// Observations that are not issues.
    Informational = 5,
}

impl Severity {
    /// Human-readable label used in rendered reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Informational => "Info",
        }
    }
}

/// Rejected severity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("severity must be between 1 and 5, got {0}")]
pub struct SeverityOutOfRange(pub u8);

impl TryFrom<u8> for Severity {
    type Error = SeverityOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Critical),
            2 => Ok(Self::High),
            3 => Ok(Self::Medium),
            4 => Ok(Self::Low),
            5 => Ok(Self::Informational),
            other => Err(SeverityOutOfRange(other)),
        }
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value as Self
    }
}

/// Assessed risk that a change breaks existing behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakageRisk {
    /// Very low risk.
    #[serde(rename = "Very Low")]
    VeryLow,
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
    /// Very high risk.
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl BreakageRisk {
    /// All values in ascending order, as advertised to the review engine.
    pub const ALL: [Self; 5] = [
        Self::VeryLow,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::VeryHigh,
    ];

    /// Wire and display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for BreakageRisk {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// One issue identified in the reviewed diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeIssue {
    /// How urgent the issue is.
    pub severity: Severity,
    /// Path of the affected file as it appears in the diff.
    pub file_path: String,
    /// What is wrong.
    pub description: String,
    /// How to fix it.
    pub suggestion: String,
}

/// Structured quality report for one pull request.
///
/// Produced once per review request and replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Short summary of the change and its quality.
    pub summary: String,
    /// Quality score from 0 to 100.
    pub overall_score: u8,
    /// Risk of regressions.
    pub breakage_risk: BreakageRisk,
    /// Issues in the order the engine reported them.
    pub issues: Vec<CodeIssue>,
}

impl ReviewResult {
    /// Returns the issues ordered from Critical to Informational.
    ///
    /// The sort is stable, so issues of equal severity keep the engine's
    /// order.
    #[must_use]
    pub fn issues_by_severity(&self) -> Vec<&CodeIssue> {
        let mut ordered: Vec<&CodeIssue> = self.issues.iter().collect();
        ordered.sort_by_key(|issue| issue.severity);
        ordered
    }

    /// Checks invariants that the wire format cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.overall_score > MAX_OVERALL_SCORE {
            return Err(format!(
                "overall_score must be between 0 and {MAX_OVERALL_SCORE}, got {}",
                self.overall_score
            ));
        }
        Ok(())
    }
}
