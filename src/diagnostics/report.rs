//! Setup validation report.
//!
//! Checks are grouped into four categories and summarised with a success
//! rate over pass/fail results (warnings are counted but do not affect it).

use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

pub const DEFAULT_REPORT_PATH: &str = "validation-report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warning,
}

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub test: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    pub fn new(test: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            status,
            message: message.into(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn pass(test: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(test, CheckStatus::Pass, message)
    }

    pub fn fail(test: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(test, CheckStatus::Fail, message)
    }

    pub fn warning(test: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(test, CheckStatus::Warning, message)
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Prerequisites,
    Configuration,
    Connections,
    Functionality,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Prerequisites,
        Category::Configuration,
        Category::Connections,
        Category::Functionality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prerequisites => "prerequisites",
            Self::Configuration => "configuration",
            Self::Connections => "connections",
            Self::Functionality => "functionality",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDetails {
    pub prerequisites: Vec<CheckResult>,
    pub configuration: Vec<CheckResult>,
    pub connections: Vec<CheckResult>,
    pub functionality: Vec<CheckResult>,
}

impl CategoryDetails {
    pub fn get(&self, category: Category) -> &[CheckResult] {
        match category {
            Category::Prerequisites => &self.prerequisites,
            Category::Configuration => &self.configuration,
            Category::Connections => &self.connections,
            Category::Functionality => &self.functionality,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut Vec<CheckResult> {
        match category {
            Category::Prerequisites => &mut self.prerequisites,
            Category::Configuration => &mut self.configuration,
            Category::Connections => &mut self.connections,
            Category::Functionality => &mut self.functionality,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    /// Percentage of passed over passed + failed, rounded; 0 when neither ran.
    pub success_rate: u32,
}

impl Summary {
    pub fn from_counts(passed: usize, failed: usize, warnings: usize) -> Self {
        let decided = passed + failed;
        let success_rate = if decided == 0 {
            0
        } else {
            ((passed as f64 * 100.0) / decided as f64).round() as u32
        };
        Self {
            total_tests: decided + warnings,
            passed,
            failed,
            warnings,
            success_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub timestamp: DateTime<Utc>,
    pub summary: Summary,
    pub details: CategoryDetails,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            summary: Summary::default(),
            details: CategoryDetails::default(),
        }
    }

    /// Append a check and refresh the summary.
    pub fn record(&mut self, category: Category, result: CheckResult) {
        self.details.get_mut(category).push(result);
        self.summary = self.compute_summary();
    }

    fn compute_summary(&self) -> Summary {
        let all = Category::ALL.iter().flat_map(|c| self.details.get(*c));
        let (mut passed, mut failed, mut warnings) = (0, 0, 0);
        for check in all {
            match check.status {
                CheckStatus::Pass => passed += 1,
                CheckStatus::Fail => failed += 1,
                CheckStatus::Warning => warnings += 1,
            }
        }
        Summary::from_counts(passed, failed, warnings)
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Checks of one category with the given status.
    pub fn with_status(&self, category: Category, status: CheckStatus) -> Vec<&CheckResult> {
        self.details
            .get(category)
            .iter()
            .filter(|c| c.status == status)
            .collect()
    }

    /// Write the report as indented JSON.
    pub fn write_to(&self, path: &Path) -> DbResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DbError::internal(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(path, json).map_err(|e| {
            DbError::internal(format!(
                "Failed to write report to {}: {}",
                path.display(),
                e
            ))
        })
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
