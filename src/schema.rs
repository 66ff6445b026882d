use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::{month_label, next_month, prev_month};

/// History window used once the person already has advice to compare against.
pub const STANDARD_HISTORY_LIMIT: usize = 3;

/// History window used for a first advice, when there is nothing earlier to build on.
pub const FIRST_ADVICE_HISTORY_LIMIT: usize = 12;

/// Exact number of problem areas and recommendations an advice must carry.
pub const ADVICE_ITEM_COUNT: usize = 3;

/// A calendar month. Ordering is chronological (year first, then month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn previous(&self) -> Self {
        let (year, month) = prev_month(self.year, self.month);
        Self::new(year, month)
    }

    pub fn next(&self) -> Self {
        let (year, month) = next_month(self.year, self.month);
        Self::new(year, month)
    }

    /// Human readable name, e.g. "October 2025".
    pub fn label(&self) -> String {
        month_label(self.year, self.month)
    }
}

impl fmt::Display for MonthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Read-only snapshot of one month's finances as produced by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthAggregate {
    pub year: i32,
    pub month: u32,
    pub total_income: f64,
    /// Spending on needs (rent, groceries, utilities).
    pub total_core: f64,
    /// Discretionary spending.
    pub total_choice: f64,
    /// Savings and investments.
    pub total_compound: f64,
    pub core_percentage: f64,
    pub choice_percentage: f64,
    pub compound_percentage: f64,
    /// Month health score. Absent when the store has not scored the month.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub category_breakdown: Option<BTreeMap<String, f64>>,
}

impl MonthAggregate {
    /// Aggregate for a month with no transactions at all.
    pub fn empty(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            total_income: 0.0,
            total_core: 0.0,
            total_choice: 0.0,
            total_compound: 0.0,
            core_percentage: 0.0,
            choice_percentage: 0.0,
            compound_percentage: 0.0,
            score: None,
            category_breakdown: None,
        }
    }

    pub fn month_ref(&self) -> MonthRef {
        MonthRef::new(self.year, self.month)
    }

    pub fn category_amount(&self, category: &str) -> f64 {
        self.category_breakdown
            .as_ref()
            .and_then(|breakdown| breakdown.get(category))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Verdict of an eligibility check. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub is_eligible: bool,
    pub history_limit: usize,
    pub is_first_advice: bool,
    pub reason: Option<String>,
}

impl EligibilityResult {
    pub fn eligible(is_first_advice: bool) -> Self {
        Self {
            is_eligible: true,
            history_limit: history_limit_for(is_first_advice),
            is_first_advice,
            reason: None,
        }
    }

    pub fn ineligible(reason: impl Into<String>, is_first_advice: bool) -> Self {
        Self {
            is_eligible: false,
            history_limit: STANDARD_HISTORY_LIMIT,
            is_first_advice,
            reason: Some(reason.into()),
        }
    }
}

pub fn history_limit_for(is_first_advice: bool) -> usize {
    if is_first_advice {
        FIRST_ADVICE_HISTORY_LIMIT
    } else {
        STANDARD_HISTORY_LIMIT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTrend {
    Improving,
    Declining,
    Stable,
}

impl ScoreTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreTrend::Improving => "improving",
            ScoreTrend::Declining => "declining",
            ScoreTrend::Stable => "stable",
        }
    }
}

impl fmt::Display for ScoreTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProblemArea {
    #[schemars(description = "Spending category name exactly as it appears in the month data")]
    pub category: String,

    #[schemars(description = "Amount spent in this category in the current month")]
    pub amount: f64,

    #[schemars(
        description = "Signed percentage change versus the historical average (e.g. \"+20%\", \"-5%\", \"0%\"), or \"N/A\" when there is no prior basis"
    )]
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AdviceResult {
    #[schemars(description = "Two to four sentences summarizing how the month went")]
    pub analysis: String,

    #[schemars(description = "Exactly 3 spending categories that need attention")]
    pub problem_areas: Vec<ProblemArea>,

    #[schemars(description = "Exactly 3 concrete, actionable recommendations")]
    pub recommendations: Vec<String>,

    #[schemars(description = "One short encouraging sentence")]
    pub encouragement: String,
}
