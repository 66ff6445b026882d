// Prompt text and request payload for monthly advice generation

use std::collections::BTreeMap;

use schemars::schema_for;
use serde::Serialize;

use crate::error::Result;
use crate::schema::{AdviceResult, MonthAggregate, ScoreTrend};
use crate::trends::{best_and_worst_month, category_trends, score_trend};

pub const SYSTEM_PROMPT_ADVICE: &str = r#"
You are a friendly, practical personal finance coach reviewing one month of a person's budget.

## HOW THE BUDGET IS ORGANIZED
Every expense belongs to one of three groups:
- **Core**: needs such as rent, groceries, utilities, insurance, transport to work.
- **Choice**: wants such as dining out, entertainment, shopping, hobbies, travel.
- **Compound**: money that grows, such as savings, investments, debt pay-down.
Percentages are shares of the month's income.

## WHAT YOU RECEIVE
A JSON payload with:
- `current`: the month to advise on, with a per-category breakdown. Each category carries
  `amount` and `trend`, the change against the average of the supplied history ("+20%", "-5%",
  "0%") or "N/A" when there is no earlier basis.
- `history`: earlier months, oldest first, for context.
- `score_trend`: "improving", "declining" or "stable", comparing the average score of the last
  three months (including `current`) with the three before. "stable" when fewer than six months
  are known.
- `best_month` / `worst_month`: highest and lowest scored months among `current` and the months
  considered for the score trend, which may reach further back than `history`.

## RULES
1. Base every statement on the numbers provided. Never invent categories or amounts.
2. Pick EXACTLY 3 problem areas. Use category names exactly as they appear in `current`.
   Copy `amount` and `trend` for those categories from `current`.
3. Give EXACTLY 3 recommendations. Each must be concrete and doable next month.
4. Keep the analysis to 2-4 sentences. Mention the score trend when it is not stable.
5. End with one short, genuine sentence of encouragement.
6. Write in plain language. No jargon, no moralizing.

## OUTPUT FORMAT
Return ONLY a single JSON object, with no commentary before or after it, matching this schema:
"#;

/// System instruction with the `AdviceResult` JSON schema appended.
pub fn advice_system_instruction() -> Result<String> {
    let schema = serde_json::to_string_pretty(&schema_for!(AdviceResult))?;
    Ok(format!("{}{}\n", SYSTEM_PROMPT_ADVICE, schema))
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySnapshot {
    pub amount: f64,
    pub trend: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthSummary {
    pub month: String,
    pub total_income: f64,
    pub total_core: f64,
    pub total_choice: f64,
    pub total_compound: f64,
    pub core_percentage: f64,
    pub choice_percentage: f64,
    pub compound_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl From<&MonthAggregate> for MonthSummary {
    fn from(month: &MonthAggregate) -> Self {
        Self {
            month: month.month_ref().to_string(),
            total_income: month.total_income,
            total_core: month.total_core,
            total_choice: month.total_choice,
            total_compound: month.total_compound,
            core_percentage: month.core_percentage,
            choice_percentage: month.choice_percentage,
            compound_percentage: month.compound_percentage,
            score: month.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentMonth {
    pub month_label: String,
    #[serde(flatten)]
    pub summary: MonthSummary,
    pub categories: BTreeMap<String, CategorySnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryMonth {
    #[serde(flatten)]
    pub summary: MonthSummary,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvicePayload {
    pub current: CurrentMonth,
    pub history: Vec<HistoryMonth>,
    pub score_trend: ScoreTrend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_month: Option<String>,
}

/// Builds the payload from `current` and its chronological `history`.
///
/// `history` is sent as given; the caller has already trimmed it to the
/// history window and ordered it oldest first. `scored_history` is the
/// (usually longer) chronological run of prior months the score trend and
/// best/worst month are computed over.
pub fn build_advice_payload(
    current: &MonthAggregate,
    history: &[MonthAggregate],
    scored_history: &[MonthAggregate],
) -> AdvicePayload {
    let trends = category_trends(current, history);
    let categories = current
        .category_breakdown
        .iter()
        .flatten()
        .map(|(category, amount)| {
            let trend = trends
                .get(category)
                .cloned()
                .unwrap_or_else(|| crate::trends::NOT_AVAILABLE.to_string());
            (
                category.clone(),
                CategorySnapshot {
                    amount: *amount,
                    trend,
                },
            )
        })
        .collect();

    let mut timeline: Vec<MonthAggregate> = scored_history.to_vec();
    timeline.push(current.clone());
    let extremes = best_and_worst_month(&timeline);

    AdvicePayload {
        current: CurrentMonth {
            month_label: current.month_ref().label(),
            summary: MonthSummary::from(current),
            categories,
        },
        history: history
            .iter()
            .map(|month| HistoryMonth {
                summary: MonthSummary::from(month),
                categories: month.category_breakdown.clone().unwrap_or_default(),
            })
            .collect(),
        score_trend: score_trend(&timeline),
        best_month: extremes.map(|(best, _)| best.to_string()),
        worst_month: extremes.map(|(_, worst)| worst.to_string()),
    }
}
