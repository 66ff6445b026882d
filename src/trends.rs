//! Spending and score trend calculations.
//!
//! Everything here is pure: no I/O, deterministic output for a given input.

use std::collections::BTreeMap;

use crate::schema::{MonthAggregate, MonthRef, ScoreTrend};

pub const NOT_AVAILABLE: &str = "N/A";

/// Months needed before [`score_trend`] can report anything other than stable.
pub const SCORE_TREND_WINDOW: usize = 6;

/// Percentage change of `current` against `prior_average`, formatted with an
/// explicit sign ("+20%", "-5%"). Zero is unsigned.
///
/// Half percentages round away from zero: +2.5% is "+3%", -2.5% is "-3%".
pub fn category_trend(current: f64, prior_average: Option<f64>) -> String {
    let prior = match prior_average {
        Some(value) if value != 0.0 => value,
        _ => return NOT_AVAILABLE.to_string(),
    };

    let change = ((current - prior) / prior * 100.0).round() as i64;
    if change > 0 {
        format!("+{}%", change)
    } else {
        format!("{}%", change)
    }
}

/// Compares the average score of the last three months with the three before.
///
/// `history` must be chronological, oldest first. Months without a score are
/// left out of their window's average; a window with no scored month at all
/// yields `Stable`.
pub fn score_trend(history: &[MonthAggregate]) -> ScoreTrend {
    if history.len() < SCORE_TREND_WINDOW {
        return ScoreTrend::Stable;
    }

    let window = &history[history.len() - SCORE_TREND_WINDOW..];
    let (prior_three, recent_three) = window.split_at(SCORE_TREND_WINDOW / 2);

    match (average_score(recent_three), average_score(prior_three)) {
        (Some(recent), Some(prior)) if recent > prior => ScoreTrend::Improving,
        (Some(recent), Some(prior)) if recent < prior => ScoreTrend::Declining,
        _ => ScoreTrend::Stable,
    }
}

fn average_score(months: &[MonthAggregate]) -> Option<f64> {
    let scores: Vec<f64> = months.iter().filter_map(|m| m.score).collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Trend label for every category of `current` against its mean over `history`.
///
/// A category absent from a history month counts as zero spend for that month.
/// With no history every label is "N/A".
pub fn category_trends(
    current: &MonthAggregate,
    history: &[MonthAggregate],
) -> BTreeMap<String, String> {
    let Some(breakdown) = current.category_breakdown.as_ref() else {
        return BTreeMap::new();
    };

    breakdown
        .iter()
        .map(|(category, amount)| {
            let prior_average = if history.is_empty() {
                None
            } else {
                let total: f64 = history.iter().map(|m| m.category_amount(category)).sum();
                Some(total / history.len() as f64)
            };
            (category.clone(), category_trend(*amount, prior_average))
        })
        .collect()
}

/// Best and worst scored months. Ties go to the more recent month.
///
/// Months are visited oldest to newest and compared with `>=` / `<=`, so a
/// later equal score replaces an earlier one.
pub fn best_and_worst_month(months: &[MonthAggregate]) -> Option<(MonthRef, MonthRef)> {
    let mut scored: Vec<(MonthRef, f64)> = months
        .iter()
        .filter_map(|m| m.score.map(|score| (m.month_ref(), score)))
        .collect();
    scored.sort_by_key(|(month, _)| *month);

    let mut iter = scored.into_iter();
    let first = iter.next()?;
    let mut best = first;
    let mut worst = first;

    for entry in iter {
        if entry.1 >= best.1 {
            best = entry;
        }
        if entry.1 <= worst.1 {
            worst = entry;
        }
    }

    Some((best.0, worst.0))
}
