use crate::error::{AdvisorError, Result};
use chrono::Month;

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    let next_year = if month == 12 { year + 1 } else { year };
    let next = if month == 12 { 1 } else { month + 1 };
    (next_year, next)
}

pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    let prev_year = if month == 1 { year - 1 } else { year };
    let prev = if month == 1 { 12 } else { month - 1 };
    (prev_year, prev)
}

pub fn validate_month(year: i32, month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(AdvisorError::MonthNotEligible {
            year,
            month,
            reason: format!("invalid month {}: must be between 1 and 12", month),
        });
    }
    Ok(())
}

/// "October 2025". Falls back to "2025-13" style for out-of-range months.
pub fn month_label(year: i32, month: u32) -> String {
    match u8::try_from(month).ok().and_then(|m| Month::try_from(m).ok()) {
        Some(name) => format!("{} {}", name.name(), year),
        None => format!("{:04}-{:02}", year, month),
    }
}
