use std::sync::Arc;

use log::{debug, info};

use crate::error::Result;
use crate::provider::MonthDataProvider;
use crate::schema::{EligibilityResult, MonthRef};

pub const NO_DATA_REASON: &str = "no transaction data available";

/// Decides whether advice may be generated for a month and how much history to send.
///
/// The window is anchored on the newest stored month, not on today's date, so an
/// old import still gets advice for its own latest months.
pub struct EligibilityService {
    provider: Arc<dyn MonthDataProvider>,
}

impl EligibilityService {
    pub fn new(provider: Arc<dyn MonthDataProvider>) -> Self {
        Self { provider }
    }

    /// The two months advice may currently be generated for: the newest stored
    /// month and its calendar predecessor, newest first.
    pub fn eligible_window(&self) -> Result<Option<(MonthRef, MonthRef)>> {
        Ok(self
            .provider
            .most_recent_month()?
            .map(|most_recent| (most_recent, most_recent.previous())))
    }

    /// Never fails for an ineligible month; refusals come back as a result value.
    /// Errors only surface from the underlying provider.
    pub fn check_eligibility(&self, target_year: i32, target_month: u32) -> Result<EligibilityResult> {
        let target = MonthRef::new(target_year, target_month);

        let Some((most_recent, previous)) = self.eligible_window()? else {
            info!("Advice for {} refused: no months stored", target);
            return Ok(EligibilityResult::ineligible(NO_DATA_REASON, true));
        };

        if target != most_recent && target != previous {
            let reason = format!(
                "advice can only be generated for {} or {}",
                most_recent.label(),
                previous.label()
            );
            info!("Advice for {} refused: {}", target, reason);
            return Ok(EligibilityResult::ineligible(reason, false));
        }

        let (advice_count, earliest) = self.provider.advice_count_and_earliest()?;
        let is_first_advice =
            advice_count == 0 || (advice_count == 1 && earliest == Some(target));

        debug!(
            "Eligibility for {}: {} stored advice, earliest {:?}, first advice = {}",
            target, advice_count, earliest, is_first_advice
        );

        let result = EligibilityResult::eligible(is_first_advice);
        info!(
            "Advice for {} is eligible with a {}-month history window",
            target, result.history_limit
        );
        Ok(result)
    }
}
