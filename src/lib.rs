//! # Spending Advice
//!
//! Decides when personalized monthly budget advice may be produced, works out
//! how much history to send, derives spending and score trends, and asks a
//! text-generation API for a structured, validated advice record.
//!
//! ## Core Concepts
//!
//! - **Eligible window**: the newest stored month and its calendar predecessor.
//!   Advice is only generated for those two months.
//! - **First advice**: no advice stored yet, or the only stored advice is being
//!   regenerated. First advice gets 12 months of history, later advice gets 3.
//! - **Trends**: signed percentage change per spending category, plus a
//!   three-state score trend across two 3-month windows.
//! - **Strict output**: the model's answer must decode into exactly the four
//!   advice fields with 3 problem areas and 3 recommendations, or it is rejected.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spending_advice::*;
//! use spending_advice::llm::GeminiClient;
//! use std::sync::Arc;
//!
//! let config = AdvisorConfig::from_env()?;
//! let ledger = Arc::new(InMemoryLedger::with_months(load_months()));
//! let backend = Arc::new(GeminiClient::new(&config)?);
//!
//! let service = AdviceService::new(
//!     ledger.clone(),
//!     ledger,
//!     AdviceGenerator::new(backend, &config),
//! );
//!
//! let outcome = service.request_advice(2025, 10, false).await?;
//! println!("{}", outcome.advice.analysis);
//! ```

pub mod config;
pub mod eligibility;
pub mod error;
pub mod generator;
pub mod llm;
pub mod provider;
pub mod schema;
pub mod trends;
pub mod utils;

pub use config::AdvisorConfig;
pub use eligibility::EligibilityService;
pub use error::{AdviceGenerationError, AdvisorError, Result, TransportError};
pub use generator::AdviceGenerator;
pub use provider::{AdviceStore, InMemoryLedger, MonthDataProvider};
pub use schema::*;
pub use trends::{
    best_and_worst_month, category_trend, category_trends, score_trend, SCORE_TREND_WINDOW,
};
pub use utils::*;

use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdviceOutcome {
    pub advice: AdviceResult,
    pub eligibility: EligibilityResult,
    /// True when a stored advice was returned instead of generating a new one.
    pub from_cache: bool,
}

/// Caller-facing entry point: eligibility, data loading, generation and upsert.
///
/// Holds no per-request state, so one instance can serve concurrent requests.
pub struct AdviceService {
    provider: Arc<dyn MonthDataProvider>,
    store: Arc<dyn AdviceStore>,
    eligibility: EligibilityService,
    generator: AdviceGenerator,
}

impl AdviceService {
    pub fn new(
        provider: Arc<dyn MonthDataProvider>,
        store: Arc<dyn AdviceStore>,
        generator: AdviceGenerator,
    ) -> Self {
        Self {
            eligibility: EligibilityService::new(provider.clone()),
            provider,
            store,
            generator,
        }
    }

    pub fn check_eligibility(&self, year: i32, month: u32) -> Result<EligibilityResult> {
        self.eligibility.check_eligibility(year, month)
    }

    /// Returns advice for `(year, month)`, or `AdvisorError::MonthNotEligible`
    /// when the month is outside the eligible window.
    ///
    /// Without `regenerate`, a stored advice for the month is returned as is.
    /// Dropping the future cancels any in-flight API call and pending retries.
    pub async fn request_advice(
        &self,
        year: i32,
        month: u32,
        regenerate: bool,
    ) -> Result<AdviceOutcome> {
        validate_month(year, month)?;
        let target = MonthRef::new(year, month);

        let eligibility = self.eligibility.check_eligibility(year, month)?;
        if !eligibility.is_eligible {
            return Err(AdvisorError::MonthNotEligible {
                year,
                month,
                reason: eligibility.reason.unwrap_or_default(),
            });
        }

        if !regenerate {
            if let Some(advice) = self.store.get_advice(target)? {
                info!("Returning stored advice for {}", target);
                return Ok(AdviceOutcome {
                    advice,
                    eligibility,
                    from_cache: true,
                });
            }
        }

        let current = self
            .provider
            .month_aggregate(year, month)?
            .unwrap_or_else(|| {
                debug!("No stored data for {}, using an empty month", target);
                MonthAggregate::empty(year, month)
            });
        // the score trend needs more months than the standard history window
        let history = self.provider.months_history(
            year,
            month,
            eligibility.history_limit.max(SCORE_TREND_WINDOW - 1),
        )?;

        let advice = self
            .generator
            .generate_advice(&current, &history, eligibility.history_limit)
            .await?;

        self.store.upsert_advice(target, &advice)?;
        info!(
            "Stored advice for {} (first advice: {})",
            target, eligibility.is_first_advice
        );

        Ok(AdviceOutcome {
            advice,
            eligibility,
            from_cache: false,
        })
    }
}
