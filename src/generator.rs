use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::config::AdvisorConfig;
use crate::error::{AdviceGenerationError, Result};
use crate::llm::backend::TextGenerationBackend;
use crate::llm::parser::parse_advice_response;
use crate::llm::prompts::{advice_system_instruction, build_advice_payload};
use crate::llm::retry::{call_with_retry, RetryPolicy, Sleeper, TokioSleeper};
use crate::schema::{AdviceResult, MonthAggregate};
use crate::trends::SCORE_TREND_WINDOW;

/// Current month plus at least one earlier month.
pub const MIN_MONTHS_REQUIRED: usize = 2;

pub struct AdviceGenerator {
    backend: Arc<dyn TextGenerationBackend>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    request_timeout: Duration,
    system_instruction: Option<String>,
}

impl AdviceGenerator {
    pub fn new(backend: Arc<dyn TextGenerationBackend>, config: &AdvisorConfig) -> Self {
        Self {
            backend,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::from_config(config),
            request_timeout: config.request_timeout,
            system_instruction: None,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the built-in coaching instruction, e.g. for a different tone.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Generates advice for `current`, using at most `history_limit` of the
    /// months in `history` that precede it as context.
    ///
    /// Older months in `history` still feed the score trend and best/worst
    /// month, so callers should pass at least `SCORE_TREND_WINDOW - 1` prior
    /// months when they have them. Only call this for a month that passed the
    /// eligibility check. Parse failures and insufficient data are returned
    /// immediately; only transport failures are retried.
    pub async fn generate_advice(
        &self,
        current: &MonthAggregate,
        history: &[MonthAggregate],
        history_limit: usize,
    ) -> Result<AdviceResult> {
        let prior = prior_months(current, history);
        let window = tail(&prior, history_limit);

        let available = window.len() + 1;
        if available < MIN_MONTHS_REQUIRED {
            return Err(AdviceGenerationError::InsufficientData {
                min_months_required: MIN_MONTHS_REQUIRED,
                available,
            }
            .into());
        }

        let scored = tail(&prior, history_limit.max(SCORE_TREND_WINDOW - 1));
        info!(
            "Generating advice for {} with {} history months ({} for score trend)",
            current.month_ref(),
            window.len(),
            scored.len()
        );

        let payload = serde_json::to_value(build_advice_payload(current, window, scored))?;
        let system_instruction = match &self.system_instruction {
            Some(instruction) => instruction.clone(),
            None => advice_system_instruction()?,
        };
        debug!(
            "Advice request: {} byte instruction, {} byte payload",
            system_instruction.len(),
            payload.to_string().len()
        );

        let raw = call_with_retry(
            &self.policy,
            self.sleeper.as_ref(),
            self.request_timeout,
            || self.backend.generate(&system_instruction, &payload),
        )
        .await?;

        let advice = parse_advice_response(&raw)?;
        info!("Advice generated for {}", current.month_ref());
        Ok(advice)
    }
}

/// Months strictly before `current`, oldest first.
fn prior_months(current: &MonthAggregate, history: &[MonthAggregate]) -> Vec<MonthAggregate> {
    let target = current.month_ref();
    let mut prior: Vec<MonthAggregate> = history
        .iter()
        .filter(|month| month.month_ref() < target)
        .cloned()
        .collect();
    prior.sort_by_key(|month| month.month_ref());
    prior
}

/// The newest `limit` entries of a chronological slice.
fn tail(months: &[MonthAggregate], limit: usize) -> &[MonthAggregate] {
    &months[months.len().saturating_sub(limit)..]
}
