use std::collections::BTreeMap;
use std::sync::RwLock;

use log::debug;

use crate::error::{AdvisorError, Result};
use crate::schema::{AdviceResult, MonthAggregate, MonthRef};

/// Read-only access to stored month aggregates and advice bookkeeping.
pub trait MonthDataProvider: Send + Sync {
    /// Latest month that has any stored data.
    fn most_recent_month(&self) -> Result<Option<MonthRef>>;

    fn month_aggregate(&self, year: i32, month: u32) -> Result<Option<MonthAggregate>>;

    /// Up to `limit` stored months strictly before `(before_year, before_month)`,
    /// the newest ones, returned oldest first.
    fn months_history(
        &self,
        before_year: i32,
        before_month: u32,
        limit: usize,
    ) -> Result<Vec<MonthAggregate>>;

    fn has_any_advice(&self) -> Result<bool>;

    /// Number of stored advice records and the month of the earliest one.
    fn advice_count_and_earliest(&self) -> Result<(usize, Option<MonthRef>)>;
}

/// Persistence seam for generated advice. Implementations must upsert
/// atomically per month.
pub trait AdviceStore: Send + Sync {
    fn get_advice(&self, month: MonthRef) -> Result<Option<AdviceResult>>;

    fn upsert_advice(&self, month: MonthRef, advice: &AdviceResult) -> Result<()>;
}

/// Map-backed implementation of both traits.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    months: RwLock<BTreeMap<MonthRef, MonthAggregate>>,
    advice: RwLock<BTreeMap<MonthRef, AdviceResult>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_months(months: impl IntoIterator<Item = MonthAggregate>) -> Self {
        let map = months.into_iter().map(|m| (m.month_ref(), m)).collect();
        Self {
            months: RwLock::new(map),
            advice: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn insert_month(&self, aggregate: MonthAggregate) -> Result<()> {
        let mut months = self.months.write().map_err(|_| poisoned("months"))?;
        months.insert(aggregate.month_ref(), aggregate);
        Ok(())
    }
}

fn poisoned(what: &str) -> AdvisorError {
    AdvisorError::DataProvider(format!("{} lock poisoned", what))
}

impl MonthDataProvider for InMemoryLedger {
    fn most_recent_month(&self) -> Result<Option<MonthRef>> {
        let months = self.months.read().map_err(|_| poisoned("months"))?;
        Ok(months.keys().next_back().copied())
    }

    fn month_aggregate(&self, year: i32, month: u32) -> Result<Option<MonthAggregate>> {
        let months = self.months.read().map_err(|_| poisoned("months"))?;
        Ok(months.get(&MonthRef::new(year, month)).cloned())
    }

    fn months_history(
        &self,
        before_year: i32,
        before_month: u32,
        limit: usize,
    ) -> Result<Vec<MonthAggregate>> {
        let months = self.months.read().map_err(|_| poisoned("months"))?;
        let mut history: Vec<MonthAggregate> = months
            .range(..MonthRef::new(before_year, before_month))
            .rev()
            .take(limit)
            .map(|(_, aggregate)| aggregate.clone())
            .collect();
        history.reverse();

        debug!(
            "Loaded {} history months before {:04}-{:02} (limit {})",
            history.len(),
            before_year,
            before_month,
            limit
        );
        Ok(history)
    }

    fn has_any_advice(&self) -> Result<bool> {
        let advice = self.advice.read().map_err(|_| poisoned("advice"))?;
        Ok(!advice.is_empty())
    }

    fn advice_count_and_earliest(&self) -> Result<(usize, Option<MonthRef>)> {
        let advice = self.advice.read().map_err(|_| poisoned("advice"))?;
        Ok((advice.len(), advice.keys().next().copied()))
    }
}

impl AdviceStore for InMemoryLedger {
    fn get_advice(&self, month: MonthRef) -> Result<Option<AdviceResult>> {
        let advice = self.advice.read().map_err(|_| poisoned("advice"))?;
        Ok(advice.get(&month).cloned())
    }

    fn upsert_advice(&self, month: MonthRef, result: &AdviceResult) -> Result<()> {
        let mut advice = self.advice.write().map_err(|_| poisoned("advice"))?;
        advice.insert(month, result.clone());
        Ok(())
    }
}
