use async_trait::async_trait;
use spending_advice::llm::{Sleeper, TextGenerationBackend};
use spending_advice::*;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const VALID_ADVICE: &str = r#"```json
{
  "analysis": "Income was steady but dining out climbed for the second month.",
  "problem_areas": [
    {"category": "Dining", "amount": 480.0, "trend": "+20%"},
    {"category": "Shopping", "amount": 260.0, "trend": "+4%"},
    {"category": "Subscriptions", "amount": 75.0, "trend": "0%"}
  ],
  "recommendations": [
    "Set a weekly dining budget of 90",
    "Wait 48 hours before non-essential purchases",
    "Cancel one streaming service you rarely use"
  ],
  "encouragement": "Your savings rate held up, which is the hardest part."
}
```"#;

/// Replays queued responses and records every payload it receives.
struct ScriptedBackend {
    responses: Mutex<VecDeque<std::result::Result<String, TransportError>>>,
    payloads: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<std::result::Result<String, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            payloads: Mutex::new(Vec::new()),
        })
    }

    fn always_valid() -> Arc<Self> {
        Self::new((0..10).map(|_| Ok(VALID_ADVICE.to_string())).collect())
    }

    fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    fn payload(&self, call: usize) -> serde_json::Value {
        self.payloads.lock().unwrap()[call].clone()
    }

    fn history_sent(&self, call: usize) -> Vec<String> {
        self.payloads.lock().unwrap()[call]["history"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["month"].as_str().unwrap().to_string())
            .collect()
    }
}

#[async_trait]
impl TextGenerationBackend for ScriptedBackend {
    async fn generate(
        &self,
        _system_instruction: &str,
        payload: &serde_json::Value,
    ) -> std::result::Result<String, TransportError> {
        self.payloads.lock().unwrap().push(payload.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted response".to_string())))
    }
}

/// Never answers; counts how many calls were started.
#[derive(Default)]
struct HangingBackend {
    started: AtomicUsize,
}

#[async_trait]
impl TextGenerationBackend for HangingBackend {
    async fn generate(
        &self,
        _system_instruction: &str,
        _payload: &serde_json::Value,
    ) -> std::result::Result<String, TransportError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

fn month(year: i32, month: u32, score: f64, dining: f64) -> MonthAggregate {
    let income = 4_000.0;
    let core = 1_800.0;
    let compound = 600.0;
    MonthAggregate {
        year,
        month,
        total_income: income,
        total_core: core,
        total_choice: dining + 200.0,
        total_compound: compound,
        core_percentage: core / income * 100.0,
        choice_percentage: (dining + 200.0) / income * 100.0,
        compound_percentage: compound / income * 100.0,
        score: Some(score),
        category_breakdown: Some(BTreeMap::from([
            ("Dining".to_string(), dining),
            ("Shopping".to_string(), 200.0),
        ])),
    }
}

fn consecutive_months(count: u32, last_year: i32, last_month: u32) -> Vec<MonthAggregate> {
    let mut refs = vec![MonthRef::new(last_year, last_month)];
    for _ in 1..count {
        let prev = refs.last().unwrap().previous();
        refs.push(prev);
    }
    refs.reverse();
    refs.into_iter()
        .map(|r| month(r.year, r.month, 2.0, 400.0))
        .collect()
}

fn service_with(
    ledger: Arc<InMemoryLedger>,
    backend: Arc<dyn TextGenerationBackend>,
    sleeper: Arc<RecordingSleeper>,
) -> AdviceService {
    let config = AdvisorConfig::new("test-key").with_request_timeout(Duration::from_millis(200));
    let generator = AdviceGenerator::new(backend, &config).with_sleeper(sleeper);
    AdviceService::new(ledger.clone(), ledger, generator)
}

#[tokio::test]
async fn test_gap_month_is_eligible_and_older_month_refused() {
    let ledger = Arc::new(InMemoryLedger::with_months(vec![
        month(2025, 8, 2.0, 400.0),
        month(2025, 10, 3.0, 480.0),
    ]));
    let backend = ScriptedBackend::always_valid();
    let service = service_with(ledger.clone(), backend.clone(), Arc::default());

    let september = service.request_advice(2025, 9, false).await.unwrap();
    assert!(!september.from_cache);
    assert!(september.eligibility.is_first_advice);
    assert_eq!(september.advice.recommendations.len(), 3);
    assert_eq!(backend.history_sent(0), vec!["2025-08"]);

    let err = service.request_advice(2025, 8, false).await.unwrap_err();
    match err {
        AdvisorError::MonthNotEligible {
            year,
            month,
            reason,
        } => {
            assert_eq!((year, month), (2025, 8));
            assert!(reason.contains("October 2025"));
            assert!(reason.contains("September 2025"));
        }
        other => panic!("expected MonthNotEligible, got {:?}", other),
    }
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_no_data_refuses_generation() {
    let backend = ScriptedBackend::always_valid();
    let service = service_with(Arc::new(InMemoryLedger::new()), backend.clone(), Arc::default());

    let err = service.request_advice(2025, 10, false).await.unwrap_err();
    assert!(matches!(err, AdvisorError::MonthNotEligible { .. }));
    assert!(err.to_string().contains("no transaction data available"));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_single_month_dataset_is_insufficient() {
    let ledger = Arc::new(InMemoryLedger::with_months(vec![month(2025, 10, 2.0, 400.0)]));
    let backend = ScriptedBackend::always_valid();
    let service = service_with(ledger, backend.clone(), Arc::default());

    let err = service.request_advice(2025, 10, false).await.unwrap_err();
    assert!(matches!(
        err,
        AdvisorError::Generation(AdviceGenerationError::InsufficientData { .. })
    ));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_first_advice_uses_twelve_months_then_three() {
    let ledger = Arc::new(InMemoryLedger::with_months(consecutive_months(15, 2025, 10)));
    let backend = ScriptedBackend::always_valid();
    let service = service_with(ledger.clone(), backend.clone(), Arc::default());

    let first = service.request_advice(2025, 9, false).await.unwrap();
    assert!(first.eligibility.is_first_advice);
    assert_eq!(first.eligibility.history_limit, 12);
    assert_eq!(backend.history_sent(0).len(), 12);
    assert_eq!(backend.history_sent(0).last().unwrap(), "2025-08");

    // regenerating the only stored advice still counts as first advice
    let regenerated = service.request_advice(2025, 9, true).await.unwrap();
    assert!(regenerated.eligibility.is_first_advice);
    assert_eq!(backend.history_sent(1).len(), 12);

    let second = service.request_advice(2025, 10, false).await.unwrap();
    assert!(!second.eligibility.is_first_advice);
    assert_eq!(second.eligibility.history_limit, 3);
    assert_eq!(
        backend.history_sent(2),
        vec!["2025-07", "2025-08", "2025-09"]
    );

    assert_eq!(
        ledger.advice_count_and_earliest().unwrap(),
        (2, Some(MonthRef::new(2025, 9)))
    );
}

#[tokio::test]
async fn test_later_advice_reports_declining_scores() {
    let scores = [3.0, 3.0, 3.0, 3.0, 3.0, 1.0, 1.0, 1.0];
    let months: Vec<MonthAggregate> = consecutive_months(8, 2025, 10)
        .into_iter()
        .zip(scores)
        .map(|(m, score)| MonthAggregate {
            score: Some(score),
            ..m
        })
        .collect();
    let ledger = Arc::new(InMemoryLedger::with_months(months));
    let stored = spending_advice::llm::parse_advice_response(VALID_ADVICE).unwrap();
    ledger.upsert_advice(MonthRef::new(2025, 7), &stored).unwrap();
    ledger.upsert_advice(MonthRef::new(2025, 8), &stored).unwrap();

    let backend = ScriptedBackend::always_valid();
    let service = service_with(ledger, backend.clone(), Arc::default());

    let outcome = service.request_advice(2025, 10, false).await.unwrap();
    assert!(!outcome.eligibility.is_first_advice);
    assert_eq!(
        backend.history_sent(0),
        vec!["2025-07", "2025-08", "2025-09"]
    );
    let payload = backend.payload(0);
    assert_eq!(payload["score_trend"], "declining");
    assert_eq!(payload["best_month"], "2025-07");
    assert_eq!(payload["worst_month"], "2025-10");
}

#[tokio::test]
async fn test_stored_advice_is_reused_unless_regenerating() {
    let ledger = Arc::new(InMemoryLedger::with_months(consecutive_months(4, 2025, 10)));
    let backend = ScriptedBackend::always_valid();
    let service = service_with(ledger, backend.clone(), Arc::default());

    let generated = service.request_advice(2025, 10, false).await.unwrap();
    let cached = service.request_advice(2025, 10, false).await.unwrap();
    assert!(cached.from_cache);
    assert_eq!(cached.advice, generated.advice);
    assert_eq!(backend.calls(), 1);

    let regenerated = service.request_advice(2025, 10, true).await.unwrap();
    assert!(!regenerated.from_cache);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_malformed_response_is_reported_without_retry() {
    let ledger = Arc::new(InMemoryLedger::with_months(consecutive_months(3, 2025, 10)));
    let missing_encouragement = r#"{
        "analysis": "ok",
        "problem_areas": [
            {"category": "A", "amount": 1, "trend": "N/A"},
            {"category": "B", "amount": 2, "trend": "N/A"},
            {"category": "C", "amount": 3, "trend": "N/A"}
        ],
        "recommendations": ["x", "y", "z"]
    }"#;
    let backend = ScriptedBackend::new(vec![
        Ok(missing_encouragement.to_string()),
        Ok(VALID_ADVICE.to_string()),
    ]);
    let service = service_with(ledger.clone(), backend.clone(), Arc::default());

    let err = service.request_advice(2025, 10, false).await.unwrap_err();
    match &err {
        AdvisorError::Generation(generation) => {
            assert!(!generation.is_retryable());
            assert_eq!(generation.raw_response(), Some(missing_encouragement));
        }
        other => panic!("expected generation error, got {:?}", other),
    }
    assert_eq!(backend.calls(), 1);
    assert!(ledger.get_advice(MonthRef::new(2025, 10)).unwrap().is_none());
}

#[tokio::test]
async fn test_upstream_failures_exhaust_three_attempts() {
    let ledger = Arc::new(InMemoryLedger::with_months(consecutive_months(3, 2025, 10)));
    let backend = ScriptedBackend::new(vec![
        Err(TransportError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }),
        Err(TransportError::Request("connection reset".to_string())),
        Err(TransportError::Status {
            status: 429,
            body: "slow down".to_string(),
        }),
    ]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = service_with(ledger, backend.clone(), sleeper.clone());

    let err = service.request_advice(2025, 10, false).await.unwrap_err();
    assert_eq!(
        match &err {
            AdvisorError::Generation(generation) => generation.retry_count(),
            _ => None,
        },
        Some(3)
    );
    assert!(err.user_message().contains("tried 3 times"));
    assert_eq!(backend.calls(), 3);
    assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_hung_upstream_times_out_each_attempt() {
    let ledger = Arc::new(InMemoryLedger::with_months(consecutive_months(3, 2025, 10)));
    let backend = Arc::new(HangingBackend::default());
    let service = service_with(ledger, backend.clone(), Arc::default());

    let err = service.request_advice(2025, 10, false).await.unwrap_err();
    assert!(matches!(
        err,
        AdvisorError::Generation(AdviceGenerationError::Api {
            attempts: 3,
            last_error: TransportError::Timeout { .. }
        })
    ));
    assert_eq!(backend.started.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_dropping_request_stops_retries() {
    let ledger = Arc::new(InMemoryLedger::with_months(consecutive_months(3, 2025, 10)));
    let backend = Arc::new(HangingBackend::default());
    let config = AdvisorConfig::new("test-key").with_request_timeout(Duration::from_secs(30));
    let generator =
        AdviceGenerator::new(backend.clone(), &config).with_sleeper(Arc::new(RecordingSleeper::default()));
    let service = AdviceService::new(ledger.clone(), ledger, generator);

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), service.request_advice(2025, 10, false))
            .await;
    assert!(cancelled.is_err());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let ledger = Arc::new(InMemoryLedger::with_months(consecutive_months(6, 2025, 10)));
    let backend = ScriptedBackend::always_valid();
    let service = service_with(ledger.clone(), backend.clone(), Arc::default());

    let (october, september) = tokio::join!(
        service.request_advice(2025, 10, false),
        service.request_advice(2025, 9, false)
    );

    assert!(october.is_ok());
    assert!(september.is_ok());
    assert_eq!(backend.calls(), 2);
    assert_eq!(ledger.advice_count_and_earliest().unwrap().0, 2);
}

#[test]
fn test_year_boundary_eligibility() {
    let ledger = Arc::new(InMemoryLedger::with_months(vec![
        month(2024, 11, 2.0, 400.0),
        month(2025, 1, 2.0, 400.0),
    ]));
    let service = EligibilityService::new(ledger);

    assert!(service.check_eligibility(2025, 1).unwrap().is_eligible);
    assert!(service.check_eligibility(2024, 12).unwrap().is_eligible);
    assert!(!service.check_eligibility(2024, 11).unwrap().is_eligible);
}

#[test]
fn test_score_trend_over_six_months() {
    let scores = [1.0, 1.0, 2.0, 3.0, 2.0, 3.0];
    let history: Vec<MonthAggregate> = scores
        .iter()
        .enumerate()
        .map(|(i, score)| month(2025, i as u32 + 1, *score, 400.0))
        .collect();
    assert_eq!(score_trend(&history), ScoreTrend::Improving);

    let reversed: Vec<MonthAggregate> = scores
        .iter()
        .rev()
        .enumerate()
        .map(|(i, score)| month(2025, i as u32 + 1, *score, 400.0))
        .collect();
    assert_eq!(score_trend(&reversed), ScoreTrend::Declining);

    assert_eq!(score_trend(&history[..5]), ScoreTrend::Stable);
}

#[test]
fn test_category_trend_examples() {
    assert_eq!(category_trend(120.0, Some(100.0)), "+20%");
    assert_eq!(category_trend(80.0, Some(100.0)), "-20%");
    assert_eq!(category_trend(42.0, None), "N/A");
    assert_eq!(category_trend(42.0, Some(0.0)), "N/A");
}
