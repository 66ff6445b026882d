use anyhow::anyhow;
use dotenv::dotenv;
use spending_advice::llm::GeminiClient;
use spending_advice::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn sample_months() -> Vec<MonthAggregate> {
    let dining = [310.0, 290.0, 340.0, 360.0, 410.0, 455.0];
    let scores = [2.0, 2.0, 2.0, 2.0, 1.0, 1.0];

    dining
        .iter()
        .zip(scores.iter())
        .enumerate()
        .map(|(i, (dining, score))| {
            let income = 4_200.0;
            let core = 1_950.0;
            let choice = dining + 380.0;
            let compound = income - core - choice;
            MonthAggregate {
                year: 2025,
                month: 5 + i as u32,
                total_income: income,
                total_core: core,
                total_choice: choice,
                total_compound: compound,
                core_percentage: core / income * 100.0,
                choice_percentage: choice / income * 100.0,
                compound_percentage: compound / income * 100.0,
                score: Some(*score),
                category_breakdown: Some(BTreeMap::from([
                    ("Rent".to_string(), 1_450.0),
                    ("Groceries".to_string(), 500.0),
                    ("Dining".to_string(), *dining),
                    ("Shopping".to_string(), 260.0),
                    ("Subscriptions".to_string(), 120.0),
                ])),
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = AdvisorConfig::from_env()?;

    let ledger = Arc::new(InMemoryLedger::with_months(sample_months()));
    let backend = Arc::new(GeminiClient::new(&config)?);
    let model = backend.model().to_string();
    let service = AdviceService::new(
        ledger.clone(),
        ledger.clone(),
        AdviceGenerator::new(backend, &config),
    );

    let Some(latest) = ledger.most_recent_month()? else {
        return Err(anyhow!("no months loaded"));
    };

    println!("Requesting advice for {} from {}...\n", latest.label(), model);

    match service.request_advice(latest.year, latest.month, false).await {
        Ok(outcome) => {
            println!("{}\n", outcome.advice.analysis);
            for area in &outcome.advice.problem_areas {
                println!("  - {}: {:.2} ({})", area.category, area.amount, area.trend);
            }
            println!();
            for (i, tip) in outcome.advice.recommendations.iter().enumerate() {
                println!("  {}. {}", i + 1, tip);
            }
            println!("\n{}", outcome.advice.encouragement);
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            eprintln!("details: {}", e);
        }
    }

    Ok(())
}
