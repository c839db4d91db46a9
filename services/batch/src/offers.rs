use crate::infra::{build_pipeline, parse_classifier, parse_loan_type};
use clap::Args;
use settle_ai::config::{AppConfig, ClassifierKind};
use settle_ai::error::AppError;
use settle_ai::workflows::settlement::report::{write_audit_to_path, write_results_to_path};
use settle_ai::workflows::settlement::{
    BatchSummary, BorrowerId, Case, CaseIntake, LoanType, OfferOutcome, OfferResult, ScenarioId,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Borrower roster CSV (borrower_id, loan_type, principal_outstanding, dpd)
    #[arg(long, default_value = "data/borrower_data.csv")]
    pub(crate) borrowers: PathBuf,
    /// Chat scenarios JSON array
    #[arg(long, default_value = "data/chat_scenarios.json")]
    pub(crate) scenarios: PathBuf,
    /// Submission CSV to write
    #[arg(long, default_value = "submission.csv")]
    pub(crate) output: PathBuf,
    /// Optional JSON Lines audit trail, one record per priced scenario
    #[arg(long)]
    pub(crate) audit: Option<PathBuf>,
    /// Override APP_CLASSIFIER (deterministic or generative)
    #[arg(long, value_parser = parse_classifier)]
    pub(crate) classifier: Option<ClassifierKind>,
    /// Override APP_MAX_CONCURRENCY
    #[arg(long)]
    pub(crate) concurrency: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Personal Loan or Credit Card
    #[arg(long, value_parser = parse_loan_type)]
    pub(crate) loan_type: LoanType,
    /// Principal outstanding
    #[arg(long)]
    pub(crate) principal: f64,
    /// Days past due
    #[arg(long)]
    pub(crate) dpd: u32,
    /// Borrower's own words from the chat
    #[arg(long, default_value = "")]
    pub(crate) chat: String,
    /// Override APP_CLASSIFIER (deterministic or generative)
    #[arg(long, value_parser = parse_classifier)]
    pub(crate) classifier: Option<ClassifierKind>,
}

pub(crate) async fn run_offers(mut config: AppConfig, args: RunArgs) -> Result<(), AppError> {
    let RunArgs {
        borrowers,
        scenarios,
        output,
        audit,
        classifier,
        concurrency,
    } = args;

    if let Some(concurrency) = concurrency {
        if concurrency == 0 {
            return Err(AppError::Usage("--concurrency must be at least 1".to_string()));
        }
        config.pipeline.max_concurrency = concurrency;
    }
    let kind = classifier.unwrap_or(config.pipeline.classifier);

    let intake = CaseIntake::from_paths(&borrowers, &scenarios)?;
    info!(
        borrowers = intake.borrower_count(),
        scenarios = intake.scenario_count(),
        classifier = kind.label(),
        "starting settlement batch"
    );
    let batch = intake.into_batch();

    let pipeline = build_pipeline(&config, kind).await?;
    let outcomes = pipeline.run(&batch.cases).await;

    let results: Vec<OfferResult> = outcomes.iter().map(OfferOutcome::result).collect();
    write_results_to_path(&output, &results)?;
    if let Some(audit) = &audit {
        write_audit_to_path(audit, &outcomes)?;
    }

    let summary = BatchSummary::from_outcomes(&outcomes, &batch.skipped);
    summary.log();

    println!(
        "Priced {} of {} scenarios ({} failed, {} fallback, {} skipped) -> {}",
        summary.completed,
        summary.total,
        summary.failed,
        summary.fallback,
        summary.skipped,
        output.display()
    );
    for skipped in &batch.skipped {
        println!("  skipped {}: {}", skipped.scenario_id, skipped.reason);
    }

    Ok(())
}

pub(crate) async fn quote_offer(config: AppConfig, args: QuoteArgs) -> Result<(), AppError> {
    let QuoteArgs {
        loan_type,
        principal,
        dpd,
        chat,
        classifier,
    } = args;

    let case = Case::new(
        ScenarioId("adhoc".to_string()),
        BorrowerId("adhoc".to_string()),
        loan_type,
        principal,
        dpd,
        chat,
    )
    .map_err(|err| AppError::Usage(err.to_string()))?;

    let kind = classifier.unwrap_or(config.pipeline.classifier);
    let pipeline = build_pipeline(&config, kind).await?;
    let outcome = pipeline.process(&case).await;

    let rendered = serde_json::to_string_pretty(&outcome)
        .map_err(|err| AppError::Usage(format!("could not render outcome: {err}")))?;
    println!("{rendered}");

    Ok(())
}
