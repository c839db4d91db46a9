use super::classification::RuleClassifier;
use super::domain::{BorrowerId, Case, OfferResult, PolicyContext, RuleDecision, ScenarioId};
use super::offer::{self, OfferError, OfferQuote};
use super::policy::{PolicyRetrieval, RetrievalError};
use chrono::{DateTime, Utc};
use futures::{stream, FutureExt, StreamExt};
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

/// Where a scenario is in the retrieve → classify → compute sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStage {
    Start,
    Retrieved,
    Classified,
    Computed,
    Done,
    Failed,
}

impl ScenarioStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Retrieved => "retrieved",
            Self::Classified => "classified",
            Self::Computed => "computed",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Audit record for one processed scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferOutcome {
    pub scenario_id: ScenarioId,
    pub borrower_id: BorrowerId,
    pub stage: ScenarioStage,
    /// Last stage completed before a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_after: Option<ScenarioStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_ceiling: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_floor: Option<f64>,
    pub minimum_acceptable_offer: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub decided_at: DateTime<Utc>,
    #[serde(skip)]
    pub decision: Option<RuleDecision>,
}

impl OfferOutcome {
    pub fn result(&self) -> OfferResult {
        OfferResult {
            scenario_id: self.scenario_id.clone(),
            minimum_acceptable_offer: self.minimum_acceptable_offer,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.stage == ScenarioStage::Failed
    }

    pub fn used_fallback(&self) -> bool {
        self.decision
            .map(|decision| decision.is_fallback())
            .unwrap_or(false)
    }
}

#[derive(Debug, thiserror::Error)]
enum StageError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Offer(#[from] OfferError),
}

#[derive(Default)]
struct Progress {
    reached: Option<ScenarioStage>,
    decision: Option<RuleDecision>,
    quote: Option<OfferQuote>,
}

/// Runs cases through retrieval, classification and offer calculation.
pub struct OfferPipeline {
    classifier: Arc<dyn RuleClassifier>,
    retriever: Option<Arc<dyn PolicyRetrieval>>,
    max_concurrency: usize,
}

impl OfferPipeline {
    pub const DEFAULT_CONCURRENCY: usize = 4;

    pub fn new(classifier: Arc<dyn RuleClassifier>) -> Self {
        Self {
            classifier,
            retriever: None,
            max_concurrency: Self::DEFAULT_CONCURRENCY,
        }
    }

    /// Without a retriever, context-hungry classifiers receive an empty context.
    pub fn with_retriever(mut self, retriever: Arc<dyn PolicyRetrieval>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn classifier(&self) -> &dyn RuleClassifier {
        self.classifier.as_ref()
    }

    /// Process every case with at most `max_concurrency` in flight. Outcomes
    /// come back in input order, one per case.
    pub async fn run(&self, cases: &[Case]) -> Vec<OfferOutcome> {
        let mut outcomes: Vec<(usize, OfferOutcome)> = stream::iter(cases.iter().enumerate())
            .map(|(position, case)| async move { (position, self.process(case).await) })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        outcomes.sort_by_key(|(position, _)| *position);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Process one case. Never fails: errors and panics become a `Failed`
    /// outcome with a zero offer.
    pub async fn process(&self, case: &Case) -> OfferOutcome {
        let mut progress = Progress::default();
        let attempt = AssertUnwindSafe(self.advance(case, &mut progress))
            .catch_unwind()
            .await;

        let failure = match attempt {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(panic) => Some(format!(
                "stage panicked: {}",
                panic_message(panic.as_ref())
            )),
        };

        let Progress {
            reached,
            decision,
            quote,
        } = progress;

        let priced = match (&failure, quote) {
            (None, Some(quote)) => OfferResult {
                scenario_id: case.scenario_id().clone(),
                minimum_acceptable_offer: quote.minimum_acceptable_offer,
            },
            _ => OfferResult::placeholder(case.scenario_id().clone()),
        };

        let outcome = OfferOutcome {
            scenario_id: priced.scenario_id,
            borrower_id: case.borrower_id().clone(),
            stage: if failure.is_some() {
                ScenarioStage::Failed
            } else {
                ScenarioStage::Done
            },
            failed_after: failure
                .as_ref()
                .map(|_| reached.unwrap_or(ScenarioStage::Start)),
            rule_name: decision.map(|decision| decision.rule_name()),
            discount_ceiling: decision.map(|decision| decision.discount_ceiling),
            raw_floor: quote.map(|quote| quote.raw_floor),
            minimum_acceptable_offer: priced.minimum_acceptable_offer,
            error: failure,
            decided_at: Utc::now(),
            decision,
        };

        match &outcome.error {
            Some(err) => error!(
                scenario_id = %outcome.scenario_id,
                stage = outcome.failed_after.unwrap_or(ScenarioStage::Start).label(),
                error = %err,
                "scenario failed, emitting placeholder offer"
            ),
            None => debug!(
                scenario_id = %outcome.scenario_id,
                rule = outcome.rule_name.unwrap_or_default(),
                offer = outcome.minimum_acceptable_offer,
                "scenario priced"
            ),
        }

        outcome
    }

    async fn advance(&self, case: &Case, progress: &mut Progress) -> Result<(), StageError> {
        progress.reached = Some(ScenarioStage::Start);

        let context = match &self.retriever {
            Some(retriever) if self.classifier.needs_context() => {
                retriever.retrieve(&case.retrieval_query()).await?
            }
            _ => PolicyContext::empty(),
        };
        progress.reached = Some(ScenarioStage::Retrieved);

        let decision = self.classifier.classify(case, &context).await;
        progress.decision = Some(decision);
        progress.reached = Some(ScenarioStage::Classified);

        let quote = offer::quote(case.principal_outstanding(), decision.discount_ceiling)?;
        progress.quote = Some(quote);
        progress.reached = Some(ScenarioStage::Computed);

        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
