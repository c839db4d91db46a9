use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ClassifierKind;
use crate::llm::{CompletionModel, ModelError};
use crate::workflows::settlement::classification::RuleClassifier;
use crate::workflows::settlement::domain::{
    BorrowerId, Case, LoanType, PolicyContext, RuleDecision, ScenarioId, SettlementRule,
};
use crate::workflows::settlement::policy::{PolicyRetrieval, RetrievalError};

pub(super) fn case(
    id: &str,
    loan_type: LoanType,
    principal: f64,
    days_past_due: u32,
    chat: &str,
) -> Case {
    Case::new(
        ScenarioId(id.to_string()),
        BorrowerId(format!("B-{id}")),
        loan_type,
        principal,
        days_past_due,
        chat,
    )
    .expect("valid case")
}

/// PL job loss, PL high delinquency and CC small balance.
pub(super) fn reference_cases() -> Vec<Case> {
    vec![
        case(
            "S-JOB",
            LoanType::PersonalLoan,
            100_000.0,
            30,
            "I lost my job last month",
        ),
        case(
            "S-DPD",
            LoanType::PersonalLoan,
            80_000.0,
            95,
            "no special circumstances",
        ),
        case("S-CARD", LoanType::CreditCard, 45_000.0, 120, ""),
    ]
}

pub(super) fn scenario_ids(cases: &[Case]) -> Vec<String> {
    cases
        .iter()
        .map(|case| case.scenario_id().0.clone())
        .collect()
}

pub(super) enum ModelBehavior {
    Reply(String),
    Fail,
    Stall(Duration),
}

/// Completion model that plays back one canned behavior and records prompts.
pub(super) struct ScriptedModel {
    behavior: ModelBehavior,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(super) fn replying(reply: &str) -> Arc<Self> {
        Self::with(ModelBehavior::Reply(reply.to_string()))
    }

    pub(super) fn with(behavior: ModelBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt mutex poisoned").clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts
            .lock()
            .expect("prompt mutex poisoned")
            .push(prompt.to_string());

        match &self.behavior {
            ModelBehavior::Reply(reply) => Ok(reply.clone()),
            ModelBehavior::Fail => Err(ModelError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            }),
            ModelBehavior::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(r#"{"rule_name": "Standard", "discount_percent": 0.2}"#.to_string())
            }
        }
    }
}

/// Retriever returning fixed passages, failing for chosen scenario queries.
#[derive(Default)]
pub(super) struct StubRetriever {
    passages: Vec<String>,
    fail_when_query_contains: Option<String>,
    calls: AtomicUsize,
}

impl StubRetriever {
    pub(super) fn with_passages(passages: &[&str]) -> Self {
        Self {
            passages: passages.iter().map(|passage| passage.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(super) fn failing_on(mut self, needle: &str) -> Self {
        self.fail_when_query_contains = Some(needle.to_string());
        self
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyRetrieval for StubRetriever {
    async fn retrieve(&self, query: &str) -> Result<PolicyContext, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_when_query_contains {
            Some(needle) if query.contains(needle.as_str()) => {
                Err(RetrievalError::Backend("vector store offline".to_string()))
            }
            _ => Ok(PolicyContext::new(self.passages.clone())),
        }
    }
}

/// Classifier with programmable misbehavior keyed on the chat text.
pub(super) struct TroubledClassifier {
    pub(super) contexts: Mutex<Vec<PolicyContext>>,
}

impl TroubledClassifier {
    pub(super) const PANIC_MARKER: &'static str = "trigger-panic";
    pub(super) const OUT_OF_RANGE_MARKER: &'static str = "trigger-overdiscount";

    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self {
            contexts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl RuleClassifier for TroubledClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Generative
    }

    fn needs_context(&self) -> bool {
        true
    }

    async fn classify(&self, case: &Case, context: &PolicyContext) -> RuleDecision {
        self.contexts
            .lock()
            .expect("context mutex poisoned")
            .push(context.clone());

        if case.chat_text().contains(Self::PANIC_MARKER) {
            panic!("classifier exploded on {}", case.scenario_id());
        }
        if case.chat_text().contains(Self::OUT_OF_RANGE_MARKER) {
            return RuleDecision::new(SettlementRule::Standard, 1.5);
        }
        RuleDecision::new(SettlementRule::Standard, 0.20)
    }
}
