//! Decides which settlement rule governs a case.

mod generative;
mod parse;
mod policy;
mod prompt;
mod rules;
mod schedule;

pub use generative::GenerativeClassifier;
pub use parse::DecisionParseError;
pub use schedule::DiscountSchedule;

use super::domain::{Case, PolicyContext, RuleDecision};
use crate::config::ClassifierKind;
use async_trait::async_trait;

/// Shared contract of the classification strategies.
#[async_trait]
pub trait RuleClassifier: Send + Sync {
    fn kind(&self) -> ClassifierKind;

    /// Whether `classify` reads the retrieved policy passages.
    fn needs_context(&self) -> bool;

    async fn classify(&self, case: &Case, context: &PolicyContext) -> RuleDecision;
}

/// Keyword and threshold encoding of the settlement policy.
#[derive(Debug, Clone, Default)]
pub struct DeterministicClassifier {
    schedule: DiscountSchedule,
}

impl DeterministicClassifier {
    pub fn new(schedule: DiscountSchedule) -> Self {
        Self { schedule }
    }

    pub fn decide(&self, case: &Case) -> RuleDecision {
        let signals = rules::hardship_signals(case);
        policy::decide_rule(case, &self.schedule, &signals)
    }
}

#[async_trait]
impl RuleClassifier for DeterministicClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Deterministic
    }

    fn needs_context(&self) -> bool {
        false
    }

    async fn classify(&self, case: &Case, _context: &PolicyContext) -> RuleDecision {
        self.decide(case)
    }
}
