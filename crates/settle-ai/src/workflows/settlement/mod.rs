//! Settlement offer workflow: roster intake, policy retrieval, rule
//! classification and offer pricing for collections chat scenarios.

pub mod classification;
pub mod domain;
pub mod intake;
mod normalizer;
pub mod offer;
pub mod pipeline;
pub mod policy;
pub mod report;

#[cfg(test)]
mod tests;

pub use classification::{
    DecisionParseError, DeterministicClassifier, DiscountSchedule, GenerativeClassifier,
    RuleClassifier,
};
pub use domain::{
    BorrowerId, BorrowerRecord, Case, CaseError, ChatScenario, ChatTurn, LoanType, OfferResult,
    PolicyContext, RuleDecision, ScenarioId, SettlementRule,
};
pub use intake::{CaseIntake, IntakeBatch, IntakeError, SkippedScenario};
pub use offer::{compute_offer, OfferError, OfferQuote, OFFER_INCREMENT};
pub use pipeline::{OfferOutcome, OfferPipeline, ScenarioStage};
pub use policy::{PolicyRetrieval, PolicyRetriever, RetrievalError};
pub use report::{BatchSummary, ReportError};
