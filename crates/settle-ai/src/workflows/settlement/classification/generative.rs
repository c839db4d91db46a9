use super::super::domain::{Case, PolicyContext, RuleDecision};
use super::parse::{parse_decision, within_policy};
use super::prompt::render_prompt;
use super::schedule::DiscountSchedule;
use super::RuleClassifier;
use crate::config::ClassifierKind;
use crate::llm::CompletionModel;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Asks a language model which rule applies. Never fails: anything that goes
/// wrong with the call or its reply yields [`RuleDecision::fallback`], and so
/// does a reply that picks a rule or discount the schedule does not grant.
pub struct GenerativeClassifier {
    model: Arc<dyn CompletionModel>,
    schedule: DiscountSchedule,
    timeout: Duration,
}

impl GenerativeClassifier {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            model,
            schedule: DiscountSchedule::standard(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RuleClassifier for GenerativeClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Generative
    }

    fn needs_context(&self) -> bool {
        true
    }

    async fn classify(&self, case: &Case, context: &PolicyContext) -> RuleDecision {
        let prompt = render_prompt(case, context, &self.schedule);

        let reply = match tokio::time::timeout(self.timeout, self.model.complete(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                warn!(
                    scenario_id = %case.scenario_id(),
                    error = %err,
                    "model call failed, using fallback rule"
                );
                return RuleDecision::fallback();
            }
            Err(_) => {
                warn!(
                    scenario_id = %case.scenario_id(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "model call timed out, using fallback rule"
                );
                return RuleDecision::fallback();
            }
        };

        let decision = parse_decision(&reply)
            .and_then(|decision| within_policy(decision, case.loan_type(), &self.schedule));

        match decision {
            Ok(decision) => {
                debug!(
                    scenario_id = %case.scenario_id(),
                    rule = decision.rule_name(),
                    discount = decision.discount_ceiling,
                    "model selected rule"
                );
                decision
            }
            Err(err) => {
                warn!(
                    scenario_id = %case.scenario_id(),
                    error = %err,
                    "unusable model reply, using fallback rule"
                );
                RuleDecision::fallback()
            }
        }
    }
}
