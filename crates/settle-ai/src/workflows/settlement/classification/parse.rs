use super::super::domain::{LoanType, RuleDecision, SettlementRule};
use super::super::normalizer::normalize_label;
use super::schedule::DiscountSchedule;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Why a model reply could not be turned into a decision.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionParseError {
    #[error("reply is not a JSON object: {0}")]
    InvalidJson(String),
    #[error("unrecognized rule '{0}'")]
    UnknownRule(String),
    #[error("discount {0} is outside [0, 1]")]
    DiscountOutOfRange(f64),
    #[error("rule '{rule}' does not apply to {loan_type} accounts")]
    RuleNotApplicable {
        rule: SettlementRule,
        loan_type: LoanType,
    },
    #[error("discount {discount} exceeds the {rule} ceiling of {ceiling}")]
    AboveCeiling {
        rule: SettlementRule,
        discount: f64,
        ceiling: f64,
    },
}

/// Rounding slack allowed when a model echoes a ceiling back.
const CEILING_SLACK: f64 = 1e-9;

#[derive(Debug, Deserialize)]
struct DecisionPayload {
    rule_name: String,
    discount_percent: f64,
}

pub(crate) fn parse_decision(reply: &str) -> Result<RuleDecision, DecisionParseError> {
    let clean = strip_markdown_fences(reply);
    let fragment = extract_json_object(clean).unwrap_or(clean);
    let payload: DecisionPayload = serde_json::from_str(fragment)
        .map_err(|err| DecisionParseError::InvalidJson(err.to_string()))?;

    let rule = rule_for_label(&payload.rule_name)
        .ok_or_else(|| DecisionParseError::UnknownRule(payload.rule_name.clone()))?;

    let discount = payload.discount_percent;
    if !discount.is_finite() || !(0.0..=1.0).contains(&discount) {
        return Err(DecisionParseError::DiscountOutOfRange(discount));
    }

    Ok(RuleDecision::new(rule, discount))
}

/// A model may pick a milder discount than the policy allows, never a larger
/// one, and only under a rule the account's loan type actually has.
pub(crate) fn within_policy(
    decision: RuleDecision,
    loan_type: LoanType,
    schedule: &DiscountSchedule,
) -> Result<RuleDecision, DecisionParseError> {
    let ceiling = schedule.ceiling(decision.rule, loan_type).ok_or(
        DecisionParseError::RuleNotApplicable {
            rule: decision.rule,
            loan_type,
        },
    )?;

    if decision.discount_ceiling > ceiling + CEILING_SLACK {
        return Err(DecisionParseError::AboveCeiling {
            rule: decision.rule,
            discount: decision.discount_ceiling,
            ceiling,
        });
    }
    Ok(decision)
}

/// Drop ```json / ``` wrappers models like to add around JSON.
pub(crate) fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let clean = clean.strip_suffix("```").unwrap_or(clean);
    clean.trim()
}

/// Outermost `{...}` span, ignoring any prose around it.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start <= end).then(|| &text[start..=end])
}

static RULE_ALIASES: OnceLock<HashMap<String, SettlementRule>> = OnceLock::new();

pub(crate) fn rule_for_label(label: &str) -> Option<SettlementRule> {
    rule_aliases().get(&normalize_label(label)).copied()
}

fn rule_aliases() -> &'static HashMap<String, SettlementRule> {
    RULE_ALIASES.get_or_init(|| {
        const LABEL_TO_RULE: &[(&str, SettlementRule)] = &[
            ("Job Loss", SettlementRule::JobLoss),
            ("Job Loss (PL)", SettlementRule::JobLoss),
            ("Unemployment", SettlementRule::JobLoss),
            ("Medical", SettlementRule::Medical),
            ("Medical (PL)", SettlementRule::Medical),
            ("Medical Emergency", SettlementRule::Medical),
            ("Medical Hardship", SettlementRule::Medical),
            ("High Delinquency", SettlementRule::HighDelinquency),
            ("PL High Delinquency", SettlementRule::HighDelinquency),
            ("CC High Delinquency", SettlementRule::HighDelinquency),
            ("DPD > 90", SettlementRule::HighDelinquency),
            ("DPD>90", SettlementRule::HighDelinquency),
            ("Small Balance", SettlementRule::SmallBalance),
            ("CC Small Balance", SettlementRule::SmallBalance),
            ("Small Balance Rule", SettlementRule::SmallBalance),
            ("Standard", SettlementRule::Standard),
            ("Standard Case", SettlementRule::Standard),
            ("PL Standard", SettlementRule::Standard),
            ("CC Standard", SettlementRule::Standard),
        ];

        LABEL_TO_RULE
            .iter()
            .map(|(label, rule)| (normalize_label(label), *rule))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let decision =
            parse_decision(r#"{"rule_name": "Job Loss", "discount_percent": 0.5}"#).expect("valid");
        assert_eq!(decision, RuleDecision::new(SettlementRule::JobLoss, 0.5));
    }

    #[test]
    fn strips_code_fences_and_surrounding_prose() {
        let reply = "```json\n{\"rule_name\": \"Small Balance\", \"discount_percent\": 0.10}\n```";
        assert_eq!(
            parse_decision(reply).expect("fenced reply"),
            RuleDecision::new(SettlementRule::SmallBalance, 0.10)
        );

        let reply = "Here is the decision:\n{\"rule_name\": \"DPD > 90\", \"discount_percent\": 0.35}\nThanks.";
        assert_eq!(
            parse_decision(reply).expect("prose reply"),
            RuleDecision::new(SettlementRule::HighDelinquency, 0.35)
        );
    }

    #[test]
    fn aliases_map_onto_rule_labels() {
        assert_eq!(rule_for_label("medical  emergency"), Some(SettlementRule::Medical));
        assert_eq!(rule_for_label("STANDARD CASE"), Some(SettlementRule::Standard));
        assert_eq!(rule_for_label("Goodwill Waiver"), None);
    }

    #[test]
    fn malformed_replies_are_errors() {
        assert!(matches!(
            parse_decision("I think they deserve 50% off"),
            Err(DecisionParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_decision(r#"{"rule_name": "Standard"}"#),
            Err(DecisionParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_decision(r#"{"rule_name": "Standard", "discount_percent": "0.2"}"#),
            Err(DecisionParseError::InvalidJson(_))
        ));
        assert_eq!(
            parse_decision(r#"{"rule_name": "Goodwill", "discount_percent": 0.2}"#),
            Err(DecisionParseError::UnknownRule("Goodwill".to_string()))
        );
        assert_eq!(
            parse_decision(r#"{"rule_name": "Job Loss", "discount_percent": 50}"#),
            Err(DecisionParseError::DiscountOutOfRange(50.0))
        );
    }

    #[test]
    fn decisions_are_held_to_the_schedule() {
        let schedule = DiscountSchedule::standard();

        assert_eq!(
            within_policy(
                RuleDecision::new(SettlementRule::Standard, 0.95),
                LoanType::PersonalLoan,
                &schedule,
            ),
            Err(DecisionParseError::AboveCeiling {
                rule: SettlementRule::Standard,
                discount: 0.95,
                ceiling: 0.20,
            })
        );
        assert_eq!(
            within_policy(
                RuleDecision::new(SettlementRule::JobLoss, 0.5),
                LoanType::CreditCard,
                &schedule,
            ),
            Err(DecisionParseError::RuleNotApplicable {
                rule: SettlementRule::JobLoss,
                loan_type: LoanType::CreditCard,
            })
        );

        let milder = RuleDecision::new(SettlementRule::HighDelinquency, 0.25);
        assert_eq!(
            within_policy(milder, LoanType::CreditCard, &schedule),
            Ok(milder)
        );
        let exact = RuleDecision::new(SettlementRule::Medical, 0.45);
        assert_eq!(
            within_policy(exact, LoanType::PersonalLoan, &schedule),
            Ok(exact)
        );
    }
}
