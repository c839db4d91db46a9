use serde::{Deserialize, Serialize};
use std::fmt;

use super::normalizer::normalize_label;

/// Identifier wrapper for a chat scenario.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub String);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for a borrower account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BorrowerId(pub String);

impl fmt::Display for BorrowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    PersonalLoan,
    CreditCard,
}

impl LoanType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PersonalLoan => "Personal Loan",
            Self::CreditCard => "Credit Card",
        }
    }

    /// Accepts the labels used by the borrower roster, ignoring case and spacing.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "personal loan" | "personal_loan" | "personalloan" | "pl" => Some(Self::PersonalLoan),
            "credit card" | "credit_card" | "creditcard" | "cc" => Some(Self::CreditCard),
            _ => None,
        }
    }
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Account attributes as held in the borrower roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowerRecord {
    pub borrower_id: BorrowerId,
    pub loan_type: String,
    pub principal_outstanding: f64,
    pub days_past_due: i64,
}

/// Single turn of a collections chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Transcript for one negotiation scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatScenario {
    pub scenario_id: ScenarioId,
    pub borrower_id: BorrowerId,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

impl ChatScenario {
    /// Borrower-authored turns joined by a single space, in transcript order.
    pub fn borrower_text(&self) -> String {
        self.chat_history
            .iter()
            .filter(|turn| turn.role == "user")
            .map(|turn| turn.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reasons a scenario cannot be turned into a [`Case`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaseError {
    #[error("borrower {0} not found in roster")]
    MissingBorrower(BorrowerId),
    #[error("roster row for borrower {borrower_id} is unusable: {reason}")]
    UnusableBorrower {
        borrower_id: BorrowerId,
        reason: String,
    },
    #[error("unsupported loan type '{0}'")]
    UnknownLoanType(String),
    #[error("principal outstanding must be a positive amount (got {0})")]
    InvalidPrincipal(f64),
    #[error("days past due cannot be negative (got {0})")]
    NegativeDaysPastDue(i64),
}

/// Everything the pipeline knows about one scenario. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Case {
    scenario_id: ScenarioId,
    borrower_id: BorrowerId,
    loan_type: LoanType,
    principal_outstanding: f64,
    days_past_due: u32,
    chat_text: String,
}

impl Case {
    pub fn new(
        scenario_id: ScenarioId,
        borrower_id: BorrowerId,
        loan_type: LoanType,
        principal_outstanding: f64,
        days_past_due: u32,
        chat_text: impl Into<String>,
    ) -> Result<Self, CaseError> {
        if !principal_outstanding.is_finite() || principal_outstanding <= 0.0 {
            return Err(CaseError::InvalidPrincipal(principal_outstanding));
        }

        Ok(Self {
            scenario_id,
            borrower_id,
            loan_type,
            principal_outstanding,
            days_past_due,
            chat_text: chat_text.into(),
        })
    }

    /// Join a transcript with its roster entry.
    pub fn from_records(
        scenario: &ChatScenario,
        borrower: &BorrowerRecord,
    ) -> Result<Self, CaseError> {
        let loan_type = LoanType::parse(&borrower.loan_type)
            .ok_or_else(|| CaseError::UnknownLoanType(borrower.loan_type.clone()))?;
        let days_past_due = u32::try_from(borrower.days_past_due)
            .map_err(|_| CaseError::NegativeDaysPastDue(borrower.days_past_due))?;

        Self::new(
            scenario.scenario_id.clone(),
            borrower.borrower_id.clone(),
            loan_type,
            borrower.principal_outstanding,
            days_past_due,
            scenario.borrower_text(),
        )
    }

    pub fn scenario_id(&self) -> &ScenarioId {
        &self.scenario_id
    }

    pub fn borrower_id(&self) -> &BorrowerId {
        &self.borrower_id
    }

    pub fn loan_type(&self) -> LoanType {
        self.loan_type
    }

    pub fn principal_outstanding(&self) -> f64 {
        self.principal_outstanding
    }

    pub fn days_past_due(&self) -> u32 {
        self.days_past_due
    }

    pub fn chat_text(&self) -> &str {
        &self.chat_text
    }

    /// Search string handed to the policy retriever.
    pub fn retrieval_query(&self) -> String {
        format!(
            "{} DPD {} {}",
            self.loan_type.label(),
            self.days_past_due,
            self.chat_text
        )
        .trim_end()
        .to_string()
    }
}

/// Policy passages retrieved for one case, most relevant first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyContext {
    passages: Vec<String>,
}

impl PolicyContext {
    pub fn new(passages: Vec<String>) -> Self {
        Self { passages }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn passages(&self) -> &[String] {
        &self.passages
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Passages separated by blank lines, the layout used inside prompts.
    pub fn joined(&self) -> String {
        self.passages.join("\n\n")
    }
}

/// Settlement rules the policy defines, plus the classifier's safe default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementRule {
    JobLoss,
    Medical,
    HighDelinquency,
    SmallBalance,
    Standard,
    ErrorFallback,
}

impl SettlementRule {
    pub const fn label(self) -> &'static str {
        match self {
            Self::JobLoss => "Job Loss",
            Self::Medical => "Medical",
            Self::HighDelinquency => "High Delinquency",
            Self::SmallBalance => "Small Balance",
            Self::Standard => "Standard",
            Self::ErrorFallback => "Error Fallback",
        }
    }
}

impl fmt::Display for SettlementRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rule that governs a case and the maximum discount it allows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleDecision {
    pub rule: SettlementRule,
    pub discount_ceiling: f64,
}

impl RuleDecision {
    pub const FALLBACK_DISCOUNT: f64 = 0.20;

    pub const fn new(rule: SettlementRule, discount_ceiling: f64) -> Self {
        Self {
            rule,
            discount_ceiling,
        }
    }

    pub const fn fallback() -> Self {
        Self::new(SettlementRule::ErrorFallback, Self::FALLBACK_DISCOUNT)
    }

    pub fn rule_name(&self) -> &'static str {
        self.rule.label()
    }

    pub fn is_fallback(&self) -> bool {
        self.rule == SettlementRule::ErrorFallback
    }
}

/// Final answer for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferResult {
    pub scenario_id: ScenarioId,
    pub minimum_acceptable_offer: u64,
}

impl OfferResult {
    /// Emitted when a scenario fails partway through the pipeline.
    pub fn placeholder(scenario_id: ScenarioId) -> Self {
        Self {
            scenario_id,
            minimum_acceptable_offer: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(turns: &[(&str, &str)]) -> ChatScenario {
        ChatScenario {
            scenario_id: ScenarioId("S-1".to_string()),
            borrower_id: BorrowerId("B-1".to_string()),
            chat_history: turns
                .iter()
                .map(|(role, content)| ChatTurn {
                    role: role.to_string(),
                    content: content.to_string(),
                })
                .collect(),
        }
    }

    fn borrower(loan_type: &str, principal: f64, dpd: i64) -> BorrowerRecord {
        BorrowerRecord {
            borrower_id: BorrowerId("B-1".to_string()),
            loan_type: loan_type.to_string(),
            principal_outstanding: principal,
            days_past_due: dpd,
        }
    }

    #[test]
    fn borrower_text_joins_only_user_turns_in_order() {
        let scenario = scenario(&[
            ("assistant", "How can we help?"),
            ("user", "I lost my job"),
            ("assistant", "Sorry to hear that."),
            ("user", "and I was in hospital"),
        ]);
        assert_eq!(scenario.borrower_text(), "I lost my job and I was in hospital");
    }

    #[test]
    fn loan_type_parse_accepts_roster_variants() {
        assert_eq!(LoanType::parse("Personal Loan"), Some(LoanType::PersonalLoan));
        assert_eq!(LoanType::parse("  credit   CARD "), Some(LoanType::CreditCard));
        assert_eq!(LoanType::parse("CC"), Some(LoanType::CreditCard));
        assert_eq!(LoanType::parse("Mortgage"), None);
    }

    #[test]
    fn case_from_records_validates_roster_values() {
        let chat = scenario(&[("user", "hello")]);

        let case = Case::from_records(&chat, &borrower("Credit Card", 45_000.0, 120))
            .expect("valid case");
        assert_eq!(case.loan_type(), LoanType::CreditCard);
        assert_eq!(case.days_past_due(), 120);
        assert_eq!(case.retrieval_query(), "Credit Card DPD 120 hello");

        assert_eq!(
            Case::from_records(&chat, &borrower("Auto Loan", 1.0, 1)),
            Err(CaseError::UnknownLoanType("Auto Loan".to_string()))
        );
        assert_eq!(
            Case::from_records(&chat, &borrower("Personal Loan", 0.0, 1)),
            Err(CaseError::InvalidPrincipal(0.0))
        );
        assert_eq!(
            Case::from_records(&chat, &borrower("Personal Loan", 10.0, -3)),
            Err(CaseError::NegativeDaysPastDue(-3))
        );
    }

    #[test]
    fn retrieval_query_without_chat_has_no_trailing_space() {
        let case = Case::from_records(&scenario(&[]), &borrower("Personal Loan", 5_000.0, 30))
            .expect("valid case");
        assert_eq!(case.retrieval_query(), "Personal Loan DPD 30");
    }
}
