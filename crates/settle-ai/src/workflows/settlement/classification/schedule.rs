use super::super::domain::{LoanType, SettlementRule};

/// Discount ceilings and thresholds the settlement policy publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountSchedule {
    pub personal_job_loss: f64,
    pub personal_medical: f64,
    pub personal_high_delinquency: f64,
    pub personal_standard: f64,
    pub card_small_balance: f64,
    pub card_high_delinquency: f64,
    pub card_standard: f64,
    /// Card balances strictly below this amount fall under the small balance rule.
    pub small_balance_threshold: f64,
    /// Accounts strictly beyond this many days past due are highly delinquent.
    pub high_delinquency_dpd: u32,
}

impl DiscountSchedule {
    /// Ceilings from the current settlement policy.
    pub fn standard() -> Self {
        Self {
            personal_job_loss: 0.50,
            personal_medical: 0.45,
            personal_high_delinquency: 0.35,
            personal_standard: 0.20,
            card_small_balance: 0.10,
            card_high_delinquency: 0.50,
            card_standard: 0.30,
            small_balance_threshold: 50_000.0,
            high_delinquency_dpd: 90,
        }
    }

    /// Highest discount the policy grants under `rule` for this kind of
    /// account, or `None` when the rule cannot apply to it.
    pub fn ceiling(&self, rule: SettlementRule, loan_type: LoanType) -> Option<f64> {
        match (loan_type, rule) {
            (LoanType::PersonalLoan, SettlementRule::JobLoss) => Some(self.personal_job_loss),
            (LoanType::PersonalLoan, SettlementRule::Medical) => Some(self.personal_medical),
            (LoanType::PersonalLoan, SettlementRule::HighDelinquency) => {
                Some(self.personal_high_delinquency)
            }
            (LoanType::PersonalLoan, SettlementRule::Standard) => Some(self.personal_standard),
            (LoanType::CreditCard, SettlementRule::SmallBalance) => Some(self.card_small_balance),
            (LoanType::CreditCard, SettlementRule::HighDelinquency) => {
                Some(self.card_high_delinquency)
            }
            (LoanType::CreditCard, SettlementRule::Standard) => Some(self.card_standard),
            _ => None,
        }
    }
}

impl Default for DiscountSchedule {
    fn default() -> Self {
        Self::standard()
    }
}
