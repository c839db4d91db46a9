use super::super::domain::{Case, LoanType, RuleDecision, SettlementRule};
use super::rules::HardshipSignals;
use super::schedule::DiscountSchedule;

/// First matching rule wins; rules never stack.
pub(crate) fn decide_rule(
    case: &Case,
    schedule: &DiscountSchedule,
    signals: &HardshipSignals,
) -> RuleDecision {
    let highly_delinquent = case.days_past_due() > schedule.high_delinquency_dpd;

    match case.loan_type() {
        LoanType::PersonalLoan => {
            if signals.job_loss {
                RuleDecision::new(SettlementRule::JobLoss, schedule.personal_job_loss)
            } else if signals.medical {
                RuleDecision::new(SettlementRule::Medical, schedule.personal_medical)
            } else if highly_delinquent {
                RuleDecision::new(
                    SettlementRule::HighDelinquency,
                    schedule.personal_high_delinquency,
                )
            } else {
                RuleDecision::new(SettlementRule::Standard, schedule.personal_standard)
            }
        }
        LoanType::CreditCard => {
            if case.principal_outstanding() < schedule.small_balance_threshold {
                RuleDecision::new(SettlementRule::SmallBalance, schedule.card_small_balance)
            } else if highly_delinquent {
                RuleDecision::new(
                    SettlementRule::HighDelinquency,
                    schedule.card_high_delinquency,
                )
            } else {
                RuleDecision::new(SettlementRule::Standard, schedule.card_standard)
            }
        }
    }
}
