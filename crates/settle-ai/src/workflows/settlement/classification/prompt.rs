use super::super::domain::{Case, PolicyContext};
use super::schedule::DiscountSchedule;

/// Instructions for the settlement officer model. The qualification rules
/// restate the policy so the model can fall back on them when retrieval
/// misses a clause.
pub(crate) fn render_prompt(
    case: &Case,
    context: &PolicyContext,
    schedule: &DiscountSchedule,
) -> String {
    let passages = if context.is_empty() {
        "(no policy clauses retrieved)".to_string()
    } else {
        context.joined()
    };

    format!(
        r#"You are a settlement officer at a consumer lending collections desk.
Apply the settlement policy strictly to find the maximum discount this borrower may receive.

Borrower details:
- Loan Type: {loan_type}
- Principal Outstanding: {principal:.2}
- Days Past Due: {dpd}
- Borrower Messages: "{chat}"

Relevant policy clauses:
{passages}

Qualification rules:
1. "Job Loss" applies only to a Personal Loan whose borrower mentions job loss, unemployment, or losing their job.
2. "Medical" applies only to a Personal Loan whose borrower mentions a hospital or medical situation.
3. "Small Balance" applies to a Credit Card with principal below {threshold:.0}; it overrides any delinquency rule.
4. "High Delinquency" applies when days past due exceed {dpd_limit}.
5. Otherwise apply "Standard".
Use the first rule that qualifies and report the maximum discount that rule allows, never an average.

Respond with ONLY a JSON object, no prose and no code fences:
{{"rule_name": "<one of Job Loss, Medical, Small Balance, High Delinquency, Standard>", "discount_percent": <fraction between 0.0 and 1.0, e.g. 0.50 for 50%>}}"#,
        loan_type = case.loan_type().label(),
        principal = case.principal_outstanding(),
        dpd = case.days_past_due(),
        chat = case.chat_text(),
        passages = passages,
        threshold = schedule.small_balance_threshold,
        dpd_limit = schedule.high_delinquency_dpd,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::settlement::domain::{BorrowerId, LoanType, ScenarioId};

    fn card_case() -> Case {
        Case::new(
            ScenarioId("S-9".to_string()),
            BorrowerId("B-9".to_string()),
            LoanType::CreditCard,
            45_000.0,
            120,
            "I can pay something next week",
        )
        .expect("valid case")
    }

    #[test]
    fn prompt_carries_case_attributes_and_passages() {
        let context = PolicyContext::new(vec![
            "Policy > Small Balance\nUnder 50,000: 10%.".to_string(),
            "Policy > High Delinquency\nDPD above 90: 50%.".to_string(),
        ]);
        let prompt = render_prompt(&card_case(), &context, &DiscountSchedule::standard());

        assert!(prompt.contains("- Loan Type: Credit Card"));
        assert!(prompt.contains("- Principal Outstanding: 45000.00"));
        assert!(prompt.contains("- Days Past Due: 120"));
        assert!(prompt.contains("\"I can pay something next week\""));
        assert!(prompt.contains("Under 50,000: 10%.\n\nPolicy > High Delinquency"));
        assert!(prompt.contains("principal below 50000"));
        assert!(prompt.contains("exceed 90"));
        assert!(prompt.contains(r#""rule_name""#));
        assert!(prompt.contains(r#""discount_percent""#));
    }

    #[test]
    fn prompt_marks_missing_context() {
        let prompt = render_prompt(
            &card_case(),
            &PolicyContext::empty(),
            &DiscountSchedule::standard(),
        );
        assert!(prompt.contains("(no policy clauses retrieved)"));
    }
}
