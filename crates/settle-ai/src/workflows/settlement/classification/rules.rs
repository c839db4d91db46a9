use super::super::domain::Case;

pub(crate) const JOB_LOSS_PHRASES: &[&str] = &["job loss", "unemployment", "lost my job"];
pub(crate) const MEDICAL_PHRASES: &[&str] = &["hospital", "medical"];

/// Hardship mentions found in the borrower's own words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct HardshipSignals {
    pub job_loss: bool,
    pub medical: bool,
}

pub(crate) fn hardship_signals(case: &Case) -> HardshipSignals {
    let text = case.chat_text().to_lowercase();
    HardshipSignals {
        job_loss: mentions_any(&text, JOB_LOSS_PHRASES),
        medical: mentions_any(&text, MEDICAL_PHRASES),
    }
}

fn mentions_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::settlement::domain::{BorrowerId, LoanType, ScenarioId};

    fn case_with_chat(chat: &str) -> Case {
        Case::new(
            ScenarioId("S".to_string()),
            BorrowerId("B".to_string()),
            LoanType::PersonalLoan,
            10_000.0,
            10,
            chat,
        )
        .expect("valid case")
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let signals = hardship_signals(&case_with_chat("UNEMPLOYMENT benefits ran out"));
        assert!(signals.job_loss);
        assert!(!signals.medical);

        let signals = hardship_signals(&case_with_chat("my Medical bills, also I Lost My Job"));
        assert!(signals.job_loss);
        assert!(signals.medical);
    }

    #[test]
    fn unrelated_text_has_no_signals() {
        assert_eq!(
            hardship_signals(&case_with_chat("I just forgot to pay")),
            HardshipSignals::default()
        );
        assert_eq!(hardship_signals(&case_with_chat("")), HardshipSignals::default());
    }
}
