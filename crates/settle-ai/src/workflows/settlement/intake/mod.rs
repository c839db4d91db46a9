//! Joins the borrower roster with chat transcripts to produce pipeline cases.

mod parser;

use super::domain::{BorrowerId, BorrowerRecord, Case, CaseError, ChatScenario, ScenarioId};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug)]
pub enum IntakeError {
    Io {
        path: String,
        source: std::io::Error,
    },
    Roster(csv::Error),
    Scenarios(serde_json::Error),
    DuplicateBorrower(BorrowerId),
}

impl std::fmt::Display for IntakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakeError::Io { path, source } => write!(f, "failed to read {path}: {source}"),
            IntakeError::Roster(err) => write!(f, "invalid borrower roster CSV: {err}"),
            IntakeError::Scenarios(err) => write!(f, "invalid chat scenarios JSON: {err}"),
            IntakeError::DuplicateBorrower(id) => {
                write!(f, "borrower {id} appears more than once in the roster")
            }
        }
    }
}

impl std::error::Error for IntakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IntakeError::Io { source, .. } => Some(source),
            IntakeError::Roster(err) => Some(err),
            IntakeError::Scenarios(err) => Some(err),
            IntakeError::DuplicateBorrower(_) => None,
        }
    }
}

impl From<csv::Error> for IntakeError {
    fn from(err: csv::Error) -> Self {
        Self::Roster(err)
    }
}

impl From<serde_json::Error> for IntakeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Scenarios(err)
    }
}

/// Scenario that could not be turned into a case.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedScenario {
    pub scenario_id: ScenarioId,
    pub reason: CaseError,
}

/// Cases ready for the pipeline plus the scenarios left out.
#[derive(Debug, Default)]
pub struct IntakeBatch {
    pub cases: Vec<Case>,
    pub skipped: Vec<SkippedScenario>,
}

/// Loaded roster and transcripts, keyed for lookup.
pub struct CaseIntake {
    borrowers: HashMap<BorrowerId, BorrowerRecord>,
    /// Borrowers whose roster row could not be decoded, with the reason.
    unusable: HashMap<BorrowerId, String>,
    scenarios: Vec<ChatScenario>,
}

impl CaseIntake {
    pub fn from_paths<B: AsRef<Path>, S: AsRef<Path>>(
        borrowers: B,
        scenarios: S,
    ) -> Result<Self, IntakeError> {
        let roster = open(borrowers.as_ref())?;
        let transcripts = open(scenarios.as_ref())?;
        Self::from_readers(roster, transcripts)
    }

    /// Duplicate borrower IDs abort the load; undecodable rows only take
    /// their own scenarios out of the batch.
    pub fn from_readers<B: Read, S: Read>(
        borrowers: B,
        scenarios: S,
    ) -> Result<Self, IntakeError> {
        let parsed = parser::parse_borrowers(borrowers)?;

        let mut roster = HashMap::new();
        for record in parsed.records {
            if roster.contains_key(&record.borrower_id) {
                return Err(IntakeError::DuplicateBorrower(record.borrower_id));
            }
            roster.insert(record.borrower_id.clone(), record);
        }

        let mut unusable = HashMap::new();
        for row in parsed.rejected {
            warn!(
                line = row.line,
                borrower_id = row.borrower_id.as_ref().map(|id| id.0.as_str()),
                reason = %row.reason,
                "dropping unusable roster row"
            );
            if let Some(id) = row.borrower_id {
                if roster.contains_key(&id) || unusable.contains_key(&id) {
                    return Err(IntakeError::DuplicateBorrower(id));
                }
                unusable.insert(id, row.reason);
            }
        }

        let scenarios = parser::parse_scenarios(scenarios)?;
        debug!(
            borrowers = roster.len(),
            unusable = unusable.len(),
            scenarios = scenarios.len(),
            "loaded settlement inputs"
        );

        Ok(Self {
            borrowers: roster,
            unusable,
            scenarios,
        })
    }

    pub fn borrower_count(&self) -> usize {
        self.borrowers.len()
    }

    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }

    /// Build one case per scenario, in transcript order. Scenarios without a
    /// usable roster entry are skipped and reported.
    pub fn into_batch(self) -> IntakeBatch {
        let mut batch = IntakeBatch::default();

        for scenario in &self.scenarios {
            let case = match self.borrowers.get(&scenario.borrower_id) {
                Some(borrower) => Case::from_records(scenario, borrower),
                None => Err(self.absent_borrower(&scenario.borrower_id)),
            };

            match case {
                Ok(case) => batch.cases.push(case),
                Err(reason) => {
                    warn!(scenario_id = %scenario.scenario_id, %reason, "skipping scenario");
                    batch.skipped.push(SkippedScenario {
                        scenario_id: scenario.scenario_id.clone(),
                        reason,
                    });
                }
            }
        }

        batch
    }

    fn absent_borrower(&self, id: &BorrowerId) -> CaseError {
        match self.unusable.get(id) {
            Some(reason) => CaseError::UnusableBorrower {
                borrower_id: id.clone(),
                reason: reason.clone(),
            },
            None => CaseError::MissingBorrower(id.clone()),
        }
    }
}

fn open(path: &Path) -> Result<std::fs::File, IntakeError> {
    std::fs::File::open(path).map_err(|source| IntakeError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::settlement::domain::LoanType;

    const ROSTER: &str = "borrower_id,loan_type,principal_outstanding,dpd\n\
B001,Personal Loan,100000,30\n\
B002,Credit Card,45000,120\n\
B003,Auto Loan,20000,10\n";

    const SCENARIOS: &str = r#"[
        {"scenario_id": "S1", "borrower_id": "B001",
         "chat_history": [{"role": "user", "content": "I lost my job last month"}]},
        {"scenario_id": "S2", "borrower_id": "B999", "chat_history": []},
        {"scenario_id": "S3", "borrower_id": "B003", "chat_history": []},
        {"scenario_id": "S4", "borrower_id": "B002", "chat_history": []}
    ]"#;

    #[test]
    fn batch_keeps_order_and_skips_unusable_scenarios() {
        let intake = CaseIntake::from_readers(ROSTER.as_bytes(), SCENARIOS.as_bytes())
            .expect("inputs load");
        assert_eq!(intake.borrower_count(), 3);
        assert_eq!(intake.scenario_count(), 4);

        let batch = intake.into_batch();
        let ids: Vec<_> = batch
            .cases
            .iter()
            .map(|case| case.scenario_id().0.as_str())
            .collect();
        assert_eq!(ids, vec!["S1", "S4"]);
        assert_eq!(batch.cases[1].loan_type(), LoanType::CreditCard);

        assert_eq!(batch.skipped.len(), 2);
        assert_eq!(
            batch.skipped[0].reason,
            CaseError::MissingBorrower(BorrowerId("B999".to_string()))
        );
        assert_eq!(
            batch.skipped[1].reason,
            CaseError::UnknownLoanType("Auto Loan".to_string())
        );
    }

    #[test]
    fn duplicate_borrowers_are_rejected() {
        let roster = "borrower_id,loan_type,principal_outstanding,dpd\n\
B001,Personal Loan,1000,1\nB001,Credit Card,2000,2\n";
        match CaseIntake::from_readers(roster.as_bytes(), "[]".as_bytes()) {
            Err(IntakeError::DuplicateBorrower(id)) => assert_eq!(id.0, "B001"),
            other => panic!("expected duplicate borrower error, got {:?}", other.err()),
        }
    }

    #[test]
    fn bad_roster_row_only_skips_its_own_scenarios() {
        let roster = "borrower_id,loan_type,principal_outstanding,dpd\n\
B1,Personal Loan,100000,30\n\
B2,Credit Card,,5\n";
        let scenarios = r#"[
            {"scenario_id": "S1", "borrower_id": "B1", "chat_history": []},
            {"scenario_id": "S2", "borrower_id": "B2", "chat_history": []}
        ]"#;

        let intake = CaseIntake::from_readers(roster.as_bytes(), scenarios.as_bytes())
            .expect("a bad row does not abort the load");
        assert_eq!(intake.borrower_count(), 1);

        let batch = intake.into_batch();
        assert_eq!(batch.cases.len(), 1);
        assert_eq!(batch.cases[0].scenario_id().0, "S1");
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].scenario_id.0, "S2");
        assert!(matches!(
            &batch.skipped[0].reason,
            CaseError::UnusableBorrower { borrower_id, .. } if borrower_id.0 == "B2"
        ));
    }

    #[test]
    fn duplicate_of_a_rejected_row_is_still_rejected() {
        let roster = "borrower_id,loan_type,principal_outstanding,dpd\n\
B001,Personal Loan,1000,1\nB001,Credit Card,n/a,2\n";
        assert!(matches!(
            CaseIntake::from_readers(roster.as_bytes(), "[]".as_bytes()),
            Err(IntakeError::DuplicateBorrower(id)) if id.0 == "B001"
        ));
    }

    #[test]
    fn from_paths_propagates_io_errors() {
        let error = CaseIntake::from_paths("./does-not-exist.csv", "./nope.json")
            .err()
            .expect("expected io error");
        match error {
            IntakeError::Io { path, .. } => assert!(path.ends_with("does-not-exist.csv")),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
