use super::super::domain::{BorrowerId, BorrowerRecord, ChatScenario};
use serde::Deserialize;
use std::io::Read;

const BORROWER_ID_HEADERS: &[&str] = &["borrower_id", "Borrower ID"];

/// Roster row that could not be decoded into a [`BorrowerRecord`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RejectedRow {
    pub(crate) line: u64,
    pub(crate) borrower_id: Option<BorrowerId>,
    pub(crate) reason: String,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedRoster {
    pub(crate) records: Vec<BorrowerRecord>,
    pub(crate) rejected: Vec<RejectedRow>,
}

/// Decode the roster row by row. A bad row is set aside with whatever borrower
/// ID it carried; only an unreadable header or stream fails the whole roster.
pub(crate) fn parse_borrowers<R: Read>(reader: R) -> Result<ParsedRoster, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let id_column = headers
        .iter()
        .position(|header| BORROWER_ID_HEADERS.contains(&header));
    let mut roster = ParsedRoster::default();

    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) if matches!(err.kind(), csv::ErrorKind::UnequalLengths { .. }) => {
                roster.rejected.push(RejectedRow {
                    line: err.position().map_or(0, csv::Position::line),
                    borrower_id: None,
                    reason: err.to_string(),
                });
                continue;
            }
            Err(err) => return Err(err),
        };

        match record.deserialize::<BorrowerRow>(Some(&headers)) {
            Ok(row) => roster.records.push(BorrowerRecord {
                borrower_id: BorrowerId(row.borrower_id),
                loan_type: row.loan_type,
                principal_outstanding: row.principal_outstanding,
                days_past_due: row.days_past_due,
            }),
            Err(err) => roster.rejected.push(RejectedRow {
                line: record.position().map_or(0, csv::Position::line),
                borrower_id: id_column
                    .and_then(|column| record.get(column))
                    .filter(|id| !id.is_empty())
                    .map(|id| BorrowerId(id.to_string())),
                reason: err.to_string(),
            }),
        }
    }

    Ok(roster)
}

pub(crate) fn parse_scenarios<R: Read>(reader: R) -> Result<Vec<ChatScenario>, serde_json::Error> {
    serde_json::from_reader(reader)
}

#[derive(Debug, Deserialize)]
struct BorrowerRow {
    #[serde(alias = "Borrower ID")]
    borrower_id: String,
    #[serde(alias = "Loan Type")]
    loan_type: String,
    #[serde(alias = "principal", alias = "Principal Outstanding")]
    principal_outstanding: f64,
    #[serde(rename = "dpd", alias = "days_past_due", alias = "DPD")]
    days_past_due: i64,
}
