//! Submission CSV, JSONL audit trail and run summary.

use super::domain::OfferResult;
use super::intake::SkippedScenario;
use super::pipeline::OfferOutcome;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode submission CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to encode audit record: {0}")]
    Audit(#[from] serde_json::Error),
}

/// Write `scenario_id,minimum_acceptable_offer` rows in the given order.
pub fn write_results<W: Write>(writer: W, results: &[OfferResult]) -> Result<(), ReportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for result in results {
        csv.serialize(result)?;
    }
    if results.is_empty() {
        csv.write_record(["scenario_id", "minimum_acceptable_offer"])?;
    }
    csv.flush().map_err(|source| ReportError::Io {
        path: "<writer>".to_string(),
        source,
    })
}

pub fn write_results_to_path(path: &Path, results: &[OfferResult]) -> Result<(), ReportError> {
    let file = create(path)?;
    write_results(BufWriter::new(file), results)
}

/// One JSON object per line, one line per outcome.
pub fn write_audit<W: Write>(mut writer: W, outcomes: &[OfferOutcome]) -> Result<(), ReportError> {
    for outcome in outcomes {
        serde_json::to_writer(&mut writer, outcome)?;
        writer.write_all(b"\n").map_err(|source| ReportError::Io {
            path: "<writer>".to_string(),
            source,
        })?;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: "<writer>".to_string(),
        source,
    })
}

pub fn write_audit_to_path(path: &Path, outcomes: &[OfferOutcome]) -> Result<(), ReportError> {
    let file = create(path)?;
    write_audit(BufWriter::new(file), outcomes)
}

fn create(path: &Path) -> Result<File, ReportError> {
    File::create(path).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Counts for the end-of-run log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub fallback: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[OfferOutcome], skipped: &[SkippedScenario]) -> Self {
        let failed = outcomes.iter().filter(|outcome| outcome.is_failed()).count();
        Self {
            total: outcomes.len() + skipped.len(),
            completed: outcomes.len() - failed,
            failed,
            fallback: outcomes
                .iter()
                .filter(|outcome| !outcome.is_failed() && outcome.used_fallback())
                .count(),
            skipped: skipped.len(),
        }
    }

    pub fn log(&self) {
        info!(
            total = self.total,
            completed = self.completed,
            failed = self.failed,
            fallback = self.fallback,
            skipped = self.skipped,
            "settlement batch finished"
        );
    }
}
