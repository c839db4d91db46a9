use super::splitter::{split_markdown, PolicyPassage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

/// Searchable form of the policy document. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyIndex {
    fingerprint: String,
    entries: Vec<IndexEntry>,
    document_frequency: BTreeMap<String, usize>,
    average_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IndexEntry {
    passage: PolicyPassage,
    term_counts: BTreeMap<String, u32>,
    length: usize,
}

/// Passage returned by a search, with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage<'a> {
    pub passage: &'a PolicyPassage,
    pub score: f64,
}

impl PolicyIndex {
    pub fn build(source: &str) -> Self {
        let entries: Vec<IndexEntry> = split_markdown(source)
            .into_iter()
            .map(|passage| {
                let tokens = tokenize(&passage.render());
                let mut term_counts = BTreeMap::new();
                for token in &tokens {
                    *term_counts.entry(token.clone()).or_insert(0) += 1;
                }
                IndexEntry {
                    passage,
                    term_counts,
                    length: tokens.len(),
                }
            })
            .collect();

        let mut document_frequency = BTreeMap::new();
        for entry in &entries {
            for term in entry.term_counts.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let average_length = if entries.is_empty() {
            0.0
        } else {
            entries.iter().map(|entry| entry.length).sum::<usize>() as f64 / entries.len() as f64
        };

        Self {
            fingerprint: fingerprint(source),
            entries,
            document_frequency,
            average_length,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether this index was built from exactly `source`.
    pub fn matches_source(&self, source: &str) -> bool {
        self.fingerprint == fingerprint(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// BM25 ranking of every passage against `query`, best first. Equal
    /// scores keep document order.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<ScoredPassage<'_>> {
        let terms: BTreeSet<String> = tokenize(query).into_iter().collect();

        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, self.score(entry, &terms)))
            .collect();
        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });

        scored
            .into_iter()
            .take(top_k)
            .map(|(position, score)| ScoredPassage {
                passage: &self.entries[position].passage,
                score,
            })
            .collect()
    }

    fn score(&self, entry: &IndexEntry, terms: &BTreeSet<String>) -> f64 {
        let total = self.entries.len() as f64;
        let length_ratio = if self.average_length > 0.0 {
            entry.length as f64 / self.average_length
        } else {
            0.0
        };

        terms
            .iter()
            .filter_map(|term| {
                let frequency = *entry.term_counts.get(term)? as f64;
                let df = *self.document_frequency.get(term).unwrap_or(&0) as f64;
                let idf = ((total - df + 0.5) / (df + 0.5) + 1.0).ln();
                let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * length_ratio);
                Some(idf * frequency * (BM25_K1 + 1.0) / (frequency + norm))
            })
            .sum()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn fingerprint(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
