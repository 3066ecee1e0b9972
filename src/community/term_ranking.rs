//! TF-IDF term importance per community document.
//!
//! Weights use raw term counts, smoothed idf `ln((1 + n) / (1 + df)) + 1` and
//! L2-normalized rows. Terms found in more than `max_df` of the documents are
//! pruned before the vocabulary is capped at `max_features` by corpus count.
//!
//! Reported weights are rounded to three decimals with halves going away from
//! zero (`f64::round`). Python's `round` goes to the even neighbor instead, so
//! the last digit can differ on exact ties such as `0.0625`.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

static TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{2,}\b").expect("valid term pattern"));

fn term_counts(document: &str) -> HashMap<String, usize> {
    let lowered = document.to_lowercase();
    let mut counts = HashMap::new();
    for term in TERM_RE.find_iter(&lowered) {
        *counts.entry(term.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

fn round_weight(weight: f64) -> f64 {
    (weight * 1000.0).round() / 1000.0
}

/// Builds the pruned, capped vocabulary with each term's document frequency.
fn build_vocabulary(
    counts: &[HashMap<String, usize>],
    max_features: usize,
    max_df: f64,
) -> HashMap<String, usize> {
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    let mut corpus_count: HashMap<&str, usize> = HashMap::new();
    for document in counts {
        for (term, &count) in document {
            *document_frequency.entry(term.as_str()).or_insert(0) += 1;
            *corpus_count.entry(term.as_str()).or_insert(0) += count;
        }
    }

    let max_document_count = max_df * counts.len() as f64;
    let mut kept: Vec<(&str, usize)> = corpus_count
        .into_iter()
        .filter(|(term, _)| document_frequency[term] as f64 <= max_document_count)
        .collect();
    kept.sort_by(|(left_term, left_count), (right_term, right_count)| {
        right_count
            .cmp(left_count)
            .then_with(|| left_term.cmp(right_term))
    });
    kept.truncate(max_features);

    kept.into_iter()
        .map(|(term, _)| (term.to_string(), document_frequency[term]))
        .collect()
}

/// Top `top_n` terms of every document by descending weight (ties alphabetical),
/// weights rounded to three decimals. Every label is present in the result;
/// documents without surviving terms map to an empty list.
pub fn rank_terms<L: Ord + Clone>(
    documents: &BTreeMap<L, String>,
    top_n: usize,
    max_features: usize,
    max_df: f64,
) -> BTreeMap<L, Vec<(String, f64)>> {
    let labels: Vec<&L> = documents.keys().collect();
    let counts: Vec<HashMap<String, usize>> =
        documents.values().map(|document| term_counts(document)).collect();
    let vocabulary = build_vocabulary(&counts, max_features, max_df);
    debug!(
        "Term ranking: {} documents, vocabulary of {} terms",
        counts.len(),
        vocabulary.len()
    );

    let document_count = counts.len() as f64;
    labels
        .into_iter()
        .zip(counts.iter())
        .map(|(label, document)| {
            let mut weights: Vec<(String, f64)> = document
                .iter()
                .filter_map(|(term, &count)| {
                    let df = *vocabulary.get(term)? as f64;
                    let idf = ((1.0 + document_count) / (1.0 + df)).ln() + 1.0;
                    Some((term.clone(), count as f64 * idf))
                })
                .collect();

            let norm = weights
                .iter()
                .map(|(_, weight)| weight * weight)
                .sum::<f64>()
                .sqrt();
            if norm > 0.0 {
                for (_, weight) in weights.iter_mut() {
                    *weight /= norm;
                }
            }
            weights.retain(|(_, weight)| *weight > 0.0);
            weights.sort_by(|(left_term, left), (right_term, right)| {
                right
                    .total_cmp(left)
                    .then_with(|| left_term.cmp(right_term))
            });
            weights.truncate(top_n);

            let ranked = weights
                .into_iter()
                .map(|(term, weight)| (term, round_weight(weight)))
                .collect();
            (label.clone(), ranked)
        })
        .collect()
}
