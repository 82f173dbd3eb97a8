// SPDX-License-Identifier: AGPL-3.0-or-later
//! Document × vocabulary count table for multi-bag pseudo-text.
//!
//! An MS2 "document" is one MS1 peak; its "words" are discretized fragment
//! and neutral-loss features, each belonging to exactly one bag. The corpus
//! stores one dense count row per document over the full vocabulary, with
//! the bag structure carried by the vocabulary itself.
//!
//! Document keys (`mass_rt` strings for LC-MS data) survive shuffling and
//! fold splitting, so every evaluation result can be traced back to the
//! originating peak.

/// One vocabulary term: display name plus the bag it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Display name, e.g. `fragment_119.0857`.
    pub name: String,
    /// Bag (feature-group) index.
    pub bag: usize,
}

/// Ordered, immutable vocabulary shared across a whole run.
///
/// Terms are grouped by bag: every term carries a bag index in
/// `[0, n_bags)`, and per-bag sizes are precomputed for the smoothing
/// denominators in training.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    terms: Vec<Term>,
    bag_sizes: Vec<usize>,
}

impl Vocabulary {
    /// Build a vocabulary from bag-tagged terms.
    #[must_use]
    pub fn new(terms: Vec<Term>) -> Self {
        let n_bags = terms.iter().map(|t| t.bag + 1).max().unwrap_or(0);
        let mut bag_sizes = vec![0usize; n_bags];
        for term in &terms {
            bag_sizes[term.bag] += 1;
        }
        Self { terms, bag_sizes }
    }

    /// Number of terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True when the vocabulary has no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of bags (feature groups).
    #[must_use]
    pub fn n_bags(&self) -> usize {
        self.bag_sizes.len()
    }

    /// Bag index of term `w`.
    #[must_use]
    pub fn bag_of(&self, w: usize) -> usize {
        self.terms[w].bag
    }

    /// Number of terms in bag `b` (the `V_b` smoothing denominator).
    #[must_use]
    pub fn bag_size(&self, b: usize) -> usize {
        self.bag_sizes[b]
    }

    /// Term at index `w`.
    #[must_use]
    pub fn term(&self, w: usize) -> &Term {
        &self.terms[w]
    }
}

/// Document collection: one dense count row per document.
#[derive(Debug, Clone)]
pub struct Corpus {
    doc_keys: Vec<String>,
    rows: Vec<Vec<u32>>,
}

impl Corpus {
    /// Create from document keys and count rows. Rows must all have the
    /// same width (the vocabulary size).
    #[must_use]
    pub fn from_rows(doc_keys: Vec<String>, rows: Vec<Vec<u32>>) -> Self {
        assert_eq!(doc_keys.len(), rows.len(), "one key per row");
        if let Some(width) = rows.first().map(Vec::len) {
            assert!(
                rows.iter().all(|r| r.len() == width),
                "count rows must share one width"
            );
        }
        Self { doc_keys, rows }
    }

    /// Number of documents.
    #[must_use]
    pub fn n_docs(&self) -> usize {
        self.rows.len()
    }

    /// Number of vocabulary terms (row width), 0 for an empty corpus.
    #[must_use]
    pub fn n_terms(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Document key for row `d`.
    #[must_use]
    pub fn key(&self, d: usize) -> &str {
        &self.doc_keys[d]
    }

    /// Count row for document `d`.
    #[must_use]
    pub fn counts(&self, d: usize) -> &[u32] {
        &self.rows[d]
    }

    /// Expand document `d`'s counts into a word-index multiset: one entry
    /// per token occurrence, in vocabulary order.
    #[must_use]
    pub fn word_indices(&self, d: usize) -> Vec<usize> {
        let mut words = Vec::with_capacity(self.doc_tokens(d));
        for (w, &count) in self.rows[d].iter().enumerate() {
            for _ in 0..count {
                words.push(w);
            }
        }
        words
    }

    /// Total token count of document `d` (occurrences, not distinct terms).
    #[must_use]
    pub fn doc_tokens(&self, d: usize) -> usize {
        self.rows[d].iter().map(|&c| c as usize).sum()
    }

    /// Total token count over the whole corpus.
    #[must_use]
    pub fn total_tokens(&self) -> usize {
        (0..self.n_docs()).map(|d| self.doc_tokens(d)).sum()
    }

    /// New corpus containing the given rows, in the given order.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            doc_keys: indices.iter().map(|&d| self.doc_keys[d].clone()).collect(),
            rows: indices.iter().map(|&d| self.rows[d].clone()).collect(),
        }
    }
}
