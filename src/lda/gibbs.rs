// SPDX-License-Identifier: AGPL-3.0-or-later
//! Collapsed Gibbs sampling for multi-bag latent Dirichlet allocation.
//!
//! Topics are shared across bags; word-topic counts are kept per bag, so
//! each topic carries one word distribution per feature group (fragments,
//! neutral losses, ...). The full conditional for a token of term `w` in
//! bag `b` of document `d` is
//!
//! ```text
//! p(z = k) ∝ (n_dk + α) · (n_kw[b] + β) / (n_k[b] + V_b·β)
//! ```
//!
//! with `V_b` the bag's vocabulary size. After burn-in, every `n_thin`-th
//! sweep is retained and the exposed topic-word and document-topic
//! distributions are posterior means over the retained sweeps.
//!
//! All randomness comes from the seeded crate LCG: identical seed, corpus,
//! and schedule give a bitwise-identical model.
//!
//! # References
//!
//! - Griffiths & Steyvers 2004, *PNAS* 101:5228-5235 (collapsed sampler)

use crate::lda::corpus::{Corpus, Vocabulary};
use crate::lda::cv::{ModelTrainer, TrainParams};
use crate::rng::Lcg64;

/// Trained multi-bag topic model: posterior-mean distributions.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    k: usize,
    n_terms: usize,
    /// Per bag: `K × V` row-major topic-word matrix. Entries for terms
    /// outside the bag are zero; rows sum to one over the bag's terms.
    topic_word: Vec<Vec<f64>>,
    /// `D × K` row-major document-topic matrix for the training documents.
    doc_topic: Vec<f64>,
    n_docs: usize,
}

impl TrainedModel {
    /// Assemble a model directly from known distributions.
    ///
    /// Used by evaluation code paths that score against externally supplied
    /// topic-word matrices (and by test stubs). Each bag matrix must be
    /// `K × n_terms` row-major; `doc_topic` must be `D × K` row-major.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any matrix has the wrong shape.
    pub fn from_distributions(
        k: usize,
        n_terms: usize,
        topic_word: Vec<Vec<f64>>,
        doc_topic: Vec<f64>,
    ) -> Result<Self, String> {
        if topic_word.iter().any(|m| m.len() != k * n_terms) {
            return Err(format!(
                "each bag matrix must have {k} x {n_terms} entries"
            ));
        }
        if doc_topic.len() % k.max(1) != 0 {
            return Err("doc_topic length must be a multiple of K".into());
        }
        let n_docs = if k == 0 { 0 } else { doc_topic.len() / k };
        Ok(Self {
            k,
            n_terms,
            topic_word,
            doc_topic,
            n_docs,
        })
    }

    /// Number of topics.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of bags.
    #[must_use]
    pub fn n_bags(&self) -> usize {
        self.topic_word.len()
    }

    /// Number of training documents.
    #[must_use]
    pub fn n_docs(&self) -> usize {
        self.n_docs
    }

    /// Topic-word matrix for one bag (`K × V` row-major).
    #[must_use]
    pub fn topic_word(&self, bag: usize) -> &[f64] {
        &self.topic_word[bag]
    }

    /// `p(w | k)` within the bag that owns term `w`.
    #[must_use]
    pub fn phi(&self, bag: usize, topic: usize, w: usize) -> f64 {
        self.topic_word[bag][topic * self.n_terms + w]
    }

    /// Document-topic distribution of training document `d`.
    #[must_use]
    pub fn doc_topic(&self, d: usize) -> &[f64] {
        &self.doc_topic[d * self.k..(d + 1) * self.k]
    }
}

/// Collapsed Gibbs trainer.
///
/// Stateless; each [`ModelTrainer::train`] call owns its RNG (seeded from
/// the params) and its count matrices, so concurrent fold training shares
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct GibbsTrainer;

struct Counts {
    k: usize,
    n_terms: usize,
    /// `D × K` row-major: tokens of doc d assigned to topic k.
    n_dk: Vec<u32>,
    /// Per bag, `K × V` row-major: tokens of term w assigned to topic k.
    n_kw: Vec<Vec<u32>>,
    /// Per bag, length K: total bag tokens assigned to topic k.
    n_k: Vec<Vec<u32>>,
}

impl Counts {
    fn new(n_docs: usize, n_terms: usize, k: usize, n_bags: usize) -> Self {
        Self {
            k,
            n_terms,
            n_dk: vec![0; n_docs * k],
            n_kw: vec![vec![0; k * n_terms]; n_bags],
            n_k: vec![vec![0; k]; n_bags],
        }
    }

    fn add(&mut self, d: usize, bag: usize, w: usize, topic: usize) {
        self.n_dk[d * self.k + topic] += 1;
        self.n_kw[bag][topic * self.n_terms + w] += 1;
        self.n_k[bag][topic] += 1;
    }

    fn remove(&mut self, d: usize, bag: usize, w: usize, topic: usize) {
        self.n_dk[d * self.k + topic] -= 1;
        self.n_kw[bag][topic * self.n_terms + w] -= 1;
        self.n_k[bag][topic] -= 1;
    }
}

impl ModelTrainer for GibbsTrainer {
    #[allow(clippy::cast_precision_loss)]
    fn train(
        &self,
        corpus: &Corpus,
        vocab: &Vocabulary,
        k: usize,
        alpha: f64,
        beta: f64,
        params: &TrainParams,
    ) -> Result<TrainedModel, String> {
        if corpus.n_docs() == 0 {
            return Err("empty training set".into());
        }
        if vocab.len() != corpus.n_terms() {
            return Err(format!(
                "vocabulary has {} terms but corpus rows have {}",
                vocab.len(),
                corpus.n_terms()
            ));
        }
        if k == 0 {
            return Err("topic count K must be positive".into());
        }
        if params.n_samples == 0 || params.n_thin == 0 {
            return Err("sampling schedule retains zero sweeps".into());
        }

        let n_docs = corpus.n_docs();
        let n_terms = vocab.len();
        let n_bags = vocab.n_bags();
        let mut rng = Lcg64::new(params.seed);

        // Token lists and random initial assignments.
        let docs: Vec<Vec<usize>> = (0..n_docs).map(|d| corpus.word_indices(d)).collect();
        let mut counts = Counts::new(n_docs, n_terms, k, n_bags);
        let mut z: Vec<Vec<usize>> = docs
            .iter()
            .enumerate()
            .map(|(d, words)| {
                words
                    .iter()
                    .map(|&w| {
                        let topic = rng.next_below(k);
                        counts.add(d, vocab.bag_of(w), w, topic);
                        topic
                    })
                    .collect()
            })
            .collect();

        let mut weights = vec![0.0f64; k];
        let mut sweep = |counts: &mut Counts, z: &mut Vec<Vec<usize>>, rng: &mut Lcg64| {
            for (d, words) in docs.iter().enumerate() {
                for (pos, &w) in words.iter().enumerate() {
                    let bag = vocab.bag_of(w);
                    let v_b = vocab.bag_size(bag) as f64;
                    let old = z[d][pos];
                    counts.remove(d, bag, w, old);
                    for (topic, weight) in weights.iter_mut().enumerate() {
                        let doc_term = f64::from(counts.n_dk[d * k + topic]) + alpha;
                        let word_term = (f64::from(counts.n_kw[bag][topic * n_terms + w])
                            + beta)
                            / (f64::from(counts.n_k[bag][topic]) + v_b * beta);
                        *weight = doc_term * word_term;
                    }
                    let new = rng.categorical(&weights);
                    z[d][pos] = new;
                    counts.add(d, bag, w, new);
                }
            }
        };

        for _ in 0..params.n_burn {
            sweep(&mut counts, &mut z, &mut rng);
        }

        let mut phi_acc = vec![vec![0.0f64; k * n_terms]; n_bags];
        let mut theta_acc = vec![0.0f64; n_docs * k];
        let mut retained = 0usize;
        for s in 0..params.n_samples {
            sweep(&mut counts, &mut z, &mut rng);
            if s % params.n_thin == 0 {
                accumulate(&counts, vocab, &docs, alpha, beta, &mut phi_acc, &mut theta_acc);
                retained += 1;
            }
        }

        let norm = retained as f64;
        for acc in &mut phi_acc {
            for v in acc.iter_mut() {
                *v /= norm;
            }
        }
        for v in &mut theta_acc {
            *v /= norm;
        }

        Ok(TrainedModel {
            k,
            n_terms,
            topic_word: phi_acc,
            doc_topic: theta_acc,
            n_docs,
        })
    }
}

/// Add the current sweep's smoothed distributions into the accumulators.
#[allow(clippy::cast_precision_loss)]
fn accumulate(
    counts: &Counts,
    vocab: &Vocabulary,
    docs: &[Vec<usize>],
    alpha: f64,
    beta: f64,
    phi_acc: &mut [Vec<f64>],
    theta_acc: &mut [f64],
) {
    let k = counts.k;
    let n_terms = counts.n_terms;
    for w in 0..n_terms {
        let bag = vocab.bag_of(w);
        let v_b = vocab.bag_size(bag) as f64;
        for topic in 0..k {
            let phi = (f64::from(counts.n_kw[bag][topic * n_terms + w]) + beta)
                / (f64::from(counts.n_k[bag][topic]) + v_b * beta);
            phi_acc[bag][topic * n_terms + w] += phi;
        }
    }
    for (d, words) in docs.iter().enumerate() {
        let n_d = words.len() as f64;
        let k_f = k as f64;
        for topic in 0..k {
            let theta = (f64::from(counts.n_dk[d * k + topic]) + alpha)
                / (n_d + k_f * alpha);
            theta_acc[d * k + topic] += theta;
        }
    }
}
