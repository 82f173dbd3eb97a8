// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cross-validation orchestration for held-out topic-model evaluation.
//!
//! Documents are partitioned into shuffled near-equal folds. Each fold is
//! held out in turn: the model trains on the complement, then every
//! held-out document is scored by an importance-sampling estimate of its
//! log marginal likelihood under the trained topic-word distributions and
//! the *prior* topic weights (never a posterior refit, so folds stay
//! comparable). Per-fold totals become perplexities, and the summary
//! averages over the full recorded sequence of fold results.
//!
//! Folds are independent: [`CrossValidation::run`] is the sequential
//! reference, [`CrossValidation::run_parallel`] fans folds out over scoped
//! threads and produces identical numbers. Per-document evaluation seeds
//! are derived from the document's row index, so scoring order cannot
//! change any result.
//!
//! A failed fold aborts the run with its fold index (and document key for
//! estimation failures). There are no retries and no partial summaries.

use crate::error::{Error, Result};
use crate::lda::corpus::{Corpus, Vocabulary};
use crate::lda::folds;
use crate::lda::gibbs::TrainedModel;
use crate::rng::Lcg64;

/// Gibbs sampling schedule for one training run.
///
/// The orchestrator overwrites `seed` with a per-fold value derived from
/// the run seed.
#[derive(Debug, Clone, Copy)]
pub struct TrainParams {
    /// Discarded burn-in sweeps.
    pub n_burn: usize,
    /// Post-burn-in sweeps.
    pub n_samples: usize,
    /// Retain every `n_thin`-th post-burn-in sweep.
    pub n_thin: usize,
    /// RNG seed for this training run.
    pub seed: u64,
}

/// Importance-sampling effort for one document estimate.
///
/// The orchestrator overwrites `seed` with a per-document value derived
/// from the run seed and the document's row index.
#[derive(Debug, Clone, Copy)]
pub struct EvalParams {
    /// Independent importance samples per document.
    pub num_samples: usize,
    /// Proposal refinement passes.
    pub iters: usize,
    /// RNG seed for this estimate.
    pub seed: u64,
}

/// Fits a topic model on a training subset.
pub trait ModelTrainer {
    /// Train on `corpus`, returning posterior-mean distributions.
    fn train(
        &self,
        corpus: &Corpus,
        vocab: &Vocabulary,
        k: usize,
        alpha: f64,
        beta: f64,
        params: &TrainParams,
    ) -> std::result::Result<TrainedModel, String>;
}

/// Estimates a held-out document's log marginal likelihood.
pub trait MarginalEstimator {
    /// Estimate `log p(words | model, topic_prior)`.
    ///
    /// Must return a finite value; an empty `words` slice scores 0.0.
    fn estimate(
        &self,
        words: &[usize],
        vocab: &Vocabulary,
        model: &TrainedModel,
        topic_prior: &[f64],
        params: &EvalParams,
    ) -> std::result::Result<f64, String>;
}

/// Full cross-validation configuration.
#[derive(Debug, Clone, Copy)]
pub struct CvConfig {
    /// Number of topics.
    pub k: usize,
    /// Symmetric Dirichlet concentration over topics.
    pub alpha: f64,
    /// Symmetric Dirichlet concentration over words.
    pub beta: f64,
    /// Number of folds.
    pub n_folds: usize,
    /// Master seed; fold shuffling and all per-fold/per-document seeds
    /// derive from it.
    pub seed: u64,
    /// Training schedule template.
    pub train: TrainParams,
    /// Evaluation effort template.
    pub eval: EvalParams,
}

/// One fold's evaluation outcome. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldResult {
    /// Fold index in `[0, n_folds)`.
    pub fold: usize,
    /// Sum of held-out per-document log marginal likelihoods.
    pub log_evidence: f64,
    /// Total word tokens scored in this fold.
    pub word_count: usize,
    /// `exp(-log_evidence / word_count)`.
    pub perplexity: f64,
}

/// Terminal artifact: means over all recorded folds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CvSummary {
    /// Arithmetic mean of per-fold log-evidence.
    pub mean_log_evidence: f64,
    /// Arithmetic mean of per-fold perplexity.
    pub mean_perplexity: f64,
}

/// Everything a run produces: the per-fold sequence plus its summary.
#[derive(Debug, Clone)]
pub struct CvReport {
    /// Per-fold results in fold order, all folds present.
    pub folds: Vec<FoldResult>,
    /// Means over `folds`.
    pub summary: CvSummary,
}

/// Combine recorded fold results into summary means.
///
/// Always computed from the complete sequence — never from the last fold
/// alone. Returns NaN means for an empty slice (a run never produces one;
/// the partitioner requires at least two folds).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn aggregate(fold_results: &[FoldResult]) -> CvSummary {
    let n = fold_results.len() as f64;
    CvSummary {
        mean_log_evidence: fold_results.iter().map(|f| f.log_evidence).sum::<f64>() / n,
        mean_perplexity: fold_results.iter().map(|f| f.perplexity).sum::<f64>() / n,
    }
}

/// Cross-validation driver over a trainer and an estimator.
#[derive(Debug, Clone)]
pub struct CrossValidation<T, E> {
    trainer: T,
    estimator: E,
}

impl<T: ModelTrainer, E: MarginalEstimator> CrossValidation<T, E> {
    /// Pair a trainer with an estimator.
    pub const fn new(trainer: T, estimator: E) -> Self {
        Self { trainer, estimator }
    }

    /// Run every fold sequentially. Reference implementation.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] before any training starts;
    /// [`Error::Training`], [`Error::Estimation`], or [`Error::EmptyFold`]
    /// abort the run with the offending fold's context.
    pub fn run(&self, corpus: &Corpus, vocab: &Vocabulary, cfg: &CvConfig) -> Result<CvReport> {
        let (folds, seeds) = self.prepare(corpus, cfg)?;
        let mut results = Vec::with_capacity(folds.len());
        for i in 0..folds.len() {
            results.push(self.evaluate_fold(corpus, vocab, cfg, &folds, i, seeds[i])?);
        }
        let summary = aggregate(&results);
        Ok(CvReport { folds: results, summary })
    }

    /// Run folds on scoped worker threads, one per fold.
    ///
    /// Numerically identical to [`Self::run`]: every fold and document seed
    /// is fixed up front, and results are collected in fold order.
    ///
    /// # Errors
    ///
    /// As [`Self::run`]; when several folds fail, the lowest-indexed
    /// failure is reported.
    pub fn run_parallel(
        &self,
        corpus: &Corpus,
        vocab: &Vocabulary,
        cfg: &CvConfig,
    ) -> Result<CvReport>
    where
        T: Sync,
        E: Sync,
    {
        let (folds, seeds) = self.prepare(corpus, cfg)?;
        let folds_ref = &folds;
        let outcomes: Vec<Result<FoldResult>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..folds_ref.len())
                .map(|i| {
                    let seed_pair = seeds[i];
                    scope.spawn(move || {
                        self.evaluate_fold(corpus, vocab, cfg, folds_ref, i, seed_pair)
                    })
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(i, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Error::Training {
                            fold: i,
                            message: "fold worker panicked".into(),
                        })
                    })
                })
                .collect()
        });

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            results.push(outcome?);
        }
        let summary = aggregate(&results);
        Ok(CvReport { folds: results, summary })
    }

    /// Validate configuration, partition rows, and fix per-fold seeds.
    #[allow(clippy::type_complexity)]
    fn prepare(&self, corpus: &Corpus, cfg: &CvConfig) -> Result<(Vec<Vec<usize>>, Vec<(u64, u64)>)> {
        if cfg.k == 0 {
            return Err(Error::InvalidConfig("topic count K must be positive".into()));
        }
        if cfg.alpha <= 0.0 || cfg.beta <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "Dirichlet concentrations must be positive (alpha = {}, beta = {})",
                cfg.alpha, cfg.beta
            )));
        }
        let mut rng = Lcg64::new(cfg.seed);
        let folds = folds::partition(corpus.n_docs(), cfg.n_folds, &mut rng)?;
        let seeds = folds.iter().map(|_| (rng.next_u64(), rng.next_u64())).collect();
        Ok((folds, seeds))
    }

    /// Train on the complement of fold `i`, then score its documents.
    #[allow(clippy::cast_precision_loss)]
    fn evaluate_fold(
        &self,
        corpus: &Corpus,
        vocab: &Vocabulary,
        cfg: &CvConfig,
        folds: &[Vec<usize>],
        i: usize,
        (train_seed, eval_seed): (u64, u64),
    ) -> Result<FoldResult> {
        let training = corpus.select(&folds::complement(folds, i));

        let mut train_params = cfg.train;
        train_params.seed = train_seed;
        let model = self
            .trainer
            .train(&training, vocab, cfg.k, cfg.alpha, cfg.beta, &train_params)
            .map_err(|message| Error::Training { fold: i, message })?;

        // Uniform prior over topics scaled to total mass K·alpha — the
        // prior alpha, not a posterior refit.
        let topic_prior = vec![cfg.alpha; cfg.k];

        let mut log_evidence = 0.0f64;
        let mut word_count = 0usize;
        for &d in &folds[i] {
            let words = corpus.word_indices(d);
            let mut eval_params = cfg.eval;
            eval_params.seed = eval_seed.wrapping_add(d as u64);
            let doc_ll = self
                .estimator
                .estimate(&words, vocab, &model, &topic_prior, &eval_params)
                .map_err(|message| Error::Estimation {
                    fold: i,
                    doc: corpus.key(d).to_string(),
                    message,
                })?;
            log_evidence += doc_ll;
            word_count += words.len();
        }

        if word_count == 0 {
            return Err(Error::EmptyFold { fold: i });
        }
        let perplexity = (-log_evidence / word_count as f64).exp();
        Ok(FoldResult {
            fold: i,
            log_evidence,
            word_count,
            perplexity,
        })
    }
}
