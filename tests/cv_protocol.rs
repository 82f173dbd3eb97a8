// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the cross-validation protocol: partition
//! invariants, orchestrator bookkeeping under stubs, scoring order
//! independence, aggregation, and the table-to-summary pipeline.

use spectopic::error::Error;
use spectopic::io::table::load_bags;
use spectopic::lda::corpus::{Corpus, Term, Vocabulary};
use spectopic::lda::cv::{
    aggregate, CrossValidation, CvConfig, EvalParams, FoldResult, MarginalEstimator, ModelTrainer,
    TrainParams,
};
use spectopic::lda::estimator::ImportanceSampler;
use spectopic::lda::folds;
use spectopic::lda::gibbs::{GibbsTrainer, TrainedModel};
use spectopic::rng::Lcg64;
use std::collections::HashSet;

// ── Shared fixtures ─────────────────────────────────────────────

struct UniformTrainer;

impl ModelTrainer for UniformTrainer {
    #[allow(clippy::cast_precision_loss)]
    fn train(
        &self,
        corpus: &Corpus,
        vocab: &Vocabulary,
        k: usize,
        _alpha: f64,
        _beta: f64,
        _params: &TrainParams,
    ) -> Result<TrainedModel, String> {
        let n_terms = vocab.len();
        TrainedModel::from_distributions(
            k,
            n_terms,
            vec![vec![1.0 / n_terms as f64; k * n_terms]],
            vec![0.0; corpus.n_docs() * k],
        )
    }
}

struct ConstantEstimator {
    per_doc: f64,
}

impl MarginalEstimator for ConstantEstimator {
    fn estimate(
        &self,
        words: &[usize],
        _vocab: &Vocabulary,
        _model: &TrainedModel,
        _topic_prior: &[f64],
        _params: &EvalParams,
    ) -> Result<f64, String> {
        if words.is_empty() {
            Ok(0.0)
        } else {
            Ok(self.per_doc)
        }
    }
}

fn two_bag_vocab() -> Vocabulary {
    Vocabulary::new(vec![
        Term { name: "frag_a".into(), bag: 0 },
        Term { name: "frag_b".into(), bag: 0 },
        Term { name: "loss_a".into(), bag: 1 },
        Term { name: "loss_b".into(), bag: 1 },
    ])
}

fn eight_doc_corpus() -> Corpus {
    Corpus::from_rows(
        (0..8).map(|d| format!("peak_{d}")).collect(),
        (0..8)
            .map(|d| {
                if d % 2 == 0 {
                    vec![3, 0, 2, 0]
                } else {
                    vec![0, 3, 0, 2]
                }
            })
            .collect(),
    )
}

fn stub_config() -> CvConfig {
    CvConfig {
        k: 2,
        alpha: 0.5,
        beta: 0.1,
        n_folds: 4,
        seed: 42,
        train: TrainParams { n_burn: 0, n_samples: 1, n_thin: 1, seed: 0 },
        eval: EvalParams { num_samples: 10, iters: 1, seed: 0 },
    }
}

// ── Partition invariants ────────────────────────────────────────

#[test]
fn partition_complete_for_many_shapes() {
    let mut rng = Lcg64::new(0);
    for (n_docs, n_folds) in [(8, 4), (23, 4), (100, 7), (5, 2), (6, 6)] {
        let parts = folds::partition(n_docs, n_folds, &mut rng).unwrap();
        assert_eq!(parts.len(), n_folds);

        let mut seen = HashSet::new();
        for fold in &parts {
            for &d in fold {
                assert!(seen.insert(d), "{n_docs}/{n_folds}: row {d} duplicated");
            }
        }
        assert_eq!(seen.len(), n_docs, "{n_docs}/{n_folds}: rows dropped");

        let min = parts.iter().map(Vec::len).min().unwrap();
        let max = parts.iter().map(Vec::len).max().unwrap();
        assert!(max - min <= 1);
    }
}

#[test]
fn training_set_is_exact_complement() {
    let mut rng = Lcg64::new(3);
    let parts = folds::partition(23, 4, &mut rng).unwrap();
    for i in 0..4 {
        let train: HashSet<usize> = folds::complement(&parts, i).into_iter().collect();
        let held: HashSet<usize> = parts[i].iter().copied().collect();
        assert_eq!(train.len(), 23 - held.len());
        assert!(train.is_disjoint(&held));
        let union: HashSet<usize> = train.union(&held).copied().collect();
        assert_eq!(union, (0..23).collect::<HashSet<_>>());
    }
}

// ── Orchestrator bookkeeping (stub scenario) ────────────────────

#[test]
fn scenario_fixed_estimates() {
    let cv = CrossValidation::new(UniformTrainer, ConstantEstimator { per_doc: -10.0 });
    let report = cv.run(&eight_doc_corpus(), &two_bag_vocab(), &stub_config()).unwrap();

    assert_eq!(report.folds.len(), 4);
    for fold in &report.folds {
        assert!((fold.log_evidence - (-20.0)).abs() < 1e-12);
        assert_eq!(fold.word_count, 10);
        assert!((fold.perplexity - 2.0f64.exp()).abs() < 1e-9);
    }
    assert!((report.summary.mean_log_evidence - (-20.0)).abs() < 1e-12);
    assert!((report.summary.mean_perplexity - 2.0f64.exp()).abs() < 1e-9);
}

#[test]
fn perplexity_decreases_as_evidence_increases() {
    let corpus = eight_doc_corpus();
    let vocab = two_bag_vocab();
    let mut last = f64::INFINITY;
    for per_doc in [-10.0, -7.0, -4.0, -1.0] {
        let cv = CrossValidation::new(UniformTrainer, ConstantEstimator { per_doc });
        let report = cv.run(&corpus, &vocab, &stub_config()).unwrap();
        assert!(report.summary.mean_perplexity < last);
        last = report.summary.mean_perplexity;
    }
}

#[test]
fn zero_token_fold_reported_not_divided() {
    let empty = Corpus::from_rows(
        (0..8).map(|d| format!("peak_{d}")).collect(),
        (0..8).map(|_| vec![0, 0, 0, 0]).collect(),
    );
    let cv = CrossValidation::new(UniformTrainer, ConstantEstimator { per_doc: -1.0 });
    let err = cv.run(&empty, &two_bag_vocab(), &stub_config()).unwrap_err();
    assert!(matches!(err, Error::EmptyFold { .. }));
}

#[test]
fn invalid_fold_counts_rejected() {
    let cv = CrossValidation::new(UniformTrainer, ConstantEstimator { per_doc: -1.0 });
    for n_folds in [0, 1, 9] {
        let mut cfg = stub_config();
        cfg.n_folds = n_folds;
        let err = cv.run(&eight_doc_corpus(), &two_bag_vocab(), &cfg).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)), "n_folds = {n_folds}");
    }
}

// ── Aggregation ─────────────────────────────────────────────────

#[test]
fn aggregation_covers_all_recorded_folds() {
    let fold_results = vec![
        FoldResult { fold: 0, log_evidence: -12.0, word_count: 4, perplexity: 3.0 },
        FoldResult { fold: 1, log_evidence: -24.0, word_count: 4, perplexity: 5.0 },
        FoldResult { fold: 2, log_evidence: -36.0, word_count: 4, perplexity: 7.0 },
        FoldResult { fold: 3, log_evidence: -48.0, word_count: 4, perplexity: 9.0 },
    ];
    let summary = aggregate(&fold_results);
    assert!((summary.mean_log_evidence - (-30.0)).abs() < 1e-12);
    assert!((summary.mean_perplexity - 6.0).abs() < 1e-12);
}

// ── Scoring order independence ──────────────────────────────────

#[test]
fn document_scores_do_not_depend_on_order() {
    // Per-document seeds derive from the document's row index, so each
    // document's estimate is a pure function of the document. Summing in
    // any order gives the same fold total (up to float reassociation).
    let model = TrainedModel::from_distributions(
        2,
        4,
        vec![
            vec![0.6, 0.3, 0.0, 0.0, 0.1, 0.2, 0.0, 0.0],
            vec![0.0, 0.0, 0.7, 0.2, 0.0, 0.0, 0.3, 0.8],
        ],
        vec![],
    )
    .unwrap();
    let vocab = two_bag_vocab();
    let corpus = eight_doc_corpus();
    let prior = [0.5, 0.5];

    let score = |d: usize| {
        let params = EvalParams { num_samples: 200, iters: 2, seed: 1000 + d as u64 };
        ImportanceSampler
            .estimate(&corpus.word_indices(d), &vocab, &model, &prior, &params)
            .unwrap()
    };

    let forward: f64 = (0..8).map(score).sum();
    let reverse: f64 = (0..8).rev().map(score).sum();
    assert!((forward - reverse).abs() < 1e-9);
}

// ── Table → corpus → summary pipeline ───────────────────────────

#[test]
fn end_to_end_from_csv_tables() {
    use std::fmt::Write as _;

    let dir = tempfile::tempdir().unwrap();
    let frag = dir.path().join("fragments.csv");
    let loss = dir.path().join("losses.csv");

    let mut frag_csv = String::from("\"\",\"frag_a\",\"frag_b\"\n");
    let mut loss_csv = String::from("\"\",\"loss_a\",\"loss_b\"\n");
    for d in 0..8 {
        if d % 2 == 0 {
            writeln!(frag_csv, "\"peak_{d}\",3,0").unwrap();
            writeln!(loss_csv, "\"peak_{d}\",2,0").unwrap();
        } else {
            writeln!(frag_csv, "\"peak_{d}\",0,3").unwrap();
            writeln!(loss_csv, "\"peak_{d}\",0,2").unwrap();
        }
    }
    std::fs::write(&frag, frag_csv).unwrap();
    std::fs::write(&loss, loss_csv).unwrap();

    let (corpus, vocab) = load_bags(&[&frag, &loss]).unwrap();
    assert_eq!(corpus.n_docs(), 8);
    assert_eq!(vocab.n_bags(), 2);
    assert_eq!(corpus.total_tokens(), 40);

    let cfg = CvConfig {
        k: 2,
        alpha: 0.5,
        beta: 0.1,
        n_folds: 4,
        seed: 11,
        train: TrainParams { n_burn: 10, n_samples: 20, n_thin: 2, seed: 0 },
        eval: EvalParams { num_samples: 200, iters: 2, seed: 0 },
    };
    let cv = CrossValidation::new(GibbsTrainer, ImportanceSampler);
    let report = cv.run(&corpus, &vocab, &cfg).unwrap();

    assert_eq!(report.folds.len(), 4);
    for fold in &report.folds {
        assert!(fold.log_evidence.is_finite());
        assert!(fold.log_evidence < 0.0);
        assert_eq!(fold.word_count, 10);
        assert!(fold.perplexity > 0.0);
        assert!(fold.perplexity.is_finite());
    }
    assert!(report.summary.mean_perplexity.is_finite());
}
