// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cross-validation driver for the named MS2 datasets.
//!
//! ```text
//! ms2lda_cv <K> <beer3pos|urine37pos>
//! ```
//!
//! Loads the dataset's fragment and neutral-loss count tables, runs 4-fold
//! cross-validation with the standard hyperparameters, and prints per-fold
//! results and the cross-fold summary.
//!
//! Data directory: `SPECTOPIC_DATA_DIR` override, else `data/input` under
//! the crate root. Exit 0 = completed, 1 = error, 2 = dataset files absent.

use spectopic::error::Result;
use spectopic::io::table::load_bags;
use spectopic::lda::cv::{CrossValidation, CvConfig, EvalParams, TrainParams};
use spectopic::lda::estimator::ImportanceSampler;
use spectopic::lda::gibbs::GibbsTrainer;
use spectopic::validation::{data_dir, exit_skipped};
use std::path::Path;

const USAGE: &str = "usage: ms2lda_cv <K> <beer3pos|urine37pos>";

fn dataset_prefix(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "beer3pos" => Some("Beer_3_full1_5_2E5_pos"),
        "urine37pos" => Some("Urine_64_fullscan1_5_2E5_POS"),
        _ => None,
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let k: usize = match args.get(1).map(|a| a.parse()) {
        Some(Ok(k)) => k,
        Some(Err(_)) => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
        None => 250,
    };
    let Some(prefix) = args.get(2).and_then(|name| dataset_prefix(name)) else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    let dir = data_dir("SPECTOPIC_DATA_DIR", "data/input");
    let fragments = dir.join(format!("{prefix}_fragments.csv"));
    let losses = dir.join(format!("{prefix}_losses.csv"));
    for path in [&fragments, &losses] {
        if !path.exists() {
            exit_skipped(&format!("dataset file missing: {}", path.display()));
        }
    }

    if let Err(err) = run(k, &fragments, &losses) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[allow(clippy::cast_precision_loss)]
fn run(k: usize, fragments: &Path, losses: &Path) -> Result<()> {
    println!("Loading count tables");
    println!("  fragments: {}", fragments.display());
    println!("  losses:    {}", losses.display());
    let (corpus, vocab) = load_bags(&[fragments, losses])?;
    println!(
        "  {} documents, {} terms in {} bags, {} tokens",
        corpus.n_docs(),
        vocab.len(),
        vocab.n_bags(),
        corpus.total_tokens()
    );

    let alpha = 50.0 / k as f64;
    let cfg = CvConfig {
        k,
        alpha,
        beta: 0.1,
        n_folds: 4,
        seed: 1_234_567,
        train: TrainParams {
            n_burn: 250,
            n_samples: 500,
            n_thin: 5,
            seed: 0,
        },
        eval: EvalParams {
            num_samples: 10_000,
            iters: 1_000,
            seed: 0,
        },
    };
    println!(
        "Cross-validation: K = {k}, alpha = {alpha:.4}, beta = {}, {} folds",
        cfg.beta, cfg.n_folds
    );

    let cv = CrossValidation::new(GibbsTrainer, ImportanceSampler);
    let report = cv.run_parallel(&corpus, &vocab, &cfg)?;

    for fold in &report.folds {
        println!(
            "  fold {}: log evidence = {:.4}, {} tokens, perplexity = {:.4}",
            fold.fold, fold.log_evidence, fold.word_count, fold.perplexity
        );
    }
    println!(
        "K = {k}: mean log evidence = {:.4}, mean perplexity = {:.4}",
        report.summary.mean_log_evidence, report.summary.mean_perplexity
    );
    Ok(())
}
