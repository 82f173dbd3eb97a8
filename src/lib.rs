// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

//! spectopic — held-out evaluation of topic models on MS2 pseudo-text.
//!
//! LC-MS/MS fragmentation data can be read as text: each MS1 peak is a
//! "document" whose "words" are discretized fragment and neutral-loss
//! features, grouped into bags. spectopic fits multi-bag LDA to such count
//! tables and estimates out-of-sample predictive quality by n-fold
//! cross-validation, scoring each held-out document with an
//! importance-sampling estimate of its log marginal likelihood.
//!
//! # Pipeline
//!
//! ```text
//! per-bag count CSVs → corpus + bag-tagged vocabulary
//!     → fold partition → per-fold collapsed Gibbs training
//!     → per-document importance-sampling log-evidence
//!     → per-fold perplexity → cross-fold summary
//! ```
//!
//! Every stochastic step draws from one seeded LCG stream, so a run is
//! reproducible bit for bit; the sequential and thread-per-fold drivers
//! produce identical numbers.

pub mod error;
pub mod io;
pub mod lda;
pub mod rng;
pub mod special;
pub mod validation;
