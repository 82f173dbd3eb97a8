// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for spectopic I/O and cross-validation.
//!
//! All loader and evaluation errors use [`Error`], with variants for each
//! failure mode. No external error crates — zero-dependency error type.
//!
//! Fold-level failures carry the fold index (and the document key where one
//! exists) so a failed run reports exactly which fold/document/stage broke.
//! Nothing is retried and nothing is masked as a zero contribution.

use std::fmt;
use std::path::PathBuf;

/// Errors produced by spectopic loaders and the cross-validation core.
#[derive(Debug)]
pub enum Error {
    /// File I/O error with path context.
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Count-table parsing error (malformed header, row, or count).
    Table(String),
    /// Invalid run configuration (fold count, hyperparameters out of range).
    InvalidConfig(String),
    /// A fold's model training failed.
    Training {
        /// Fold whose training run failed.
        fold: usize,
        /// Trainer-reported cause.
        message: String,
    },
    /// A held-out document's marginal-likelihood estimate failed.
    Estimation {
        /// Fold being evaluated.
        fold: usize,
        /// Document key within the held-out fold.
        doc: String,
        /// Estimator-reported cause.
        message: String,
    },
    /// A held-out fold contained zero word tokens.
    EmptyFold {
        /// Fold with no tokens to score.
        fold: usize,
    },
}

/// Result type alias for spectopic operations.
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Table(msg) => write!(f, "count-table parse error: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Training { fold, message } => {
                write!(f, "training failed on fold {fold}: {message}")
            }
            Self::Estimation { fold, doc, message } => {
                write!(f, "estimation failed on fold {fold}, document {doc}: {message}")
            }
            Self::EmptyFold { fold } => {
                write!(f, "fold {fold} held out zero word tokens; perplexity undefined")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Table(_)
            | Self::InvalidConfig(_)
            | Self::Training { .. }
            | Self::Estimation { .. }
            | Self::EmptyFold { .. } => None,
        }
    }
}
