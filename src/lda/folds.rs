// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fold partitioning for cross-validation.
//!
//! Shuffles document row indices with a seeded Fisher-Yates permutation,
//! then cuts the permutation into `n_folds` contiguous groups whose sizes
//! differ by at most one. Folds are disjoint and exhaustive: every row
//! lands in exactly one fold.

use crate::error::{Error, Result};
use crate::rng::Lcg64;

/// Split `n_docs` row indices into `n_folds` shuffled, near-equal folds.
///
/// The first `n_docs % n_folds` folds receive one extra row.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `n_folds < 2` or `n_folds > n_docs`.
pub fn partition(n_docs: usize, n_folds: usize, rng: &mut Lcg64) -> Result<Vec<Vec<usize>>> {
    if n_folds < 2 {
        return Err(Error::InvalidConfig(format!(
            "n_folds must be at least 2, got {n_folds}"
        )));
    }
    if n_folds > n_docs {
        return Err(Error::InvalidConfig(format!(
            "n_folds ({n_folds}) exceeds document count ({n_docs})"
        )));
    }

    let mut order: Vec<usize> = (0..n_docs).collect();
    rng.shuffle(&mut order);

    let base = n_docs / n_folds;
    let extra = n_docs % n_folds;
    let mut folds = Vec::with_capacity(n_folds);
    let mut start = 0;
    for i in 0..n_folds {
        let size = base + usize::from(i < extra);
        folds.push(order[start..start + size].to_vec());
        start += size;
    }
    debug_assert!(folds.iter().all(|f| !f.is_empty()));
    Ok(folds)
}

/// Row indices of the training complement: every fold except `held_out`,
/// concatenated in fold order.
#[must_use]
pub fn complement(folds: &[Vec<usize>], held_out: usize) -> Vec<usize> {
    folds
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != held_out)
        .flat_map(|(_, f)| f.iter().copied())
        .collect()
}
