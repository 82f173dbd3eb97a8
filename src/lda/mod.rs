// SPDX-License-Identifier: AGPL-3.0-or-later
//! Multi-bag LDA: corpus model, collapsed Gibbs training, and
//! cross-validated held-out evaluation.

pub mod corpus;
pub mod cv;
pub mod estimator;
pub mod folds;
pub mod gibbs;
