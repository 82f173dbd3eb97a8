// SPDX-License-Identifier: AGPL-3.0-or-later
//! Validation framework for protocol and baseline checks.
//!
//! Used by the validation binaries (`validate_cv_protocol`) to check the
//! cross-validation machinery against analytical expectations, and by the
//! dataset driver for data-directory resolution. Each check prints a
//! formatted pass/fail line with the actual value, the expected value, and
//! the tolerance applied.
//!
//! Contract shared by all validation binaries:
//! - Explicit pass/fail per check with human-readable output
//! - Exit code 0 = all passed, 1 = at least one failed, 2 = skipped

use std::path::{Path, PathBuf};

/// Accumulated validation state.
pub struct Validator {
    name: String,
    passed: u32,
    total: u32,
}

impl Validator {
    /// Start a named validation run.
    #[must_use]
    pub fn new(name: &str) -> Self {
        println!("═══ {name} ═══");
        Self {
            name: name.to_string(),
            passed: 0,
            total: 0,
        }
    }

    /// Print a section banner.
    pub fn section(&mut self, title: &str) {
        println!("\n{title}");
    }

    /// Compare `actual` against `expected` within absolute `tolerance`.
    /// Tolerance of `0.0` requires exact match.
    pub fn check(&mut self, label: &str, actual: f64, expected: f64, tolerance: f64) {
        let pass = (actual - expected).abs() <= tolerance;
        self.record(label, pass, &format!("{actual:.6} (expected {expected:.6}, tol {tolerance:.6})"));
    }

    /// Compare an exact count.
    pub fn check_count(&mut self, label: &str, actual: usize, expected: usize) {
        self.record(label, actual == expected, &format!("{actual} (expected {expected})"));
    }

    /// Record a boolean condition.
    pub fn check_true(&mut self, label: &str, condition: bool) {
        self.record(label, condition, if condition { "true" } else { "false" });
    }

    fn record(&mut self, label: &str, pass: bool, detail: &str) {
        let tag = if pass { "OK" } else { "FAIL" };
        println!("  [{tag}]  {label}: {detail}");
        self.total += 1;
        if pass {
            self.passed += 1;
        }
    }

    /// Print the summary banner; true when every check passed.
    #[must_use]
    pub fn finish(&self) -> bool {
        println!("\n═══════════════════════════════════════════════════════════");
        println!("  {}: {}/{} checks passed", self.name, self.passed, self.total);
        if self.passed == self.total {
            println!("  RESULT: PASS");
        } else {
            println!("  RESULT: FAIL ({} checks failed)", self.total - self.passed);
        }
        println!("═══════════════════════════════════════════════════════════");
        self.passed == self.total
    }

    /// Print the summary and exit: 0 if all checks passed, 1 otherwise.
    pub fn exit(self) -> ! {
        let ok = self.finish();
        std::process::exit(i32::from(!ok))
    }
}

/// Exit with code 2 indicating the run was skipped (data unavailable).
pub fn exit_skipped(reason: &str) -> ! {
    println!("  SKIP: {reason}");
    println!("  (exit 2 = skipped, not a failure)");
    std::process::exit(2)
}

/// Resolve a data directory: `env_var` override first, then a
/// manifest-relative default.
#[must_use]
pub fn data_dir(env_var: &str, default_subpath: &str) -> PathBuf {
    std::env::var(env_var).map_or_else(
        |_| Path::new(env!("CARGO_MANIFEST_DIR")).join(default_subpath),
        PathBuf::from,
    )
}
