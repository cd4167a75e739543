// SPDX-License-Identifier: AGPL-3.0-only

//! Pass/fail validation infrastructure for the crate's binaries.
//!
//! Validation binaries follow one pattern: hardcoded expectations with
//! provenance, explicit checks against the tolerances in
//! [`crate::tolerances`], a machine-readable summary on stdout, and exit
//! code 0 only when every check passes.

use std::process;

/// How a check's threshold is applied.
#[derive(Debug, Clone, Copy)]
pub enum CheckMode {
    /// |observed - expected| < tolerance
    Absolute,
    /// |observed - expected| / |expected| < tolerance
    Relative,
    /// observed < threshold
    UpperBound,
    /// observed > threshold
    LowerBound,
    /// lo < observed < hi (expected holds lo, tolerance holds hi)
    Window,
}

impl std::fmt::Display for CheckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "abs"),
            Self::Relative => write!(f, "rel"),
            Self::UpperBound => write!(f, "<"),
            Self::LowerBound => write!(f, ">"),
            Self::Window => write!(f, "in"),
        }
    }
}

/// One recorded check.
#[derive(Debug, Clone)]
pub struct Check {
    pub label: String,
    pub passed: bool,
    pub observed: f64,
    pub expected: f64,
    pub tolerance: f64,
    pub mode: CheckMode,
}

/// Accumulates checks and turns them into a summary plus exit code.
#[derive(Debug, Default)]
#[must_use]
pub struct ValidationHarness {
    pub name: String,
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    #[must_use = "a harness only matters once checks run through it"]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        self.push(
            label,
            (observed - expected).abs() < tolerance,
            observed,
            expected,
            tolerance,
            CheckMode::Absolute,
        );
    }

    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > crate::tolerances::NEAR_ZERO_EXPECTED {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.push(label, passed, observed, expected, tolerance, CheckMode::Relative);
    }

    pub fn check_upper(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed < threshold,
            observed,
            threshold,
            threshold,
            CheckMode::UpperBound,
        );
    }

    pub fn check_lower(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed > threshold,
            observed,
            threshold,
            threshold,
            CheckMode::LowerBound,
        );
    }

    /// Two-sided physical-range check: lo < observed < hi.
    pub fn check_window(&mut self, label: &str, observed: f64, window: (f64, f64)) {
        self.push(
            label,
            observed > window.0 && observed < window.1,
            observed,
            window.0,
            window.1,
            CheckMode::Window,
        );
    }

    pub fn check_bool(&mut self, label: &str, passed: bool) {
        self.push(
            label,
            passed,
            f64::from(u8::from(passed)),
            1.0,
            0.0,
            CheckMode::Absolute,
        );
    }

    fn push(
        &mut self,
        label: &str,
        passed: bool,
        observed: f64,
        expected: f64,
        tolerance: f64,
        mode: CheckMode,
    ) {
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            mode,
        });
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    fn summary(&self) -> String {
        use std::fmt::Write;
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {} validation: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.checks.len()
        );
        for c in &self.checks {
            let icon = if c.passed { "✓" } else { "✗" };
            let _ = writeln!(
                s,
                "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                c.label, c.observed, c.expected, c.tolerance, c.mode
            );
        }
        s
    }

    /// Print the summary and exit 0 (all passed) or 1.
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.summary());
        if self.all_passed() {
            println!("ALL CHECKS PASSED");
            process::exit(0);
        }
        let failed: Vec<&str> = self
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect();
        println!("FAILED CHECKS: {}", failed.join(", "));
        process::exit(1);
    }
}
