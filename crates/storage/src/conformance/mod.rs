//! Conformance test suite for `DocumentStore` implementations.
//!
//! Any backend can run this suite to check that it honours the store
//! contract:
//!
//! - **Lifecycle**: empty stores report `DocumentNotFound`, `create` refuses
//!   to overwrite
//! - **Revision checks**: `replace` with a stale revision is rejected and
//!   leaves the document untouched
//! - **Concurrency**: of N threads replacing from the same revision, exactly
//!   one wins
//!
//! # Usage
//!
//! ```ignore
//! use pricing_storage::conformance::run_conformance_suite;
//!
//! #[test]
//! fn memory_conformance() {
//!     let report = run_conformance_suite(MemoryStore::new);
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod lifecycle;
mod revision;

use std::fmt;

use crate::DocumentStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "lifecycle", "revision").
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store backend.
///
/// `factory` is called once per test and must return a fresh, empty store.
pub fn run_conformance_suite<S, F>(factory: F) -> ConformanceReport
where
    S: DocumentStore,
    F: Fn() -> S,
{
    let mut results = Vec::new();

    results.extend(lifecycle::run_lifecycle_tests(&factory));
    results.extend(revision::run_revision_tests(&factory));
    results.extend(concurrent::run_concurrent_tests(&factory));

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

const SAMPLE: &str = "saasName: Petclinic\ncurrency: EUR\n";
