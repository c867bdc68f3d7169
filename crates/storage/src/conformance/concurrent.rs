use std::thread;

use super::{TestResult, SAMPLE};
use crate::{DocumentStore, StorageError};

/// Number of concurrent writers in each test.
const N: usize = 8;

pub(super) fn run_concurrent_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_replace_exactly_one_wins",
            concurrent_replace_exactly_one_wins(factory()),
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_create_exactly_one_wins",
            concurrent_create_exactly_one_wins(factory()),
        ),
    ]
}

// ── Concurrent replace: exactly one wins ────────────────────────────────────

/// N threads read the same revision and each try to replace the document
/// with distinct content. Exactly one replace lands; the rest must see
/// ConcurrentConflict.
fn concurrent_replace_exactly_one_wins<S: DocumentStore>(store: S) -> Result<(), String> {
    let rev = store.create(SAMPLE).map_err(|e| format!("create: {e}"))?;

    let outcomes: Vec<Result<bool, String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..N)
            .map(|i| {
                let store = &store;
                let rev = &rev;
                scope.spawn(move || {
                    match store.replace(&format!("saasName: Writer{i}\n"), rev) {
                        Ok(_) => Ok(true),
                        Err(StorageError::ConcurrentConflict { .. }) => Ok(false),
                        Err(e) => Err(format!("storage error: {e}")),
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| Err("writer panicked".to_string())))
            .collect()
    });

    let mut winners = 0usize;
    for outcome in outcomes {
        if outcome? {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    Ok(())
}

// ── Concurrent create: exactly one wins ─────────────────────────────────────

fn concurrent_create_exactly_one_wins<S: DocumentStore>(store: S) -> Result<(), String> {
    let outcomes: Vec<Result<bool, String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..N)
            .map(|i| {
                let store = &store;
                scope.spawn(move || match store.create(&format!("saasName: Creator{i}\n")) {
                    Ok(_) => Ok(true),
                    Err(StorageError::AlreadyExists { .. }) => Ok(false),
                    Err(e) => Err(format!("storage error: {e}")),
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| Err("creator panicked".to_string())))
            .collect()
    });

    let mut winners = 0usize;
    for outcome in outcomes {
        if outcome? {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    Ok(())
}
