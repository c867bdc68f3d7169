use super::{TestResult, SAMPLE};
use crate::{DocumentStore, StorageError};

pub(super) fn run_revision_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "revision",
            "replace_with_current_revision_succeeds",
            replace_with_current_revision_succeeds(factory()),
        ),
        TestResult::from_result(
            "revision",
            "stale_revision_after_intervening_replace",
            stale_revision_after_intervening_replace(factory()),
        ),
        TestResult::from_result(
            "revision",
            "conflict_reports_both_revisions",
            conflict_reports_both_revisions(factory()),
        ),
        TestResult::from_result(
            "revision",
            "identical_content_keeps_revision",
            identical_content_keeps_revision(factory()),
        ),
    ]
}

fn replace_with_current_revision_succeeds<S: DocumentStore>(store: S) -> Result<(), String> {
    let rev = store.create(SAMPLE).map_err(|e| format!("create: {e}"))?;
    let next = store
        .replace("saasName: Next\n", &rev)
        .map_err(|e| format!("replace: {e}"))?;
    let doc = store.load().map_err(|e| format!("load: {e}"))?;
    if doc.content != "saasName: Next\n" || doc.revision != next {
        return Err("replace did not take effect".to_string());
    }
    Ok(())
}

fn stale_revision_after_intervening_replace<S: DocumentStore>(store: S) -> Result<(), String> {
    let rev = store.create(SAMPLE).map_err(|e| format!("create: {e}"))?;
    store
        .replace("saasName: First\n", &rev)
        .map_err(|e| format!("first replace: {e}"))?;
    match store.replace("saasName: Second\n", &rev) {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Ok(_) => return Err("stale replace succeeded".to_string()),
        Err(e) => return Err(format!("expected ConcurrentConflict, got {e}")),
    }
    let doc = store.load().map_err(|e| format!("load: {e}"))?;
    if doc.content != "saasName: First\n" {
        return Err(format!("stale replace clobbered content: {:?}", doc.content));
    }
    Ok(())
}

fn conflict_reports_both_revisions<S: DocumentStore>(store: S) -> Result<(), String> {
    let stale = store.create(SAMPLE).map_err(|e| format!("create: {e}"))?;
    let current = store
        .replace("saasName: First\n", &stale)
        .map_err(|e| format!("replace: {e}"))?;
    match store.replace("saasName: Second\n", &stale) {
        Err(StorageError::ConcurrentConflict {
            expected, actual, ..
        }) => {
            if expected != stale {
                return Err(format!("expected field is {expected}, want {stale}"));
            }
            if actual != current {
                return Err(format!("actual field is {actual}, want {current}"));
            }
            Ok(())
        }
        Ok(_) => Err("stale replace succeeded".to_string()),
        Err(e) => Err(format!("expected ConcurrentConflict, got {e}")),
    }
}

fn identical_content_keeps_revision<S: DocumentStore>(store: S) -> Result<(), String> {
    let rev = store.create(SAMPLE).map_err(|e| format!("create: {e}"))?;
    let next = store
        .replace(SAMPLE, &rev)
        .map_err(|e| format!("replace: {e}"))?;
    if next != rev {
        return Err("same content produced a different revision".to_string());
    }
    Ok(())
}
