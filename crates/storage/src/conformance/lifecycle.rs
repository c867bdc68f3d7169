use super::{TestResult, SAMPLE};
use crate::{DocumentStore, Revision, StorageError};

pub(super) fn run_lifecycle_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "lifecycle",
            "empty_store_is_not_found",
            empty_store_is_not_found(factory()),
        ),
        TestResult::from_result(
            "lifecycle",
            "create_then_load_returns_content",
            create_then_load_returns_content(factory()),
        ),
        TestResult::from_result(
            "lifecycle",
            "second_create_is_rejected",
            second_create_is_rejected(factory()),
        ),
        TestResult::from_result(
            "lifecycle",
            "replace_on_empty_store_is_not_found",
            replace_on_empty_store_is_not_found(factory()),
        ),
    ]
}

fn empty_store_is_not_found<S: DocumentStore>(store: S) -> Result<(), String> {
    match store.load() {
        Err(StorageError::DocumentNotFound { .. }) => Ok(()),
        Ok(_) => Err("expected DocumentNotFound, got a document".to_string()),
        Err(e) => Err(format!("expected DocumentNotFound, got {e}")),
    }
}

fn create_then_load_returns_content<S: DocumentStore>(store: S) -> Result<(), String> {
    let rev = store.create(SAMPLE).map_err(|e| format!("create: {e}"))?;
    let doc = store.load().map_err(|e| format!("load: {e}"))?;
    if doc.content != SAMPLE {
        return Err(format!("content mismatch: {:?}", doc.content));
    }
    if doc.revision != rev {
        return Err(format!(
            "revision mismatch: create returned {rev}, load returned {}",
            doc.revision
        ));
    }
    Ok(())
}

fn second_create_is_rejected<S: DocumentStore>(store: S) -> Result<(), String> {
    store.create(SAMPLE).map_err(|e| format!("create: {e}"))?;
    match store.create("saasName: Other\n") {
        Err(StorageError::AlreadyExists { .. }) => {}
        Ok(_) => return Err("second create succeeded".to_string()),
        Err(e) => return Err(format!("expected AlreadyExists, got {e}")),
    }
    let doc = store.load().map_err(|e| format!("load: {e}"))?;
    if doc.content != SAMPLE {
        return Err("rejected create still changed the document".to_string());
    }
    Ok(())
}

fn replace_on_empty_store_is_not_found<S: DocumentStore>(store: S) -> Result<(), String> {
    match store.replace(SAMPLE, &Revision::of("")) {
        Err(StorageError::DocumentNotFound { .. }) => Ok(()),
        Ok(_) => Err("replace on empty store succeeded".to_string()),
        Err(e) => Err(format!("expected DocumentNotFound, got {e}")),
    }
}
