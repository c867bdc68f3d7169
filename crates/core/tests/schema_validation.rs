//! Validates serializer output for every fixture document against the
//! document schema at schema/pricing-schema.json.

use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn validator() -> jsonschema::Validator {
    let schema_path = workspace_root().join("schema/pricing-schema.json");
    let schema_src = std::fs::read_to_string(&schema_path)
        .unwrap_or_else(|e| panic!("Failed to read schema at {}: {}", schema_path.display(), e));
    let schema_value: serde_json::Value = serde_json::from_str(&schema_src).unwrap();
    jsonschema::validator_for(&schema_value)
        .unwrap_or_else(|e| panic!("Failed to compile schema: {}", e))
}

fn collect_fixtures() -> Vec<PathBuf> {
    let mut paths: Vec<_> = std::fs::read_dir(workspace_root().join("fixtures"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "yml" || e == "yaml"))
        .collect();
    paths.sort();
    paths
}

fn to_json(doc: &serde_yaml::Value) -> serde_json::Value {
    serde_json::to_value(doc).unwrap()
}

#[test]
fn serialized_fixtures_match_schema() {
    let validator = validator();
    let mut tested = 0usize;
    let mut failures = Vec::new();

    for path in collect_fixtures() {
        let text = std::fs::read_to_string(&path).unwrap();
        let manager = pricing_core::load_str(&text)
            .unwrap_or_else(|e| panic!("{} failed to load: {}", path.display(), e));
        let doc = pricing_core::serialize(&manager).unwrap();
        if let Err(error) = validator.validate(&to_json(&doc)) {
            failures.push(format!("{}: {}", path.display(), error));
        }
        tested += 1;
    }

    assert!(tested >= 3, "No fixture documents found -- check paths");
    assert!(
        failures.is_empty(),
        "Schema validation failed for {} of {} files:\n{}",
        failures.len(),
        tested,
        failures.join("\n")
    );
}

#[test]
fn legacy_documents_do_not_match_schema() {
    let text = std::fs::read_to_string(workspace_root().join("fixtures/petclinic-v1.0.yml")).unwrap();
    let raw: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
    assert!(validator().validate(&to_json(&raw)).is_err());
}
