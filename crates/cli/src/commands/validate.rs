use std::path::Path;
use std::process;

use tracing::debug;

use crate::{report_error, OutputFormat};

static PRICING_SCHEMA_STR: &str = include_str!("../../../../schema/pricing-schema.json");

/// Load `file` (migrating it if needed), then check the serialized form
/// against the embedded document schema.
pub(crate) fn cmd_validate(file: &Path, output: OutputFormat, quiet: bool) {
    let schema: serde_json::Value = match serde_json::from_str(PRICING_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded document schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let text = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let errors = match document_errors(&text, &validator) {
        Ok(errors) => errors,
        Err(e) => vec![e],
    };
    debug!(file = %file.display(), errors = errors.len(), "validated document");

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{{\"valid\": true}}"),
            }
        }
        return;
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid");
                for err in &errors {
                    eprintln!("  - {}", err);
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": false,
                "errors": errors
            });
            eprintln!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
    }
    process::exit(1);
}

/// Schema violations of the serialized document. Load failures are the
/// `Err` case and stop before the schema check.
fn document_errors(text: &str, validator: &jsonschema::Validator) -> Result<Vec<String>, String> {
    let manager = pricing_core::load_str(text).map_err(|e| e.to_string())?;
    let doc = pricing_core::serialize(&manager).map_err(|e| e.to_string())?;
    let json = serde_json::to_value(&doc).map_err(|e| e.to_string())?;
    Ok(validator.iter_errors(&json).map(|e| e.to_string()).collect())
}
