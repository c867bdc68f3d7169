use std::path::{Path, PathBuf};
use std::process;

use pricing_core::{document, migrate_with_report, MigrationReport, Version};
use tracing::{debug, info};

use crate::config::MigrateConfig;
use crate::{report_error, OutputFormat};

/// Outcome for one source document.
struct FileResult {
    source: PathBuf,
    destination: PathBuf,
    outcome: Result<MigrationReport, String>,
}

pub(crate) fn cmd_migrate(
    source_dir: &Path,
    destination_dir: &Path,
    target_version: &str,
    settings: &MigrateConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let target: Version = match target_version.parse() {
        Ok(v) => v,
        Err(e) => {
            report_error(&format!("invalid target version: {}", e), output, quiet);
            process::exit(1);
        }
    };
    if !source_dir.is_dir() {
        let msg = format!("source directory '{}' does not exist", source_dir.display());
        report_error(&msg, output, quiet);
        process::exit(1);
    }

    let mut sources = Vec::new();
    if let Err(e) = collect_documents(source_dir, settings, &mut sources) {
        let msg = format!("error scanning '{}': {}", source_dir.display(), e);
        report_error(&msg, output, quiet);
        process::exit(1);
    }
    sources.sort();

    let results: Vec<FileResult> = sources
        .into_iter()
        .map(|source| {
            let relative = source.strip_prefix(source_dir).unwrap_or(source.as_path());
            let destination = destination_dir.join(relative);
            let outcome = migrate_file(&source, &destination, target);
            FileResult {
                source,
                destination,
                outcome,
            }
        })
        .collect();

    let failed = results.iter().filter(|r| r.outcome.is_err()).count();
    info!(
        target = %target,
        migrated = results.len() - failed,
        failed,
        "batch migration finished"
    );
    print_results(&results, target, output, quiet);
    if failed > 0 {
        process::exit(1);
    }
}

/// Symlinked directories are not descended into. Symlinked files are read.
fn collect_documents(
    dir: &Path,
    settings: &MigrateConfig,
    out: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = std::fs::symlink_metadata(&path)?.file_type();
        if file_type.is_symlink() && path.is_dir() {
            debug!(path = %path.display(), "skipping symlinked directory");
        } else if file_type.is_dir() {
            collect_documents(&path, settings, out)?;
        } else if settings.accepts(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Migrate one document. At the latest version the result is also parsed
/// and re-serialized, so the written file is in canonical form.
fn migrate_file(source: &Path, destination: &Path, target: Version) -> Result<MigrationReport, String> {
    let text = std::fs::read_to_string(source).map_err(|e| format!("error reading file: {}", e))?;

    let (migrated, report) = if target == Version::LATEST {
        let (manager, report) = pricing_core::load_str_with_report(&text).map_err(|e| e.to_string())?;
        (pricing_core::dump(&manager).map_err(|e| e.to_string())?, report)
    } else {
        let doc = document::from_yaml_str(&text).map_err(|e| e.to_string())?;
        let (doc, report) = migrate_with_report(doc, target).map_err(|e| e.to_string())?;
        (document::to_yaml_string(&doc).map_err(|e| e.to_string())?, report)
    };

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("error creating '{}': {}", parent.display(), e))?;
    }
    std::fs::write(destination, migrated)
        .map_err(|e| format!("error writing '{}': {}", destination.display(), e))?;
    Ok(report)
}

fn print_results(results: &[FileResult], target: Version, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Text => {
            for r in results {
                match &r.outcome {
                    Ok(report) => {
                        if !quiet {
                            println!("{} -> {}", r.source.display(), r.destination.display());
                            for warning in &report.warnings {
                                println!("  warning: {}", warning);
                            }
                        }
                    }
                    Err(e) => report_error(
                        &format!("{}: {}", r.source.display(), e),
                        OutputFormat::Text,
                        quiet,
                    ),
                }
            }
            if !quiet {
                let failed = results.iter().filter(|r| r.outcome.is_err()).count();
                println!(
                    "migrated {} of {} documents to {}",
                    results.len() - failed,
                    results.len(),
                    target
                );
            }
        }
        OutputFormat::Json => {
            let files: Vec<serde_json::Value> = results
                .iter()
                .map(|r| match &r.outcome {
                    Ok(report) => serde_json::json!({
                        "source": r.source.display().to_string(),
                        "destination": r.destination.display().to_string(),
                        "applied": report.applied.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
                        "warnings": report.warnings,
                    }),
                    Err(e) => serde_json::json!({
                        "source": r.source.display().to_string(),
                        "error": e,
                    }),
                })
                .collect();
            let json = serde_json::json!({
                "target": target.to_string(),
                "files": files,
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
    }
}
