mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// SaaS pricing configuration toolchain.
#[derive(Parser)]
#[command(
    name = "pricing",
    version,
    about = "Migrate, validate and evaluate SaaS pricing configurations"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Settings file (default: ./pricing.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade every pricing document under a directory to a schema version
    Migrate {
        /// Directory scanned recursively for pricing documents
        source_dir: PathBuf,
        /// Directory receiving the migrated documents (relative paths are kept)
        destination_dir: PathBuf,
        /// Schema version to migrate to, e.g. 2.0
        target_version: String,
    },

    /// Parse a pricing document and check it against the document schema
    Validate {
        /// Path to the YAML pricing document
        file: PathBuf,
    },

    /// Evaluate a plan's features for a user and print the claims
    Eval {
        /// Path to the YAML pricing document
        file: PathBuf,
        /// Plan the user is subscribed to
        #[arg(long)]
        plan: String,
        /// User context as a JSON object, or @path to a JSON file
        #[arg(long, default_value = "{}")]
        user_context: String,
        /// Add-on the user has contracted (repeatable, applied in order)
        #[arg(long = "add-on")]
        add_ons: Vec<String>,
        /// Print a signed token instead of the claims
        #[arg(long)]
        sign: bool,
        /// Ed25519 secret key file (overrides [claims] signing_key)
        #[arg(long)]
        key: Option<PathBuf>,
        /// Token lifetime in seconds (overrides [claims] expiration_secs)
        #[arg(long)]
        expiration: Option<i64>,
    },

    /// Generate an Ed25519 keypair for signing claims
    Keygen {
        /// Output file prefix (<prefix>.secret, <prefix>.pub)
        #[arg(long, default_value = "pricing")]
        prefix: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let cfg = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };
    logging::init(&cfg.log.filter);

    match cli.command {
        Commands::Migrate {
            source_dir,
            destination_dir,
            target_version,
        } => {
            commands::migrate::cmd_migrate(
                &source_dir,
                &destination_dir,
                &target_version,
                &cfg.migrate,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Validate { file } => {
            commands::validate::cmd_validate(&file, cli.output, cli.quiet);
        }
        Commands::Eval {
            file,
            plan,
            user_context,
            add_ons,
            sign,
            key,
            expiration,
        } => {
            let args = commands::eval::EvalArgs {
                file,
                plan,
                user_context,
                add_ons,
                sign,
                key,
                expiration,
            };
            commands::eval::cmd_eval(&args, &cfg.claims, cli.output, cli.quiet);
        }
        Commands::Keygen { prefix } => {
            commands::keygen::cmd_keygen(&prefix, cli.output, cli.quiet);
        }
    }
}

/// Report an error to stderr in the requested format. Suppressed by `--quiet`.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_on_flag_repeats() {
        let cli = Cli::try_parse_from([
            "pricing", "eval", "p.yml", "--plan", "BASIC", "--add-on", "a", "--add-on", "b",
        ])
        .unwrap();
        match cli.command {
            Commands::Eval { add_ons, sign, .. } => {
                assert_eq!(add_ons, vec!["a", "b"]);
                assert!(!sign);
            }
            _ => panic!("expected eval"),
        }
    }
}
