use std::path::{Path, PathBuf};
use std::process;

use pricing_eval::{Claims, ClaimsIssuer, ClaimsOptions, Ed25519Issuer, Eval};
use time::OffsetDateTime;

use crate::config::ClaimsConfig;
use crate::{report_error, OutputFormat};

pub(crate) struct EvalArgs {
    pub file: PathBuf,
    pub plan: String,
    pub user_context: String,
    pub add_ons: Vec<String>,
    pub sign: bool,
    pub key: Option<PathBuf>,
    pub expiration: Option<i64>,
}

pub(crate) fn cmd_eval(args: &EvalArgs, settings: &ClaimsConfig, output: OutputFormat, quiet: bool) {
    match run(args, settings) {
        Ok(Rendered::Token(token)) => match output {
            OutputFormat::Text => println!("{}", token),
            OutputFormat::Json => println!("{}", serde_json::json!({ "token": token })),
        },
        Ok(Rendered::Claims(claims)) => match output {
            OutputFormat::Text => print_claims_text(&claims),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&claims).unwrap_or_default())
            }
        },
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

enum Rendered {
    Claims(Claims),
    Token(String),
}

fn run(args: &EvalArgs, settings: &ClaimsConfig) -> Result<Rendered, String> {
    let text = std::fs::read_to_string(&args.file)
        .map_err(|e| format!("error reading file '{}': {}", args.file.display(), e))?;
    let manager = pricing_core::load_str(&text)
        .map_err(|e| format!("error loading '{}': {}", args.file.display(), e))?;
    let user_context = read_user_context(&args.user_context)?;

    let authorities = match &settings.authorities {
        Some(value) => serde_json::to_value(value).map_err(|e| format!("invalid [claims] authorities: {}", e))?,
        None => serde_json::Value::Null,
    };
    let options = ClaimsOptions {
        authorities,
        expiration_secs: args.expiration.unwrap_or(settings.expiration_secs),
    };
    let add_ons: Vec<&str> = args.add_ons.iter().map(String::as_str).collect();
    let claims = Claims::build_from_json(
        &manager,
        &args.plan,
        &add_ons,
        &user_context,
        &options,
        OffsetDateTime::now_utc(),
    )
    .map_err(|e| e.to_string())?;

    if !args.sign {
        return Ok(Rendered::Claims(claims));
    }
    let key_path = args
        .key
        .as_deref()
        .or(settings.signing_key.as_deref())
        .ok_or_else(|| "signing requires --key or [claims] signing_key".to_owned())?;
    let issuer = Ed25519Issuer::new(pricing_eval::keys::read_secret_key(key_path).map_err(|e| e.to_string())?);
    issuer.issue(&claims).map(Rendered::Token).map_err(|e| e.to_string())
}

/// Inline JSON, or `@path` naming a JSON file. Must be an object.
fn read_user_context(arg: &str) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    let (src, origin) = match arg.strip_prefix('@') {
        Some(path) => (
            std::fs::read_to_string(Path::new(path))
                .map_err(|e| format!("error reading user context '{}': {}", path, e))?,
            path,
        ),
        None => (arg.to_owned(), "--user-context"),
    };
    let value: serde_json::Value =
        serde_json::from_str(&src).map_err(|e| format!("error parsing JSON in {}: {}", origin, e))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(format!("{} must be a JSON object", origin)),
    }
}

fn print_claims_text(claims: &Claims) {
    println!("subject: {}", claims.sub);
    for (name, status) in &claims.features {
        let eval = match &status.eval {
            Eval::Bool(true) => "granted".to_owned(),
            Eval::Bool(false) => "denied".to_owned(),
            Eval::Text(t) => t.clone(),
        };
        match (&status.used, &status.limit) {
            (Some(used), Some(limit)) => println!("  {}: {} ({} of {})", name, eval, used, limit),
            (Some(used), None) => println!("  {}: {} ({} used)", name, eval, used),
            _ => println!("  {}: {}", name, eval),
        }
    }
}
