use std::process;

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_keygen(prefix: &str, output: OutputFormat, quiet: bool) {
    let (secret_path, pub_path, signing_key) = match pricing_eval::keys::write_keypair(prefix) {
        Ok(written) => written,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    let fingerprint = pricing_eval::keys::key_fingerprint(&signing_key.verifying_key());

    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => {
            println!("secret key: {}", secret_path.display());
            println!("public key: {}", pub_path.display());
            println!("fingerprint: {}", fingerprint);
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "secretKey": secret_path.display().to_string(),
                    "publicKey": pub_path.display().to_string(),
                    "fingerprint": fingerprint,
                })
            );
        }
    }
}
