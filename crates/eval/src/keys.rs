//! Ed25519 key files.
//!
//! `<prefix>.secret` holds the base64 32-byte seed and `<prefix>.pub` the
//! base64 32-byte verifying key.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::error::EvalError;

pub fn generate() -> SigningKey {
    let mut rng = rand::rngs::OsRng;
    SigningKey::generate(&mut rng)
}

/// Write a fresh keypair. Returns the secret path, the public path and the
/// key itself.
///
/// The secret file is created readable only by its owner on Unix.
pub fn write_keypair(prefix: &str) -> Result<(PathBuf, PathBuf, SigningKey), EvalError> {
    let signing_key = generate();
    let secret_path = PathBuf::from(format!("{}.secret", prefix));
    let pub_path = PathBuf::from(format!("{}.pub", prefix));

    write_secret(&secret_path, BASE64.encode(signing_key.to_bytes()).as_bytes()).map_err(|e| {
        EvalError::Key(format!(
            "error writing secret key to '{}': {}",
            secret_path.display(),
            e
        ))
    })?;

    std::fs::write(&pub_path, BASE64.encode(signing_key.verifying_key().to_bytes())).map_err(
        |e| {
            EvalError::Key(format!(
                "error writing public key to '{}': {}",
                pub_path.display(),
                e
            ))
        },
    )?;
    Ok((secret_path, pub_path, signing_key))
}

/// Write `contents` to a file readable only by the owner on Unix. The mode
/// is set at creation and re-applied to an existing file before writing.
fn write_secret(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let file = options.open(path)?;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        write_all(file, contents)
    }
    #[cfg(not(unix))]
    {
        write_all(options.open(path)?, contents)
    }
}

fn write_all(mut file: File, contents: &[u8]) -> std::io::Result<()> {
    file.write_all(contents)?;
    file.sync_all()
}

fn read_key_bytes(path: &Path, what: &str) -> Result<[u8; 32], EvalError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| EvalError::Key(format!("error reading {} '{}': {}", what, path.display(), e)))?;
    let bytes = BASE64
        .decode(contents.trim())
        .map_err(|e| EvalError::Key(format!("error decoding {} '{}': {}", what, path.display(), e)))?;
    bytes.try_into().map_err(|_| {
        EvalError::Key(format!(
            "invalid {} length in '{}': expected 32 bytes",
            what,
            path.display()
        ))
    })
}

pub fn read_secret_key(path: &Path) -> Result<SigningKey, EvalError> {
    Ok(SigningKey::from_bytes(&read_key_bytes(path, "secret key")?))
}

pub fn read_public_key(path: &Path) -> Result<VerifyingKey, EvalError> {
    VerifyingKey::from_bytes(&read_key_bytes(path, "public key")?).map_err(|e| {
        EvalError::Key(format!(
            "invalid public key material in '{}': {}",
            path.display(),
            e
        ))
    })
}

/// First 8 bytes of the verifying key, hex-encoded.
pub fn key_fingerprint(key: &VerifyingKey) -> String {
    key.to_bytes()[..8]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("pricing");
        let (secret, public, key) = write_keypair(prefix.to_str().unwrap()).unwrap();
        assert_eq!(read_secret_key(&secret).unwrap().to_bytes(), key.to_bytes());
        assert_eq!(read_public_key(&public).unwrap(), key.verifying_key());
        assert_eq!(key_fingerprint(&key.verifying_key()).len(), 16);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&secret).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn existing_secret_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("pricing");
        let secret = dir.path().join("pricing.secret");
        std::fs::write(&secret, "old").unwrap();
        std::fs::set_permissions(&secret, std::fs::Permissions::from_mode(0o644)).unwrap();

        let (written, _, key) = write_keypair(prefix.to_str().unwrap()).unwrap();
        assert_eq!(written, secret);
        let mode = std::fs::metadata(&secret).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(read_secret_key(&secret).unwrap().to_bytes(), key.to_bytes());
    }

    #[test]
    fn short_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.secret");
        std::fs::write(&path, BASE64.encode([1u8; 8])).unwrap();
        let err = read_secret_key(&path).unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
    }
}
