//! Signing and verifying pricing tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as B64URL, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::claims::Claims;
use crate::error::EvalError;

/// Turns claims into an opaque bearer token and back.
pub trait ClaimsIssuer {
    fn issue(&self, claims: &Claims) -> Result<String, EvalError>;

    /// Check the token's signature and expiry at `now` (Unix seconds).
    fn verify(&self, token: &str, now: i64) -> Result<Claims, EvalError>;
}

/// Tokens of the form `base64url(payload).base64url(signature)`, where the
/// payload is the claims JSON and the signature is Ed25519 over the encoded
/// payload text.
pub struct Ed25519Issuer {
    signing_key: SigningKey,
}

impl Ed25519Issuer {
    pub fn new(signing_key: SigningKey) -> Self {
        Ed25519Issuer { signing_key }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl ClaimsIssuer for Ed25519Issuer {
    fn issue(&self, claims: &Claims) -> Result<String, EvalError> {
        let payload = B64URL.encode(serde_json::to_vec(claims)?);
        let signature = self.signing_key.sign(payload.as_bytes());
        Ok(format!("{}.{}", payload, B64URL.encode(signature.to_bytes())))
    }

    fn verify(&self, token: &str, now: i64) -> Result<Claims, EvalError> {
        verify_token(&self.verifying_key(), token, now)
    }
}

/// Verify a token with only the public half of the key.
pub fn verify_token(key: &VerifyingKey, token: &str, now: i64) -> Result<Claims, EvalError> {
    let (payload, signature) = token
        .split_once('.')
        .ok_or_else(|| EvalError::MalformedToken("expected <payload>.<signature>".to_owned()))?;
    let sig_bytes = B64URL
        .decode(signature)
        .map_err(|e| EvalError::MalformedToken(format!("signature: {}", e)))?;
    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| EvalError::MalformedToken("signature must be 64 bytes".to_owned()))?;
    key.verify(payload.as_bytes(), &Signature::from_bytes(&sig_array))
        .map_err(|_| EvalError::BadSignature)?;

    let json = B64URL
        .decode(payload)
        .map_err(|e| EvalError::MalformedToken(format!("payload: {}", e)))?;
    let claims: Claims = serde_json::from_slice(&json)?;
    if claims.is_expired_at(now) {
        return Err(EvalError::Expired { exp: claims.exp });
    }
    Ok(claims)
}

/// Read the claims of a token without checking it. For display only.
pub fn decode_unverified(token: &str) -> Result<Claims, EvalError> {
    let payload = token.split('.').next().unwrap_or_default();
    let json = B64URL
        .decode(payload)
        .map_err(|e| EvalError::MalformedToken(format!("payload: {}", e)))?;
    Ok(serde_json::from_slice(&json)?)
}
