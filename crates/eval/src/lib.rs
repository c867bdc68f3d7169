//! Per-request entitlement evaluation.
//!
//! Given a parsed pricing configuration, a plan (plus any add-ons) and the
//! caller's user context, decide for every feature whether the user is
//! entitled to it, and package the result as a signed claims token.
//!
//! Everything here is an explicit function of its inputs: the calling
//! application passes the configuration snapshot and request context in.

pub mod claims;
pub mod context;
pub mod error;
pub mod evaluate;
pub mod issuer;
pub mod keys;
pub mod status;

pub use claims::{subject_of, Claims, ClaimsOptions, DEFAULT_EXPIRATION_SECS};
pub use context::{resolve, Subscription};
pub use error::EvalError;
pub use evaluate::{check_feature, evaluate_feature, evaluate_plan, evaluate_subscription, needs_renewal};
pub use issuer::{decode_unverified, verify_token, ClaimsIssuer, Ed25519Issuer};
pub use status::{Eval, FeatureStatus, FeatureStatusMap};
