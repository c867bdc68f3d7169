//! Entitlement and price expression language.
//!
//! Expressions read two string-keyed scopes, `userContext['k']` and
//! `planContext['k']`, plus document variables written `#name`. The grammar
//! is closed: literals, context access, comparison, boolean connectives and
//! decimal arithmetic. There are no calls, loops or assignments.

pub mod ast;
pub mod error;
pub mod eval;
pub mod inspect;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{ArithOp, CompareOp, Expr, Scope};
pub use error::ExprError;
pub use eval::{eval_bool, eval_expr, Scopes};
pub use inspect::{referenced_keys, used_key, UsedKey};
pub use parser::{parse, MAX_DEPTH};
pub use value::{context_from_json, decimal_to_json, Context, Value};

/// Parse and evaluate `src` in one step.
pub fn evaluate(src: &str, scopes: &Scopes<'_>) -> Result<Value, ExprError> {
    let expr = parse(src)?;
    eval_expr(&expr, scopes)
}

/// `true` when `src` has no tokens. Callers decide what an empty rule means.
pub fn is_blank(src: &str) -> bool {
    src.trim().is_empty()
}
