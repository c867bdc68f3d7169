use std::fmt;

/// Errors raised while lexing, parsing, or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// The source text is not a well-formed expression.
    Syntax { position: usize, message: String },
    /// A `userContext['k']`, `planContext['k']` or `#k` reference has no binding.
    UndefinedVariable { scope: String, key: String },
    /// Operand types do not fit the operator.
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },
    /// The expression did not produce the type the caller asked for.
    UnexpectedResult { expected: String, got: String },
    /// Division by a zero divisor.
    DivisionByZero,
    /// Decimal arithmetic left the representable range.
    Overflow { message: String },
}

impl ExprError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        ExprError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(op: &str, left: &str, right: &str) -> Self {
        ExprError::TypeMismatch {
            op: op.to_owned(),
            left: left.to_owned(),
            right: right.to_owned(),
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Syntax { position, message } => {
                write!(f, "syntax error at offset {}: {}", position, message)
            }
            ExprError::UndefinedVariable { scope, key } => {
                write!(f, "undefined variable: {}['{}']", scope, key)
            }
            ExprError::TypeMismatch { op, left, right } => {
                write!(
                    f,
                    "type mismatch: operator '{}' cannot be applied to {} and {}",
                    op, left, right
                )
            }
            ExprError::UnexpectedResult { expected, got } => {
                write!(f, "expected expression to yield {}, got {}", expected, got)
            }
            ExprError::DivisionByZero => write!(f, "division by zero"),
            ExprError::Overflow { message } => write!(f, "numeric overflow: {}", message),
        }
    }
}

impl std::error::Error for ExprError {}
