use std::collections::BTreeMap;
use std::sync::OnceLock;

use rust_decimal::Decimal;

use crate::ast::{ArithOp, CompareOp, Expr, Scope};
use crate::error::ExprError;
use crate::value::{Context, Value};

fn empty() -> &'static Context {
    static EMPTY: OnceLock<Context> = OnceLock::new();
    EMPTY.get_or_init(BTreeMap::new)
}

/// The read-only bindings an expression may reference.
#[derive(Debug, Clone, Copy)]
pub struct Scopes<'a> {
    pub user_context: &'a Context,
    pub plan_context: &'a Context,
    pub variables: &'a Context,
}

impl Default for Scopes<'_> {
    fn default() -> Self {
        Scopes {
            user_context: empty(),
            plan_context: empty(),
            variables: empty(),
        }
    }
}

impl<'a> Scopes<'a> {
    /// Bindings for an entitlement check.
    pub fn entitlement(user_context: &'a Context, plan_context: &'a Context) -> Self {
        Scopes {
            user_context,
            plan_context,
            variables: empty(),
        }
    }

    /// Bindings for a price formula, which sees only `#variables`.
    pub fn formula(variables: &'a Context) -> Self {
        Scopes {
            variables,
            ..Scopes::default()
        }
    }

    fn lookup(&self, scope: Scope, key: &str) -> Result<&'a Value, ExprError> {
        let map = match scope {
            Scope::User => self.user_context,
            Scope::Plan => self.plan_context,
        };
        map.get(key).ok_or_else(|| ExprError::UndefinedVariable {
            scope: scope.as_str().to_owned(),
            key: key.to_owned(),
        })
    }
}

/// Evaluate a parsed expression. Pure: no side effects on the scopes.
pub fn eval_expr(expr: &Expr, scopes: &Scopes<'_>) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::ContextRef { scope, key } => scopes.lookup(*scope, key).cloned(),
        Expr::Variable(name) => {
            scopes
                .variables
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::UndefinedVariable {
                    scope: "#".to_owned(),
                    key: name.clone(),
                })
        }
        Expr::Compare { op, left, right } => {
            let l = eval_expr(left, scopes)?;
            let r = eval_expr(right, scopes)?;
            compare(*op, &l, &r).map(Value::Bool)
        }
        Expr::Arith { op, left, right } => {
            let l = eval_expr(left, scopes)?;
            let r = eval_expr(right, scopes)?;
            arith(*op, l, r)
        }
        Expr::Neg(e) => Ok(Value::Number(-eval_expr(e, scopes)?.as_number()?)),
        Expr::And(l, r) => {
            if !eval_bool(l, scopes)? {
                return Ok(Value::Bool(false));
            }
            eval_bool(r, scopes).map(Value::Bool)
        }
        Expr::Or(l, r) => {
            if eval_bool(l, scopes)? {
                return Ok(Value::Bool(true));
            }
            eval_bool(r, scopes).map(Value::Bool)
        }
        Expr::Not(e) => Ok(Value::Bool(!eval_bool(e, scopes)?)),
    }
}

/// Evaluate and require a boolean result.
pub fn eval_bool(expr: &Expr, scopes: &Scopes<'_>) -> Result<bool, ExprError> {
    eval_expr(expr, scopes)?.as_bool()
}

fn compare(op: CompareOp, l: &Value, r: &Value) -> Result<bool, ExprError> {
    let mismatch = || ExprError::mismatch(op.symbol(), l.type_name(), r.type_name());
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(ordered(op, a.cmp(b))),
        (Value::Text(a), Value::Text(b)) => Ok(ordered(op, a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Neq => Ok(a != b),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

fn ordered(op: CompareOp, ord: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        CompareOp::Eq => ord == Equal,
        CompareOp::Neq => ord != Equal,
        CompareOp::Lt => ord == Less,
        CompareOp::Lte => ord != Greater,
        CompareOp::Gt => ord == Greater,
        CompareOp::Gte => ord != Less,
    }
}

fn arith(op: ArithOp, l: Value, r: Value) -> Result<Value, ExprError> {
    match (op, l, r) {
        (ArithOp::Add, Value::Text(a), Value::Text(b)) => Ok(Value::Text(a + &b)),
        (_, Value::Number(a), Value::Number(b)) => checked(op, a, b).map(Value::Number),
        (_, l, r) => Err(ExprError::mismatch(
            op.symbol(),
            l.type_name(),
            r.type_name(),
        )),
    }
}

fn checked(op: ArithOp, a: Decimal, b: Decimal) -> Result<Decimal, ExprError> {
    let overflow = || ExprError::Overflow {
        message: format!("{} {} {}", a, op.symbol(), b),
    };
    match op {
        ArithOp::Add => a.checked_add(b).ok_or_else(overflow),
        ArithOp::Sub => a.checked_sub(b).ok_or_else(overflow),
        ArithOp::Mul => a.checked_mul(b).ok_or_else(overflow),
        ArithOp::Div => {
            if b.is_zero() {
                return Err(ExprError::DivisionByZero);
            }
            a.checked_div(b).ok_or_else(overflow)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(src: &str, user: &Context, plan: &Context) -> Result<Value, ExprError> {
        eval_expr(&parse(src).unwrap(), &Scopes::entitlement(user, plan))
    }

    fn ctx(pairs: &[(&str, Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn short_circuit_skips_missing_bindings() {
        let empty = Context::new();
        assert_eq!(
            run("false && userContext['missing'] > 1", &empty, &empty),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            run("true || userContext['missing'] > 1", &empty, &empty),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn missing_binding_is_undefined_variable() {
        let empty = Context::new();
        let err = run("userContext['pets'] < 3", &empty, &empty).unwrap_err();
        assert_eq!(
            err,
            ExprError::UndefinedVariable {
                scope: "userContext".into(),
                key: "pets".into()
            }
        );
    }

    #[test]
    fn boolean_equality_but_no_ordering() {
        let plan = ctx(&[("a", Value::Bool(true))]);
        let empty = Context::new();
        assert_eq!(run("planContext['a'] == true", &empty, &plan), Ok(Value::Bool(true)));
        assert!(matches!(
            run("planContext['a'] < true", &empty, &plan),
            Err(ExprError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn text_comparison_is_lexicographic() {
        let user = ctx(&[("tier", Value::from("gold"))]);
        let empty = Context::new();
        assert_eq!(run("userContext['tier'] == 'gold'", &user, &empty), Ok(Value::Bool(true)));
        assert_eq!(run("userContext['tier'] < 'silver'", &user, &empty), Ok(Value::Bool(true)));
    }

    #[test]
    fn arithmetic_with_variables() {
        let vars = ctx(&[("base", Value::from(10)), ("discount", Value::from(2))]);
        let v = eval_expr(&parse("#base * 12 - #discount").unwrap(), &Scopes::formula(&vars));
        assert_eq!(v, Ok(Value::from(118)));
    }

    #[test]
    fn division_by_zero() {
        let e = parse("1 / 0").unwrap();
        assert_eq!(
            eval_expr(&e, &Scopes::default()),
            Err(ExprError::DivisionByZero)
        );
    }

    #[test]
    fn unknown_variable() {
        let e = parse("#nope + 1").unwrap();
        assert!(matches!(
            eval_expr(&e, &Scopes::default()),
            Err(ExprError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn non_boolean_in_logical_position() {
        let e = parse("1 && true").unwrap();
        assert!(matches!(
            eval_expr(&e, &Scopes::default()),
            Err(ExprError::UnexpectedResult { .. })
        ));
    }
}
