//! Structural queries over a parsed expression.

use crate::ast::{Expr, Scope};

/// The user-context key a relational entitlement check measures, and the
/// plan-context key it is measured against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedKey {
    pub user_key: String,
    pub plan_key: Option<String>,
}

/// Find the first relational comparison (`<`, `<=`, `>`, `>=`) in pre-order
/// that has a bare `userContext[...]` operand.
///
/// `userContext['pets'] < planContext['maxPets']` yields `pets` / `maxPets`.
/// Equality comparisons are ignored.
pub fn used_key(expr: &Expr) -> Option<UsedKey> {
    let mut found = None;
    expr.walk(&mut |node| {
        if found.is_some() {
            return;
        }
        if let Expr::Compare { op, left, right } = node {
            if !op.is_relational() {
                return;
            }
            let (l, r) = (left.as_context_ref(), right.as_context_ref());
            let user_key = match (l, r) {
                (Some((Scope::User, k)), _) | (_, Some((Scope::User, k))) => k.to_owned(),
                _ => return,
            };
            let plan_key = match (l, r) {
                (Some((Scope::Plan, k)), _) | (_, Some((Scope::Plan, k))) => Some(k.to_owned()),
                _ => None,
            };
            found = Some(UsedKey { user_key, plan_key });
        }
    });
    found
}

/// All context keys referenced in `scope`, in source order, without duplicates.
pub fn referenced_keys(expr: &Expr, scope: Scope) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    expr.walk(&mut |node| {
        if let Some((s, k)) = node.as_context_ref() {
            if s == scope && !keys.iter().any(|x| x == k) {
                keys.push(k.to_owned());
            }
        }
    });
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn extracts_user_and_plan_keys() {
        let e = parse("userContext['pets'] < planContext['maxPets']").unwrap();
        assert_eq!(
            used_key(&e),
            Some(UsedKey {
                user_key: "pets".into(),
                plan_key: Some("maxPets".into())
            })
        );
    }

    #[test]
    fn reversed_operands() {
        let e = parse("planContext['maxPets'] >= userContext['pets']").unwrap();
        assert_eq!(used_key(&e).unwrap().user_key, "pets");
    }

    #[test]
    fn first_relational_wins_in_multi_key_expression() {
        let e = parse(
            "planContext['vet'] && userContext['visits'] <= planContext['maxVisits'] \
             || userContext['pets'] < planContext['maxPets']",
        )
        .unwrap();
        let k = used_key(&e).unwrap();
        assert_eq!(k.user_key, "visits");
        assert_eq!(k.plan_key.as_deref(), Some("maxVisits"));
    }

    #[test]
    fn literal_limit_has_no_plan_key() {
        let e = parse("userContext['pets'] < 5").unwrap();
        assert_eq!(
            used_key(&e),
            Some(UsedKey {
                user_key: "pets".into(),
                plan_key: None
            })
        );
    }

    #[test]
    fn equality_and_bare_flags_have_no_used_key() {
        assert_eq!(used_key(&parse("planContext['haveCalendar']").unwrap()), None);
        assert_eq!(
            used_key(&parse("userContext['tier'] == 'gold'").unwrap()),
            None
        );
    }

    #[test]
    fn referenced_keys_dedup_in_order() {
        let e = parse("planContext['a'] && (planContext['b'] || planContext['a'])").unwrap();
        assert_eq!(referenced_keys(&e, Scope::Plan), vec!["a", "b"]);
        assert!(referenced_keys(&e, Scope::User).is_empty());
    }
}
