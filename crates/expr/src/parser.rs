use rust_decimal::Decimal;
use std::str::FromStr;

use crate::ast::{ArithOp, CompareOp, Expr, Scope};
use crate::error::ExprError;
use crate::lexer::{lex, Spanned, Token};
use crate::value::Value;

/// Deepest nesting the parser accepts. Counts parentheses, prefix
/// operators and chained binary operators, which bounds the height of the
/// resulting tree.
pub const MAX_DEPTH: usize = 256;

/// Parse an expression into its tree. The whole input must be consumed.
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    let tokens = lex(src)?;
    let mut p = Parser::new(&tokens);
    let expr = p.parse_expr()?;
    if p.peek() != &Token::Eof {
        return Err(p.err(format!("unexpected trailing input {:?}", p.peek())));
    }
    Ok(expr)
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.err(format!("expression nests deeper than {} levels", MAX_DEPTH)));
        }
        Ok(())
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn err(&self, message: impl Into<String>) -> ExprError {
        ExprError::syntax(self.cur().pos, message)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExprError> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {}, got {:?}", what, self.peek())))
        }
    }

    fn take_word(&mut self) -> Result<String, ExprError> {
        if let Token::Word(w) = self.peek().clone() {
            self.advance();
            Ok(w)
        } else {
            Err(self.err(format!("expected identifier, got {:?}", self.peek())))
        }
    }

    // -- Logical layers -----------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        self.descend()?;
        let e = self.parse_or();
        self.depth = base;
        e
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.parse_and()?;
        while self.peek() == &Token::OrOr || self.is_word("or") {
            self.descend()?;
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.parse_not()?;
        while self.peek() == &Token::AndAnd || self.is_word("and") {
            self.descend()?;
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == &Token::Bang || self.is_word("not") {
            let base = self.depth;
            self.descend()?;
            self.advance();
            let e = self.parse_not();
            self.depth = base;
            return Ok(Expr::Not(Box::new(e?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Token::EqEq => CompareOp::Eq,
            Token::Neq => CompareOp::Neq,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Lte,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Gte,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        if matches!(
            self.peek(),
            Token::EqEq | Token::Neq | Token::Lt | Token::Lte | Token::Gt | Token::Gte
        ) {
            return Err(self.err("comparison operators cannot be chained"));
        }
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    // -- Arithmetic layers --------------------------------------

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => ArithOp::Add,
                Token::Minus => ArithOp::Sub,
                _ => break,
            };
            self.descend()?;
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => ArithOp::Mul,
                Token::Slash => ArithOp::Div,
                _ => break,
            };
            self.descend()?;
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == &Token::Minus {
            let base = self.depth;
            self.descend()?;
            self.advance();
            let e = self.parse_unary();
            self.depth = base;
            return Ok(Expr::Neg(Box::new(e?)));
        }
        self.parse_primary()
    }

    // -- Primaries ----------------------------------------------

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.peek().clone() {
            Token::LParen => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(e)
            }
            Token::Number(n) => {
                let d = Decimal::from_str(&n)
                    .map_err(|e| self.err(format!("invalid number '{}': {}", n, e)))?;
                self.advance();
                Ok(Expr::Literal(Value::Number(d)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::Text(s)))
            }
            Token::Hash => {
                self.advance();
                let name = self.take_word()?;
                Ok(Expr::Variable(name))
            }
            Token::Word(w) if w == "true" => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Token::Word(w) if w == "false" => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Token::Word(w) => {
                let scope = match w.as_str() {
                    "userContext" => Scope::User,
                    "planContext" => Scope::Plan,
                    _ => return Err(self.err(format!("unknown identifier '{}'", w))),
                };
                self.advance();
                self.expect(Token::LBracket, "'['")?;
                let key = match self.peek().clone() {
                    Token::Str(k) => {
                        self.advance();
                        k
                    }
                    other => {
                        return Err(self.err(format!("expected quoted key, got {:?}", other)))
                    }
                };
                self.expect(Token::RBracket, "']'")?;
                Ok(Expr::ContextRef { scope, key })
            }
            Token::Eof => Err(self.err("unexpected end of expression")),
            other => Err(self.err(format!("unexpected token {:?}", other))),
        }
    }
}
