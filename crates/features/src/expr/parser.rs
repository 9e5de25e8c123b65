//! Recursive-descent parser producing the expression AST.
//!
//! Precedence, lowest first: `?:`, `??`, `||`, `&&`, equality,
//! relational and `in`, additive, multiplicative, unary, postfix.

use super::CompileError;
use super::lexer::{Spanned, Token};
use crate::value::Value;

/// Deepest nesting of parentheses, brackets, ternaries and unary operators
const MAX_DEPTH: usize = 128;

/// Most operator nodes a single expression may build
const MAX_OPERATORS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Coalesce(Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

pub(crate) struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            operators: 0,
        }
    }

    /// Parse a complete expression, rejecting trailing tokens
    pub(crate) fn parse(mut self) -> Result<Expr, CompileError> {
        let expr = self.conditional()?;
        match self.peek() {
            Token::Eof => Ok(expr),
            other => Err(self.error(format!("unexpected {}", other.describe()))),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Token::Ident(name) if name == keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), CompileError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {what}, found {}",
                self.peek().describe()
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(self.offset(), message)
    }

    /// Run `parse` one nesting level deeper
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expr, CompileError>,
    ) -> Result<Expr, CompileError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Count one more operator node
    fn operator(&mut self) -> Result<(), CompileError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(self.error("expression has too many operators"));
        }
        Ok(())
    }

    fn conditional(&mut self) -> Result<Expr, CompileError> {
        self.nested(Self::ternary)
    }

    fn ternary(&mut self) -> Result<Expr, CompileError> {
        let cond = self.coalesce()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        self.operator()?;
        let then = self.conditional()?;
        self.expect(&Token::Colon, "':' in conditional")?;
        let otherwise = self.conditional()?;
        Ok(Expr::Conditional(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn coalesce(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.or()?;
        while self.eat(&Token::Coalesce) {
            self.operator()?;
            let rhs = self.or()?;
            lhs = Expr::Coalesce(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.and()?;
        while self.eat(&Token::OrOr) || self.eat_keyword("or") {
            self.operator()?;
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.equality()?;
        while self.eat(&Token::AndAnd) || self.eat_keyword("and") {
            self.operator()?;
            let rhs = self.equality()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.relational()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => return Ok(lhs),
            };
            self.advance();
            self.operator()?;
            let rhs = self.relational()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn relational(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                Token::Ident(name) if name == "in" => BinaryOp::In,
                _ => return Ok(lhs),
            };
            self.advance();
            self.operator()?;
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            self.operator()?;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            self.operator()?;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        if self.eat(&Token::Bang) || self.eat_keyword("not") {
            self.operator()?;
            let operand = self.nested(Self::unary)?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        if self.eat(&Token::Minus) {
            self.operator()?;
            let operand = self.nested(Self::unary)?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                self.operator()?;
                match self.advance() {
                    Token::Ident(name) => expr = Expr::Member(Box::new(expr), name),
                    other => {
                        return Err(self.error(format!(
                            "expected field name after '.', found {}",
                            other.describe()
                        )));
                    }
                }
            } else if self.eat(&Token::LBracket) {
                self.operator()?;
                let index = self.conditional()?;
                self.expect(&Token::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let offset = self.offset();
        match self.advance() {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(x) => Ok(Expr::Literal(Value::Float(x))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "nil" | "null" => Ok(Expr::Literal(Value::Null)),
                "and" | "or" | "not" | "in" => Err(CompileError::new(
                    offset,
                    format!("missing operand before '{name}'"),
                )),
                _ => Ok(Expr::Ident(name)),
            },
            Token::LParen => {
                let inner = self.conditional()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.conditional()?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        self.expect(&Token::Comma, "',' or ']'")?;
                    }
                }
                Ok(Expr::Array(items))
            }
            Token::Eof => Err(CompileError::new(offset, "missing operand")),
            other => Err(CompileError::new(
                offset,
                format!("unexpected {}", other.describe()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::lexer::tokenize;

    fn parse(src: &str) -> Result<Expr, CompileError> {
        Parser::new(tokenize(src).unwrap()).parse()
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a || b && c").unwrap();
        assert!(matches!(&expr, Expr::Or(_, rhs) if matches!(rhs.as_ref(), Expr::And(_, _))));
    }

    #[test]
    fn test_member_chain() {
        let expr = parse("a.b.c").unwrap();
        assert_eq!(
            expr,
            Expr::Member(
                Box::new(Expr::Member(Box::new(Expr::Ident("a".into())), "b".into())),
                "c".into()
            )
        );
    }

    #[test]
    fn test_missing_right_operand() {
        let err = parse("provider ==").unwrap_err();
        assert_eq!(err.message, "missing operand");
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = format!("{}true{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(parse(&parens).unwrap_err().message, "expression nested too deeply");

        let negations = format!("{}true", "!".repeat(100_000));
        assert_eq!(parse(&negations).unwrap_err().message, "expression nested too deeply");

        let lists = format!("{}1{}", "[".repeat(10_000), "]".repeat(10_000));
        assert_eq!(parse(&lists).unwrap_err().message, "expression nested too deeply");
    }

    #[test]
    fn test_moderate_nesting_is_fine() {
        let parens = format!("{}true{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&parens).unwrap(), Expr::Literal(Value::Bool(true)));
    }

    #[test]
    fn test_long_operator_chain_is_rejected() {
        let chain = vec!["1"; 5_000].join(" + ");
        assert_eq!(
            parse(&chain).unwrap_err().message,
            "expression has too many operators"
        );
        assert!(parse(&vec!["1"; 100].join(" + ")).is_ok());
    }

    #[test]
    fn test_unbalanced_paren() {
        assert!(parse("(a == b").is_err());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse("a b").unwrap_err();
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_array_and_in() {
        let expr = parse("x in ['a', 'b']").unwrap();
        assert!(matches!(expr, Expr::Binary(BinaryOp::In, _, _)));
    }
}
