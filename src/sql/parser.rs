//! Pratt (precedence-climbing) parser for the sqlcsv dialect.
//!
//! Statement structure is parsed by plain recursive descent. Expressions are
//! parsed by a precedence-climbing loop driven by a per-token-kind rule
//! table: each [`TokenKind`] maps to an optional prefix handler, an optional
//! infix handler and a binding [`Precedence`]. Binary operators parse their
//! right operand one level tighter than their own level, which makes every
//! binary operator left-associative.
//!
//! Grammar:
//!
//! ```text
//! selectStmt := SELECT projList FROM IDENTIFIER whereClause? orderBy? limit? EOF
//! projList   := '*' | item (',' item)*
//! item       := expr (AS? IDENTIFIER)?
//! whereClause:= WHERE expr
//! orderBy    := ORDER BY orderTerm (',' orderTerm)*
//! orderTerm  := expr (ASC | DESC)?
//! limit      := LIMIT INTEGER
//! ```
//!
//! Parsing stops at the first violation with a [`ParseError`] naming the
//! offending token; there is no recovery.

use crate::error::ParseError;
use crate::sql::ast::{Expr, OrderItem, Select, SelectItem};
use crate::sql::lexer::{Token, TokenKind};
use crate::types::Value;

// ---------------------------------------------------------------------------
// Precedence and rule table
// ---------------------------------------------------------------------------

/// Binding power of an operator, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    /// The next tighter level. `Primary` is its own successor.
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call => Precedence::Primary,
            Precedence::Primary => Precedence::Primary,
        }
    }
}

/// Handler for a token appearing at the start of an expression. Receives the
/// already-consumed token.
type PrefixFn = fn(&mut Parser, Token) -> Result<Expr, ParseError>;

/// Handler for a token appearing after a complete left operand. Receives the
/// left operand and the already-consumed operator token.
type InfixFn = fn(&mut Parser, Expr, Token) -> Result<Expr, ParseError>;

struct ParseRule {
    prefix: Option<PrefixFn>,
    infix: Option<InfixFn>,
    precedence: Precedence,
}

fn rule(
    prefix: Option<PrefixFn>,
    infix: Option<InfixFn>,
    precedence: Precedence,
) -> ParseRule {
    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

fn get_rule(kind: TokenKind) -> ParseRule {
    use Precedence as P;
    use TokenKind as K;

    match kind {
        K::LeftParen => rule(Some(Parser::grouping), None, P::None),
        K::Minus => rule(Some(Parser::unary), Some(Parser::binary), P::Term),
        K::Plus => rule(None, Some(Parser::binary), P::Term),
        K::Star | K::Slash | K::Percent => rule(None, Some(Parser::binary), P::Factor),
        K::Equal | K::BangEqual | K::NotEqual => rule(None, Some(Parser::binary), P::Equality),
        K::Greater | K::GreaterEqual | K::Less | K::LessEqual => {
            rule(None, Some(Parser::binary), P::Comparison)
        }
        K::And => rule(None, Some(Parser::binary), P::And),
        K::Or => rule(None, Some(Parser::binary), P::Or),
        K::Not => rule(Some(Parser::unary), None, P::None),
        K::Identifier => rule(Some(Parser::identifier), None, P::None),
        K::String | K::Integer | K::Double | K::True | K::False | K::Null => {
            rule(Some(Parser::literal), None, P::None)
        }
        _ => rule(None, None, P::None),
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Turns a token sequence into a [`Select`].
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Creates a parser over `tokens`. An `Eof` token is appended if the
    /// sequence does not already end with one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let (line, col) = tokens
                .last()
                .map(|t| (t.line, t.col + t.lexeme.len()))
                .unwrap_or((1, 1));
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                literal: None,
                line,
                col,
            });
        }
        Parser { tokens, pos: 0 }
    }

    /// Parses a complete statement, requiring every token to be consumed.
    pub fn parse(&mut self) -> Result<Select, ParseError> {
        self.expect(TokenKind::Select, "Expect 'SELECT' at start of query.")?;
        let projections = self.parse_projections()?;
        self.expect(TokenKind::From, "Expect 'FROM' after projections.")?;
        let table = self.expect(TokenKind::Identifier, "Expect table name.")?;

        let where_clause = if self.match_kind(TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let order_by = if self.match_kind(TokenKind::Order) {
            self.expect(TokenKind::By, "Expect 'BY' after 'ORDER'.")?;
            self.parse_order_by_list()?
        } else {
            Vec::new()
        };

        let limit = if self.match_kind(TokenKind::Limit) {
            Some(self.parse_limit()?)
        } else {
            None
        };

        self.expect(TokenKind::Eof, "Expect end of statement.")?;

        Ok(Select {
            projections,
            table,
            where_clause,
            order_by,
            limit,
        })
    }

    // =======================================================================
    // Token helpers
    // =======================================================================

    fn current(&self) -> &Token {
        // `new` guarantees a trailing Eof, and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::new(self.current().clone(), message)
    }

    // =======================================================================
    // Clauses
    // =======================================================================

    fn parse_projections(&mut self) -> Result<Vec<SelectItem>, ParseError> {
        if self.match_kind(TokenKind::Star) {
            if self.check(TokenKind::Comma) {
                return Err(self.error("Cannot have other columns after '*'."));
            }
            return Ok(vec![SelectItem::Wildcard]);
        }

        let mut items = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let alias = self.parse_optional_alias()?;
            items.push(SelectItem::Expr { expr, alias });
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    /// `AS name`, a bare `name`, or nothing.
    fn parse_optional_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.match_kind(TokenKind::As) {
            let name = self.expect(TokenKind::Identifier, "Expect alias after 'AS'.")?;
            return Ok(Some(name.lexeme));
        }
        if self.check(TokenKind::Identifier) {
            return Ok(Some(self.advance().lexeme));
        }
        Ok(None)
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderItem>, ParseError> {
        let mut items = vec![self.parse_order_by_item()?];
        while self.match_kind(TokenKind::Comma) {
            items.push(self.parse_order_by_item()?);
        }
        Ok(items)
    }

    fn parse_order_by_item(&mut self) -> Result<OrderItem, ParseError> {
        let expr = self.parse_expression()?;
        let ascending = if self.match_kind(TokenKind::Desc) {
            false
        } else {
            self.match_kind(TokenKind::Asc);
            true
        };
        Ok(OrderItem { expr, ascending })
    }

    fn parse_limit(&mut self) -> Result<Expr, ParseError> {
        if !self.check(TokenKind::Integer) {
            return Err(self.error("Expect an integer for LIMIT clause."));
        }
        let tok = self.advance();
        Ok(Expr::Literal(tok.literal.unwrap_or(Value::Null)))
    }

    // =======================================================================
    // Expressions
    // =======================================================================

    /// Parses a full expression (lowest precedence: `OR`).
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_precedence(Precedence::Or)
    }

    fn parse_precedence(&mut self, precedence: Precedence) -> Result<Expr, ParseError> {
        let prefix = match get_rule(self.current().kind).prefix {
            Some(f) => f,
            None => return Err(self.error("Expect expression.")),
        };
        let tok = self.advance();
        let mut left = prefix(self, tok)?;

        while precedence <= get_rule(self.current().kind).precedence {
            let op = self.advance();
            match get_rule(op.kind).infix {
                Some(infix) => left = infix(self, left, op)?,
                None => return Err(ParseError::new(op, "Expect expression.")),
            }
        }
        Ok(left)
    }

    // -- prefix handlers ----------------------------------------------------

    fn grouping(&mut self, _open: Token) -> Result<Expr, ParseError> {
        let inner = self.parse_expression()?;
        self.expect(TokenKind::RightParen, "Expect ')' after expression.")?;
        Ok(Expr::Grouping(Box::new(inner)))
    }

    fn unary(&mut self, operator: Token) -> Result<Expr, ParseError> {
        let right = self.parse_precedence(Precedence::Unary)?;
        Ok(Expr::Unary {
            operator,
            right: Box::new(right),
        })
    }

    fn literal(&mut self, tok: Token) -> Result<Expr, ParseError> {
        let value = match tok.kind {
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Null => Value::Null,
            _ => match tok.literal {
                Some(value) => value,
                None => return Err(ParseError::new(tok, "Expect literal value.")),
            },
        };
        Ok(Expr::Literal(value))
    }

    fn identifier(&mut self, tok: Token) -> Result<Expr, ParseError> {
        Ok(Expr::Identifier(tok))
    }

    // -- infix handlers -----------------------------------------------------

    fn binary(&mut self, left: Expr, operator: Token) -> Result<Expr, ParseError> {
        let precedence = get_rule(operator.kind).precedence;
        let right = self.parse_precedence(precedence.next())?;
        Ok(Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
