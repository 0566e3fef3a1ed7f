// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Hand-written recursive descent parser for scoring formulas.
//!
//! The parser never fails outright: diagnostics accumulate while it keeps
//! building a best-effort tree, substituting literal-zero placeholders
//! where no production fits, so a single pass reports every problem in a
//! formula.  `parse` is the strict wrapper that turns any error-severity
//! diagnostic into an `Err`.

use crate::ast::{BinaryOp, Expr, Loc, UnaryOp};
use crate::common::{ErrorCode, FormulaError, Ident};
use crate::token::{Token, TokenKind, tokenize};

#[cfg(test)]
mod tests;

/// Result of a lenient parse: the best tree we could build plus every
/// diagnostic encountered along the way.
#[derive(Clone, Debug)]
pub struct ParseOutput {
    pub ast: Option<Expr>,
    pub errors: Vec<FormulaError>,
    pub warnings: Vec<FormulaError>,
}

fn diag(code: ErrorCode, start: usize, end: usize) -> FormulaError {
    FormulaError {
        start: start as u16,
        end: end as u16,
        code,
    }
}

/// A string token whose closing quote never arrived.
fn is_unterminated(tok: &Token) -> bool {
    debug_assert_eq!(tok.kind, TokenKind::String);
    match tok.lexeme.chars().next() {
        Some(quote) => tok.lexeme.len() < 2 || !tok.lexeme.ends_with(quote),
        None => false,
    }
}

/// The zero literal substituted wherever recovery discards input.
fn placeholder(loc: Loc) -> Expr {
    Expr::Const("0".to_string(), 0.0, loc)
}

/// Parser state holding the tokenized input
struct Parser<'input> {
    tokens: Vec<Token<'input>>,
    pos: usize,
    errors: Vec<FormulaError>,
    warnings: Vec<FormulaError>,
}

impl<'input> Parser<'input> {
    /// Tokenize the input and seed the diagnostic lists with everything
    /// the lexical phase already knows is wrong.
    fn new(input: &'input str) -> Self {
        let tokens = tokenize(input);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for tok in &tokens {
            match tok.kind {
                TokenKind::Unknown => {
                    errors.push(diag(ErrorCode::InvalidToken, tok.offset, tok.end()));
                }
                TokenKind::String if is_unterminated(tok) => {
                    warnings.push(diag(ErrorCode::UnclosedString, tok.offset, tok.end()));
                }
                _ => {}
            }
        }
        Parser {
            tokens,
            pos: 0,
            errors,
            warnings,
        }
    }

    /// Peek at the current token without consuming it.  The trailing Eof
    /// token reads as None so callers can treat it as end of input.
    fn peek(&self) -> Option<&Token<'input>> {
        match self.tokens.get(self.pos) {
            Some(tok) if tok.kind != TokenKind::Eof => Some(tok),
            _ => None,
        }
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|tok| tok.kind)
    }

    /// Operator lexeme of the current token, if it is an operator
    fn peek_op(&self) -> Option<&'input str> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Operator => Some(tok.lexeme),
            _ => None,
        }
    }

    /// Comparison lexeme of the current token, if it is a comparison
    fn peek_cmp(&self) -> Option<&'input str> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Comparison => Some(tok.lexeme),
            _ => None,
        }
    }

    /// Kind of the token after the current one (used to spot `name(`)
    fn peek_next_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos + 1).map(|tok| tok.kind)
    }

    /// Advance to the next token and return the consumed token
    fn advance(&mut self) -> Option<Token<'input>> {
        match self.peek() {
            Some(tok) => {
                let tok = *tok;
                self.pos += 1;
                Some(tok)
            }
            None => None,
        }
    }

    /// Get the position for end-of-input errors
    fn eof_position(&self) -> usize {
        // tokenize always appends a zero-width Eof at the input's end
        self.tokens.last().map(|tok| tok.offset).unwrap_or(0)
    }

    fn is_at_end(&self) -> bool {
        self.peek().is_none()
    }

    /// Record an error at the current token (or at end of input).  An
    /// Unknown token gets no second report; the lexical phase already
    /// flagged it.
    fn unexpected(&mut self) {
        let err = match self.peek() {
            Some(tok) if tok.kind == TokenKind::Unknown => return,
            Some(tok) => diag(ErrorCode::UnrecognizedToken, tok.offset, tok.end()),
            None => {
                let pos = self.eof_position();
                diag(ErrorCode::UnrecognizedEof, pos, pos + 1)
            }
        };
        self.errors.push(err);
    }

    /// Span to attach to a placeholder produced at the current position.
    fn here(&self) -> Loc {
        match self.peek() {
            Some(tok) => Loc::new(tok.offset, tok.end()),
            None => {
                let pos = self.eof_position();
                Loc::new(pos, pos + 1)
            }
        }
    }

    /// Consume a closing paren, returning its end offset.  On failure
    /// records `UnclosedParen` and returns None without consuming, so the
    /// stray token stays available to the enclosing production.
    fn expect_rparen(&mut self) -> Option<usize> {
        if self.peek_kind() == Some(TokenKind::RParen) {
            // advance() returned Some because peek did
            let tok = self.advance()?;
            return Some(tok.end());
        }
        let err = match self.peek() {
            Some(tok) => diag(ErrorCode::UnclosedParen, tok.offset, tok.end()),
            None => {
                let pos = self.eof_position();
                diag(ErrorCode::UnclosedParen, pos, pos + 1)
            }
        };
        self.errors.push(err);
        None
    }

    /// Parse a whole formula from the token stream.
    fn parse_formula(&mut self) -> Option<Expr> {
        if self.is_at_end() {
            self.errors.push(diag(ErrorCode::EmptyFormula, 0, 0));
            return None;
        }

        let expr = self.parse_expr();

        // tokens left over after a complete expression; skip over unknown
        // ones, which the lexical phase already flagged
        let leftover = self.tokens[self.pos..]
            .iter()
            .find(|tok| !matches!(tok.kind, TokenKind::Unknown | TokenKind::Eof));
        if let Some(tok) = leftover {
            let err = diag(ErrorCode::ExtraToken, tok.offset, tok.end());
            self.errors.push(err);
        }

        Some(expr)
    }

    /// Parse a top-level expression (the conditional tier)
    fn parse_expr(&mut self) -> Expr {
        let cond = self.parse_logical_or();

        if self.peek_op() == Some("?") {
            self.advance();
            let t = self.parse_expr();
            let f = if self.peek_op() == Some(":") {
                self.advance();
                self.parse_expr()
            } else {
                // missing ':' gets one diagnostic and a zero else-branch
                let loc = self.here();
                self.unexpected();
                placeholder(loc)
            };
            let loc = cond.get_loc().union(&f.get_loc());
            return Expr::If(Box::new(cond), Box::new(t), Box::new(f), loc);
        }

        cond
    }

    /// Parse `||` - the lowest-precedence binary operator
    fn parse_logical_or(&mut self) -> Expr {
        let mut left = self.parse_logical_and();

        while self.peek_op() == Some("||") {
            self.advance();
            let right = self.parse_logical_and();
            let loc = left.get_loc().union(&right.get_loc());
            left = Expr::Op2(BinaryOp::Or, Box::new(left), Box::new(right), loc);
        }

        left
    }

    /// Parse `&&`
    fn parse_logical_and(&mut self) -> Expr {
        let mut left = self.parse_comparison();

        while self.peek_op() == Some("&&") {
            self.advance();
            let right = self.parse_comparison();
            let loc = left.get_loc().union(&right.get_loc());
            left = Expr::Op2(BinaryOp::And, Box::new(left), Box::new(right), loc);
        }

        left
    }

    /// Parse comparison operators (>, <, >=, <=, ==, !=, ===, !==)
    fn parse_comparison(&mut self) -> Expr {
        let mut left = self.parse_additive();

        loop {
            let op = match self.peek_cmp() {
                Some(">") => BinaryOp::Gt,
                Some("<") => BinaryOp::Lt,
                Some(">=") => BinaryOp::Gte,
                Some("<=") => BinaryOp::Lte,
                Some("==") => BinaryOp::Eq,
                Some("!=") => BinaryOp::Neq,
                Some("===") => BinaryOp::StrictEq,
                Some("!==") => BinaryOp::StrictNeq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive();
            let loc = left.get_loc().union(&right.get_loc());
            left = Expr::Op2(op, Box::new(left), Box::new(right), loc);
        }

        left
    }

    /// Parse additive operators (+, -)
    fn parse_additive(&mut self) -> Expr {
        let mut left = self.parse_multiplicative();

        loop {
            let op = match self.peek_op() {
                Some("+") => BinaryOp::Add,
                Some("-") => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative();
            let loc = left.get_loc().union(&right.get_loc());
            left = Expr::Op2(op, Box::new(left), Box::new(right), loc);
        }

        left
    }

    /// Parse multiplicative operators (*, /, %)
    fn parse_multiplicative(&mut self) -> Expr {
        let mut left = self.parse_exponent();

        loop {
            let op = match self.peek_op() {
                Some("*") => BinaryOp::Mul,
                Some("/") => BinaryOp::Div,
                Some("%") => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_exponent();
            let loc = left.get_loc().union(&right.get_loc());
            left = Expr::Op2(op, Box::new(left), Box::new(right), loc);
        }

        left
    }

    /// Parse exponentiation (^ or **), which is right-associative: the
    /// right operand recurses back into this tier so 2^3^2 is 2^(3^2).
    fn parse_exponent(&mut self) -> Expr {
        let base = self.parse_unary();

        if matches!(self.peek_op(), Some("^") | Some("**")) {
            self.advance();
            let exp = self.parse_exponent();
            let loc = base.get_loc().union(&exp.get_loc());
            return Expr::Op2(BinaryOp::Exp, Box::new(base), Box::new(exp), loc);
        }

        base
    }

    /// Parse unary operators (+, -, !).  Unary binds tighter than
    /// exponentiation, so -2^2 is (-2)^2.
    fn parse_unary(&mut self) -> Expr {
        let op = match self.peek_op() {
            Some("+") => UnaryOp::Positive,
            Some("-") => UnaryOp::Negative,
            Some("!") => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        // peek_op returned Some, so there is a token to consume
        let lpos = match self.advance() {
            Some(tok) => tok.offset,
            None => 0,
        };
        let operand = self.parse_unary();
        let rpos = operand.get_loc().end as usize;
        Expr::Op1(op, Box::new(operand), Loc::new(lpos, rpos))
    }

    /// Parse an atomic expression (literal, variable, call, parens)
    fn parse_primary(&mut self) -> Expr {
        match self.peek_kind() {
            Some(TokenKind::Number) => {
                let tok = match self.advance() {
                    Some(tok) => tok,
                    None => return placeholder(self.here()),
                };
                let loc = Loc::new(tok.offset, tok.end());
                match tok.lexeme.parse::<f64>() {
                    Ok(n) => Expr::Const(tok.lexeme.to_string(), n, loc),
                    Err(_) => {
                        // e.g. "1.2.3": one token, not a number
                        self.errors.push(diag(ErrorCode::MalformedNumber, tok.offset, tok.end()));
                        Expr::Const(tok.lexeme.to_string(), 0.0, loc)
                    }
                }
            }
            Some(TokenKind::String) => {
                let tok = match self.advance() {
                    Some(tok) => tok,
                    None => return placeholder(self.here()),
                };
                let loc = Loc::new(tok.offset, tok.end());
                let mut body = tok.lexeme;
                if let Some(quote) = body.chars().next() {
                    body = &body[1..];
                    body = body.strip_suffix(quote).unwrap_or(body);
                }
                Expr::Str(body.to_string(), loc)
            }
            Some(TokenKind::Function) => {
                if self.peek_next_kind() == Some(TokenKind::LParen) {
                    return self.parse_call();
                }
                // a function name with no call syntax falls back to a
                // plain variable so evaluation still produces a value
                let tok = match self.advance() {
                    Some(tok) => tok,
                    None => return placeholder(self.here()),
                };
                self.errors.push(diag(ErrorCode::ExpectedLParen, tok.offset, tok.end()));
                Expr::Var(tok.lexeme.to_string(), Loc::new(tok.offset, tok.end()))
            }
            Some(TokenKind::Identifier) => {
                if self.peek_next_kind() == Some(TokenKind::LParen) {
                    // unknown callee: parse it as a call anyway and let
                    // the semantic check reject the name
                    return self.parse_call();
                }
                let tok = match self.advance() {
                    Some(tok) => tok,
                    None => return placeholder(self.here()),
                };
                Expr::Var(tok.lexeme.to_string(), Loc::new(tok.offset, tok.end()))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.parse_expr();
                self.expect_rparen();
                expr
            }
            Some(TokenKind::Unknown) => {
                // already reported when the parser was constructed
                let loc = self.here();
                self.advance();
                placeholder(loc)
            }
            Some(TokenKind::RParen) | Some(TokenKind::Comma) => {
                // likely a hole in an enclosing construct, e.g. `min(,2)`
                // or `()`: report it but leave the token for the caller
                let loc = self.here();
                self.unexpected();
                placeholder(loc)
            }
            Some(TokenKind::Operator) if matches!(self.peek_op(), Some("?") | Some(":")) => {
                // ternary punctuation is a sync point for the conditional
                // tier, same deal as ')' above
                let loc = self.here();
                self.unexpected();
                placeholder(loc)
            }
            Some(_) => {
                let loc = self.here();
                self.unexpected();
                self.advance();
                placeholder(loc)
            }
            None => {
                let loc = self.here();
                self.unexpected();
                placeholder(loc)
            }
        }
    }

    /// Parse a call: the current token is the callee name and the next is
    /// `(`.  Function names are case-insensitive, so the stored callee is
    /// lowercased; the registries are keyed the same way.
    fn parse_call(&mut self) -> Expr {
        let name_tok = match self.advance() {
            Some(tok) => tok,
            None => return placeholder(self.here()),
        };
        let name: Ident = name_tok.lexeme.to_lowercase();
        let lpos = name_tok.offset;

        let lparen_end = match self.advance() {
            Some(tok) => tok.end(),
            None => name_tok.end(),
        };
        let mut args = self.parse_call_args();
        let rpos = match self.expect_rparen() {
            Some(end) => end,
            None => args
                .last()
                .map(|arg| arg.get_loc().end as usize)
                .unwrap_or(lparen_end),
        };
        let loc = Loc::new(lpos, rpos);

        // if(cond, a, b) is the conditional in disguise: rewrite it to the
        // same node the ternary builds, so only one branch ever evaluates
        if name == "if" && args.len() == 3 {
            let f = args.pop().unwrap_or_default();
            let t = args.pop().unwrap_or_default();
            let cond = args.pop().unwrap_or_default();
            return Expr::If(Box::new(cond), Box::new(t), Box::new(f), loc);
        }

        Expr::App(name, args, loc)
    }

    /// Parse comma-separated call arguments.  Empty lists and a trailing
    /// comma are both fine; a missing closing paren is the caller's to
    /// report.
    fn parse_call_args(&mut self) -> Vec<Expr> {
        let mut exprs = Vec::new();

        if matches!(self.peek_kind(), Some(TokenKind::RParen) | None) {
            return exprs;
        }

        exprs.push(self.parse_expr());

        while self.peek_kind() == Some(TokenKind::Comma) {
            self.advance();

            if matches!(self.peek_kind(), Some(TokenKind::RParen) | None) {
                break;
            }

            exprs.push(self.parse_expr());
        }

        exprs
    }
}

/// Parse a formula leniently: always returns the best-effort tree it
/// could build together with every diagnostic.
pub fn parse_partial(input: &str) -> ParseOutput {
    let mut parser = Parser::new(input);
    let ast = parser.parse_formula();
    ParseOutput {
        ast,
        errors: parser.errors,
        warnings: parser.warnings,
    }
}

/// Parse a formula strictly.
///
/// Returns:
/// - `Ok(expr)` when the formula parsed without errors
/// - `Err(errors)` when any error-severity diagnostic was produced;
///   empty input lands here with `empty_formula`
///
/// Warnings (e.g. an unterminated string) do not fail a strict parse.
pub fn parse(input: &str) -> Result<Expr, Vec<FormulaError>> {
    let output = parse_partial(input);
    match output.ast {
        Some(ast) if output.errors.is_empty() => Ok(ast),
        _ => Err(output.errors),
    }
}
