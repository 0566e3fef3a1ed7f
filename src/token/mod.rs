// Copyright 2026 The QA Platform Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::str::CharIndices;

use unicode_xid::UnicodeXID;

use self::TokenKind::*;
use crate::builtins::is_builtin_fn;


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Number,
    String,
    Identifier,
    Operator,
    Comparison,
    Function,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Eof,
    Unknown,
}

/// A single lexeme with its position in the source text.  `offset` is a
/// byte offset usable for slicing; `line` and `column` are 1-based and
/// counted in characters for editor diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'input> {
    pub kind: TokenKind,
    pub lexeme: &'input str,
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.offset + self.lexeme.len()
    }
}

pub struct Lexer<'input> {
    text: &'input str,
    chars: CharIndices<'input>,
    lookahead: Option<(usize, char)>,
    line: u32,
    column: u32,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        let mut t = Lexer {
            text: input,
            chars: input.char_indices(),
            lookahead: None,
            line: 1,
            column: 1,
        };
        t.bump();
        t
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        if let Some((_, c)) = self.lookahead {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.lookahead = self.chars.next();
        self.lookahead
    }

    fn take_while<F>(&mut self, mut keep_going: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        self.take_until(|c| !keep_going(c))
    }

    fn take_until<F>(&mut self, mut terminate: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        loop {
            match self.lookahead {
                None => {
                    return None;
                }
                Some((idx1, c)) => {
                    if terminate(c) {
                        return Some(idx1);
                    } else {
                        self.bump();
                    }
                }
            }
        }
    }

    fn spanned(
        &self,
        kind: TokenKind,
        start: usize,
        len: usize,
        line: u32,
        column: u32,
    ) -> Token<'input> {
        Token {
            kind,
            lexeme: &self.text[start..start + len],
            offset: start,
            line,
            column,
        }
    }

    fn consume(
        &mut self,
        kind: TokenKind,
        start: usize,
        len: usize,
        line: u32,
        column: u32,
    ) -> Option<Token<'input>> {
        self.bump();
        Some(self.spanned(kind, start, len, line, column))
    }

    fn word(&mut self, idx0: usize) -> (usize, &'input str, usize) {
        match self.take_while(is_identifier_continue) {
            Some(end) => (idx0, &self.text[idx0..end], end),
            None => (idx0, &self.text[idx0..], self.text.len()),
        }
    }

    fn identifierish(&mut self, idx0: usize, line: u32, column: u32) -> Token<'input> {
        let (start, word, _end) = self.word(idx0);
        // classified at tokenize time: the grammar treats whitelisted
        // function names differently from bare references
        let kind = if is_builtin_fn(word) { Function } else { Identifier };
        Token {
            kind,
            lexeme: word,
            offset: start,
            line,
            column,
        }
    }

    fn number(&mut self, idx0: usize, line: u32, column: u32) -> Token<'input> {
        // greedy over digits and dots; the parser validates the lexeme at
        // the numeric-literal boundary (so `1.2.3` surfaces there)
        let end = self
            .take_while(|c| c.is_ascii_digit() || c == '.')
            .unwrap_or(self.text.len());
        Token {
            kind: Number,
            lexeme: &self.text[idx0..end],
            offset: idx0,
            line,
            column,
        }
    }

    fn string(&mut self, idx0: usize, quote: char, line: u32, column: u32) -> Token<'input> {
        // eat the opening quote
        self.bump();

        match self.take_until(|c| c == quote) {
            Some(idx1) => {
                // eat the closing quote
                self.bump();
                Token {
                    kind: String,
                    lexeme: &self.text[idx0..idx1 + 1],
                    offset: idx0,
                    line,
                    column,
                }
            }
            // unterminated: the lexeme runs to end of input
            None => Token {
                kind: String,
                lexeme: &self.text[idx0..],
                offset: idx0,
                line,
                column,
            },
        }
    }

    fn eof(&self) -> Token<'input> {
        Token {
            kind: Eof,
            lexeme: &self.text[self.text.len()..],
            offset: self.text.len(),
            line: self.line,
            column: self.column,
        }
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Token<'input>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.line;
            let column = self.column;
            return match self.lookahead {
                Some((i, '(')) => self.consume(LParen, i, 1, line, column),
                Some((i, ')')) => self.consume(RParen, i, 1, line, column),
                Some((i, ',')) => self.consume(Comma, i, 1, line, column),
                Some((i, ';')) => self.consume(Semicolon, i, 1, line, column),
                Some((i, '+')) => self.consume(Operator, i, 1, line, column),
                Some((i, '-')) => self.consume(Operator, i, 1, line, column),
                Some((i, '/')) => self.consume(Operator, i, 1, line, column),
                Some((i, '%')) => self.consume(Operator, i, 1, line, column),
                Some((i, '^')) => self.consume(Operator, i, 1, line, column),
                Some((i, '?')) => self.consume(Operator, i, 1, line, column),
                Some((i, ':')) => self.consume(Operator, i, 1, line, column),
                Some((i, '*')) => {
                    match self.bump() {
                        Some((_, '*')) => self.consume(Operator, i, 2, line, column),
                        // we've already bumped, don't consume
                        _ => Some(self.spanned(Operator, i, 1, line, column)),
                    }
                }
                Some((i, '&')) => {
                    match self.bump() {
                        Some((_, '&')) => self.consume(Operator, i, 2, line, column),
                        // a lone '&' is not part of the language
                        _ => Some(self.spanned(Unknown, i, 1, line, column)),
                    }
                }
                Some((i, '|')) => {
                    match self.bump() {
                        Some((_, '|')) => self.consume(Operator, i, 2, line, column),
                        _ => Some(self.spanned(Unknown, i, 1, line, column)),
                    }
                }
                Some((i, '>')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(Comparison, i, 2, line, column),
                        // we've already bumped, don't consume
                        _ => Some(self.spanned(Comparison, i, 1, line, column)),
                    }
                }
                Some((i, '<')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(Comparison, i, 2, line, column),
                        _ => Some(self.spanned(Comparison, i, 1, line, column)),
                    }
                }
                Some((i, '=')) => {
                    match self.bump() {
                        Some((_, '=')) => match self.bump() {
                            Some((_, '=')) => self.consume(Comparison, i, 3, line, column),
                            _ => Some(self.spanned(Comparison, i, 2, line, column)),
                        },
                        // a lone '=' is not an operator; the parser
                        // suggests '==' in its diagnostic
                        _ => Some(self.spanned(Unknown, i, 1, line, column)),
                    }
                }
                Some((i, '!')) => {
                    match self.bump() {
                        Some((_, '=')) => match self.bump() {
                            Some((_, '=')) => self.consume(Comparison, i, 3, line, column),
                            _ => Some(self.spanned(Comparison, i, 2, line, column)),
                        },
                        _ => Some(self.spanned(Operator, i, 1, line, column)),
                    }
                }
                Some((i, c @ ('"' | '\''))) => Some(self.string(i, c, line, column)),
                Some((i, c)) if is_identifier_start(c) => {
                    Some(self.identifierish(i, line, column))
                }
                Some((i, c)) if c.is_ascii_digit() => Some(self.number(i, line, column)),
                Some((_, c)) if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                Some((i, _)) => {
                    self.bump(); // eat whatever is killing us
                    let end = match self.lookahead {
                        Some((end, _)) => end,
                        None => self.text.len(),
                    };
                    Some(Token {
                        kind: Unknown,
                        lexeme: &self.text[i..end],
                        offset: i,
                        line,
                        column,
                    })
                }
                None => None,
            };
        }
    }
}

/// Turn a formula into its token stream.  Total: malformed input yields
/// `Unknown` tokens rather than an error, and a zero-width `Eof` token is
/// always appended so lookahead never runs off the end.  Shared by the
/// parser and the introspection utilities.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer::new(input);
    let mut tokens: Vec<Token<'_>> = Vec::new();
    for tok in lexer.by_ref() {
        tokens.push(tok);
    }
    tokens.push(lexer.eof());
    tokens
}

fn is_identifier_start(c: char) -> bool {
    UnicodeXID::is_xid_start(c) || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    UnicodeXID::is_xid_continue(c)
}
