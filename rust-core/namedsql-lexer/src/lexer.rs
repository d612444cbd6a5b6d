// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! SQL tokenizer.
//!
//! Splits SQL text into a lossless sequence of tokens:
//! - Whitespace and comments are kept as tokens
//! - String literals, quoted identifiers and dollar-quoted bodies are atomic
//! - `?`, `:name`, `#{name}` and `$name` are recognized as placeholders
//!   outside literals and comments
//!
//! Concatenating the text of every token reproduces the input exactly.

use crate::token::{PlaceholderKind, Token, TokenKind};

/// Multi-character operators, longest first.
const MULTI_CHAR_OPERATORS: &[&str] = &["->>", "::", "<=", ">=", "<>", "!=", "||", ":=", "->", "=>"];

/// Tokenize SQL text.
pub fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer::new(sql);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }
    tokens
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn emit(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token::new(kind, &self.src[start..self.pos], start)
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        let start = self.pos;
        let ch = self.peek()?;

        let kind = match ch {
            c if c.is_whitespace() => {
                self.bump_while(char::is_whitespace);
                TokenKind::Whitespace
            }
            '-' if self.peek_nth(1) == Some('-') => {
                self.bump_while(|c| c != '\n');
                TokenKind::LineComment
            }
            '/' if self.peek_nth(1) == Some('*') => {
                self.block_comment();
                TokenKind::BlockComment
            }
            '\'' => {
                self.quoted('\'', true);
                TokenKind::StringLiteral
            }
            '"' | '`' => {
                self.quoted(ch, false);
                TokenKind::QuotedIdentifier
            }
            '?' => {
                self.bump();
                TokenKind::Placeholder(PlaceholderKind::Positional)
            }
            ':' if self.peek_nth(1).is_some_and(is_name_char) => {
                self.bump();
                self.name_with_path();
                TokenKind::Placeholder(PlaceholderKind::Colon)
            }
            '#' if self.peek_nth(1) == Some('{') => match self.ibatis_end() {
                Some(end) => {
                    self.pos = end;
                    TokenKind::Placeholder(PlaceholderKind::Ibatis)
                }
                None => {
                    self.bump();
                    TokenKind::Operator
                }
            },
            '$' => self.dollar(),
            c if c.is_ascii_digit() => {
                self.number();
                TokenKind::Number
            }
            '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.number();
                TokenKind::Number
            }
            c if c.is_alphabetic() || c == '_' => {
                self.bump_while(|c| c.is_alphanumeric() || c == '_' || c == '$');
                TokenKind::Word
            }
            _ => {
                self.operator();
                TokenKind::Operator
            }
        };

        Some(self.emit(kind, start))
    }

    fn block_comment(&mut self) {
        match self.rest()[2..].find("*/") {
            Some(idx) => self.pos += 2 + idx + 2,
            None => self.pos = self.src.len(),
        }
    }

    /// Consume a quoted run. A doubled quote is an escaped quote; when
    /// `backslash` is set, `\x` escapes the following char as well.
    fn quoted(&mut self, quote: char, backslash: bool) {
        self.bump();
        while let Some(ch) = self.bump() {
            if backslash && ch == '\\' {
                self.bump();
            } else if ch == quote {
                if self.peek() == Some(quote) {
                    self.bump();
                } else {
                    return;
                }
            }
        }
    }

    /// Placeholder name after `:`; dots join path segments (`:user.id`).
    fn name_with_path(&mut self) {
        loop {
            self.bump_while(is_name_char);
            if self.peek() == Some('.') && self.peek_nth(1).is_some_and(is_name_char) {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Absolute end offset of a `#{...}` placeholder starting at `pos`,
    /// or `None` if it is unterminated or empty.
    fn ibatis_end(&self) -> Option<usize> {
        let rest = self.rest();
        let close = rest[2..].find(['}', '\n'])? + 2;
        if !rest[close..].starts_with('}') || rest[2..close].trim().is_empty() {
            return None;
        }
        Some(self.pos + close + 1)
    }

    /// `$name` / `$1` placeholder, or a dollar-quoted body (`$$...$$`,
    /// `$tag$...$tag$`). A lone `$` is an operator.
    fn dollar(&mut self) -> TokenKind {
        let rest = self.rest();
        let tag_len = rest[1..]
            .find(|c: char| !is_name_char(c))
            .unwrap_or(rest.len() - 1);
        let tag = &rest[1..1 + tag_len];
        let tag_is_identifier = tag.chars().next().map_or(true, |c| !c.is_ascii_digit());

        if tag_is_identifier && rest[1 + tag_len..].starts_with('$') {
            let delimiter = &rest[..tag_len + 2];
            let body_start = delimiter.len();
            match rest[body_start..].find(delimiter) {
                Some(idx) => self.pos += body_start + idx + delimiter.len(),
                None => self.pos = self.src.len(),
            }
            return TokenKind::StringLiteral;
        }

        self.bump();
        if tag_len == 0 {
            return TokenKind::Operator;
        }
        self.pos += tag_len;
        TokenKind::Placeholder(PlaceholderKind::Dollar)
    }

    fn number(&mut self) {
        self.bump_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.bump();
            self.bump_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let signed = matches!(self.peek_nth(1), Some('+') | Some('-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                if signed {
                    self.bump();
                }
                self.bump_while(|c| c.is_ascii_digit());
            }
        }
    }

    fn operator(&mut self) {
        let rest = self.rest();
        if let Some(op) = MULTI_CHAR_OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            self.pos += op.len();
        } else {
            self.bump();
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
