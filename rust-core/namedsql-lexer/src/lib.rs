// SPDX-License-Identifier: PMPL-1.0-or-later
//! NamedSQL Lexer
//!
//! Lossless SQL tokenization for the named-parameter translator.
//! Every byte of the input belongs to exactly one token, so rewriting
//! individual tokens and concatenating the result preserves spacing,
//! comments and literals of the original statement.

pub mod lexer;
pub mod token;

pub use lexer::tokenize;
pub use token::{first_significant, PlaceholderKind, Token, TokenKind};
