// SPDX-License-Identifier: PMPL-1.0-or-later
//! Token types produced by the SQL lexer.

use std::fmt;

use serde::Serialize;

/// The flavour of a parameter placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderKind {
    /// `?`
    Positional,
    /// `:name`
    Colon,
    /// `#{name}` (iBATIS / MyBatis style)
    Ibatis,
    /// `$name` or `$1`
    Dollar,
}

impl PlaceholderKind {
    /// Whether the placeholder carries a name rather than binding by order.
    pub fn is_named(self) -> bool {
        !matches!(self, PlaceholderKind::Positional)
    }
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderKind::Positional => write!(f, "?"),
            PlaceholderKind::Colon => write!(f, ":name"),
            PlaceholderKind::Ibatis => write!(f, "#{{name}}"),
            PlaceholderKind::Dollar => write!(f, "$name"),
        }
    }
}

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// A maximal run of whitespace, kept verbatim.
    Whitespace,
    /// `-- ...` up to (not including) the line break.
    LineComment,
    /// `/* ... */`
    BlockComment,
    /// `'...'` or a dollar-quoted body such as `$$...$$`.
    StringLiteral,
    /// `"..."` or `` `...` ``
    QuotedIdentifier,
    Number,
    /// Identifier or keyword.
    Word,
    Placeholder(PlaceholderKind),
    /// Operators and punctuation.
    Operator,
}

/// A single lexical word, borrowing its text from the source SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of `text` in the source.
    pub offset: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str, offset: usize) -> Self {
        Self { kind, text, offset }
    }

    /// Whitespace and comments: tokens with no effect on statement meaning.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// The placeholder kind, if this token is one.
    pub fn placeholder(&self) -> Option<PlaceholderKind> {
        match self.kind {
            TokenKind::Placeholder(kind) => Some(kind),
            _ => None,
        }
    }

    /// The bare parameter name of a named placeholder.
    ///
    /// `:id` and `$id` yield `id`, `#{ user.id }` yields `user.id`.
    /// Positional `?` and non-placeholders yield `None`.
    pub fn placeholder_name(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::Placeholder(PlaceholderKind::Colon)
            | TokenKind::Placeholder(PlaceholderKind::Dollar) => Some(&self.text[1..]),
            TokenKind::Placeholder(PlaceholderKind::Ibatis) => {
                Some(self.text[2..self.text.len() - 1].trim())
            }
            _ => None,
        }
    }

    /// Exclusive end offset of this token in the source.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

/// The first token that is not whitespace or a comment.
pub fn first_significant<'a, 't>(tokens: &'t [Token<'a>]) -> Option<&'t Token<'a>> {
    tokens.iter().find(|t| !t.is_trivia())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_names() {
        let colon = Token::new(TokenKind::Placeholder(PlaceholderKind::Colon), ":id", 0);
        assert_eq!(colon.placeholder_name(), Some("id"));

        let dollar = Token::new(TokenKind::Placeholder(PlaceholderKind::Dollar), "$2", 0);
        assert_eq!(dollar.placeholder_name(), Some("2"));

        let ibatis = Token::new(
            TokenKind::Placeholder(PlaceholderKind::Ibatis),
            "#{ user.id }",
            0,
        );
        assert_eq!(ibatis.placeholder_name(), Some("user.id"));

        let positional = Token::new(TokenKind::Placeholder(PlaceholderKind::Positional), "?", 0);
        assert_eq!(positional.placeholder_name(), None);
    }

    #[test]
    fn test_trivia_and_first_significant() {
        let tokens = [
            Token::new(TokenKind::Whitespace, "  ", 0),
            Token::new(TokenKind::BlockComment, "/* x */", 2),
            Token::new(TokenKind::Word, "SELECT", 9),
        ];
        assert!(tokens[0].is_trivia());
        assert!(tokens[1].is_trivia());
        assert_eq!(first_significant(&tokens).map(|t| t.text), Some("SELECT"));
        assert_eq!(tokens[2].end(), 15);
    }

    #[test]
    fn test_named_kinds() {
        assert!(!PlaceholderKind::Positional.is_named());
        assert!(PlaceholderKind::Colon.is_named());
        assert!(PlaceholderKind::Ibatis.is_named());
        assert!(PlaceholderKind::Dollar.is_named());
        assert_eq!(PlaceholderKind::Ibatis.to_string(), "#{name}");
    }
}
