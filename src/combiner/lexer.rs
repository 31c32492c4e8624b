//! Tokens of the combiner expression language.

use std::ops::Range;

use logos::Logos;

use crate::error::{CompileError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?|\.[0-9]+([eE][+-]?[0-9]+)?")]
    Number,
    /// Dots are allowed after the first character, so `SRC_NO_DATA.depth`
    /// is one name.
    #[regex(r"[_A-Za-z][_A-Za-z0-9.]*")]
    Ident,
    #[token("**")]
    StarStar,
    #[token("//")]
    SlashSlash,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub span: Range<usize>,
    pub text: &'s str,
}

pub fn lex(source: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let kind = result.map_err(|_| {
            CompileError::new(format!(
                "Unexpected character at position {}: {:?}",
                span.start,
                &source[span.clone()]
            ))
        })?;

        tokens.push(Token {
            kind,
            text: &source[span.clone()],
            span,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_operators() {
        assert_eq!(
            kinds("+ - * / // % ** ( ) ,"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::SlashSlash,
                TokenKind::Percent,
                TokenKind::StarStar,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Comma,
            ]
        );
    }

    #[test]
    fn test_lex_numbers_and_names() {
        let tokens = lex("2.5e-3*soil.depth+.5").unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].text, "2.5e-3");
        assert_eq!(tokens[2].kind, TokenKind::Ident);
        assert_eq!(tokens[2].text, "soil.depth");
        assert_eq!(tokens[4].text, ".5");
        assert_eq!(tokens[4].span, 18..20);
    }

    #[test]
    fn test_lex_rejects_unknown_characters() {
        let err = lex("a == b").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Unexpected character at position 2: \"=\""
        );
    }
}
