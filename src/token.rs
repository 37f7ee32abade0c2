//! The [`Token`] type and its [`Logos`] lexer implementation.

use logos::Logos;

use crate::{
    parser::ParseError,
    span::{Span, Spanned},
};

/// An atomic token, lexed from source code.
///
/// Literal payloads are kept as raw source fragments; decoding them (and
/// reporting malformed escapes or overflowing integers) is left to the
/// [`literal`](crate::literal) parsers, which are invoked by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r";[^\n]*")]
pub enum Token<'src> {
    // BRACKETS
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,

    // PUNCTUATION
    #[token(":")]
    Colon,
    #[token("->")]
    Arrow,
    #[token("...")]
    Ellipsis,

    // KEYWORDS
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("lambda")]
    Lambda,

    // LITERALS
    #[token("#t")]
    True,
    #[token("#f")]
    False,
    #[regex(r"-?[0-9]+", |lex| lex.slice(), priority = 2)]
    Int(&'src str),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    Str(&'src str),

    // IDENTIFIERS
    #[regex(r"[a-zA-Z_+\-*/<>=!?&|%^~][a-zA-Z0-9_+\-*/<>=!?&|%^~]*", |lex| lex.slice(), priority = 1)]
    Ident(&'src str),
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LeftParen => write!(f, "`(`"),
            Token::RightParen => write!(f, "`)`"),
            Token::LeftBrace => write!(f, "`{{`"),
            Token::RightBrace => write!(f, "`}}`"),
            Token::Colon => write!(f, "`:`"),
            Token::Arrow => write!(f, "`->`"),
            Token::Ellipsis => write!(f, "`...`"),
            Token::Let => write!(f, "`let`"),
            Token::If => write!(f, "`if`"),
            Token::Lambda => write!(f, "`lambda`"),
            Token::True => write!(f, "`#t`"),
            Token::False => write!(f, "`#f`"),
            Token::Int(raw) => write!(f, "integer `{raw}`"),
            Token::Str(raw) => write!(f, "string {raw}"),
            Token::Ident(name) => write!(f, "identifier `{name}`"),
        }
    }
}

/// Lexes `source` into a sequence of spanned tokens, failing on the first
/// fragment of the input that does not form a token.
pub fn lex(source: &str) -> Result<Vec<Spanned<Token<'_>>>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = Span::from(lexer.span());

        match result {
            Ok(token) => tokens.push(span.with(token)),
            Err(()) => return Err(ParseError::InvalidToken { span }),
        }
    }

    log::trace!("lexed {} tokens", tokens.len());
    Ok(tokens)
}
