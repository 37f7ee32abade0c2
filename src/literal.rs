//! Manual parser implementations for literal expressions.
//!
//! Parsers in this module assume that their inputs are well-formed with
//! respect to the lexer. For example, a string literal may be malformed due to an
//! invalid escape character, but will *always* be correctly delimited by
//! double quotes.

use winnow::{
    ModalResult, Parser,
    ascii::escaped_transform,
    combinator::{alt, delimited, opt},
    error::{ContextError, ErrMode, InputError},
    token::{take_till, take_while},
};

use crate::span::{Span, Spanned};

const BACKSLASH: char = '\\';
const DOUBLE_QUOTE: char = '"';
const MINUS: char = '-';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteralError {
    pub bad_escape_span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLiteralOverflowError {
    pub span: Span,
}

/// Decodes a double-quoted string literal, resolving its escape sequences.
pub fn parse_string_literal(
    Spanned { item: input, span }: Spanned<&str>,
) -> Result<String, StringLiteralError> {
    let mut parser = delimited("\"", string_contents, "\"");

    parser.parse(input).map_err(|error| {
        let escape_span_start = span.start + error.offset() as u32;
        // point at the backslash and the character following it
        let bad_escape_span = Span {
            start: escape_span_start.saturating_sub(1),
            end: (escape_span_start + 1).min(span.end),
        };

        StringLiteralError { bad_escape_span }
    })
}

/// Parses a well-formed decimal integer literal with an optional leading
/// minus sign. The only failure mode for this function is if the literal
/// does not fit into an `i64`.
pub fn parse_int_literal(
    Spanned { item: input, span }: Spanned<&str>,
) -> Result<i64, IntLiteralOverflowError> {
    (opt(MINUS), digits)
        .parse(input)
        .ok()
        .and_then(|(sign, magnitude)| match sign {
            Some(_) => 0i64.checked_sub_unsigned(magnitude),
            None => i64::try_from(magnitude).ok(),
        })
        .ok_or(IntLiteralOverflowError { span })
}

fn string_contents<'s>(
    input: &mut &'s str,
) -> ModalResult<String, InputError<&'s str>> {
    escaped_transform(
        take_till(1.., |c| c == BACKSLASH || c == DOUBLE_QUOTE),
        BACKSLASH,
        alt((
            "\\".value("\\"), // BACKSLASH
            "\"".value("\""), // DOUBLE QUOTE
            "n".value("\n"),  // NEWLINE (LINE FEED)
            "r".value("\r"),  // CARRIAGE RETURN
            "t".value("\t"),  // HORIZONTAL TAB
            "0".value("\0"),  // ASCII NULL
        )),
    )
    .parse_next(input)
}

/// Parses a run of decimal digits into a `u64`, failing on overflow.
fn digits(input: &mut &str) -> ModalResult<u64> {
    take_while(1.., |c: char| c.is_ascii_digit())
        .parse_next(input)
        .and_then(|s| {
            s.chars()
                .try_fold(0u64, |sum, digit| {
                    let digit = u64::from(digit as u8 - b'0');
                    sum.checked_mul(10)?.checked_add(digit)
                })
                .ok_or_else(|| ErrMode::Backtrack(ContextError::new()))
        })
}
