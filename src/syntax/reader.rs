//! Expression reader
//!
//! Reads exactly one expression from a [`CharStream`], leaving the stream positioned
//! immediately after it. Reading happens in two steps: the datum's text is cut out of the
//! stream character by character (this is where EOF and balance are decided), then the
//! text is handed to the pest grammar in [`crate::syntax::parser`].
//!
//! Input that ends before a datum begins is [`UnexpectedEof`](crate::PreprocessError::UnexpectedEof).
//! Input that ends inside a started datum (open list, open string, dangling quote) is
//! [`MalformedExpression`](crate::PreprocessError::MalformedExpression), as is a stray `)`.

use crate::ast::Expr;
use crate::syntax::parser::parse_datum;
use crate::syntax::stream::CharStream;
use crate::syntax::ReadCase;
use crate::{err_ctx, PreprocessError};

/// Reads one expression.
#[tracing::instrument(level = "trace", skip(stream), fields(offset = stream.offset()))]
pub fn read_expression(stream: &mut CharStream<'_>, case: ReadCase) -> Result<Expr, PreprocessError> {
    skip_atmosphere(stream)?;
    let start = stream.offset();
    if stream.peek_char()?.is_none() {
        return Err(err_ctx!(
            UnexpectedEof,
            "input ended where an expression was expected",
            &stream.named_source(),
            stream.span_from(start)
        ));
    }

    let mut text = String::new();
    delimit_datum(stream, &mut text, start)?;
    parse_datum(&text, case).map_err(|e| {
        err_ctx!(
            MalformedExpression,
            "could not parse expression",
            &stream.named_source(),
            stream.span_from(start)
        )
        .with_cause(e)
    })
}

/// Reads expressions until the input is exhausted.
pub fn read_all(stream: &mut CharStream<'_>, case: ReadCase) -> Result<Vec<Expr>, PreprocessError> {
    let mut exprs = Vec::new();
    loop {
        skip_atmosphere(stream)?;
        stream.mark();
        if stream.peek_char()?.is_none() {
            return Ok(exprs);
        }
        exprs.push(read_expression(stream, case)?);
    }
}

/// Skips whitespace and `;` line comments.
pub fn skip_atmosphere(stream: &mut CharStream<'_>) -> Result<(), PreprocessError> {
    while let Some(c) = stream.next_char()? {
        if c == ';' {
            while let Some(c) = stream.next_char()? {
                if c == '\n' {
                    break;
                }
            }
        } else if !c.is_whitespace() {
            stream.unread(c);
            break;
        }
    }
    Ok(())
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';' | '\'')
}

// Appends the text of one datum to `text`. `start` is where the whole expression began.
fn delimit_datum(
    stream: &mut CharStream<'_>,
    text: &mut String,
    start: usize,
) -> Result<(), PreprocessError> {
    let datum_start = stream.offset();
    let Some(c) = stream.next_char()? else {
        return Err(malformed(stream, start, "quote is not followed by an expression"));
    };
    match c {
        '(' => {
            text.push('(');
            loop {
                skip_atmosphere(stream)?;
                match stream.next_char()? {
                    None => {
                        return Err(malformed_with_help(
                            stream,
                            datum_start,
                            "unbalanced list",
                            "add the missing ')'",
                        ))
                    }
                    Some(')') => {
                        text.push(')');
                        return Ok(());
                    }
                    Some(c) => {
                        stream.unread(c);
                        text.push(' ');
                        delimit_datum(stream, text, start)?;
                    }
                }
            }
        }
        ')' => Err(malformed(stream, datum_start, "unexpected ')'")),
        '"' => {
            text.push('"');
            loop {
                match stream.next_char()? {
                    None => {
                        return Err(malformed_with_help(
                            stream,
                            datum_start,
                            "unterminated string",
                            "add the missing '\"'",
                        ))
                    }
                    Some('\\') => {
                        text.push('\\');
                        match stream.next_char()? {
                            Some(escaped) => text.push(escaped),
                            None => {
                                return Err(malformed(
                                    stream,
                                    datum_start,
                                    "unterminated string",
                                ))
                            }
                        }
                    }
                    Some('"') => {
                        text.push('"');
                        return Ok(());
                    }
                    Some(c) => text.push(c),
                }
            }
        }
        '\'' => {
            text.push('\'');
            skip_atmosphere(stream)?;
            delimit_datum(stream, text, start)
        }
        c => {
            text.push(c);
            while let Some(c) = stream.next_char()? {
                if is_delimiter(c) {
                    stream.unread(c);
                    break;
                }
                text.push(c);
            }
            Ok(())
        }
    }
}

fn malformed(stream: &CharStream<'_>, from: usize, message: &str) -> PreprocessError {
    err_ctx!(
        MalformedExpression,
        message,
        &stream.named_source(),
        stream.span_from(from)
    )
}

fn malformed_with_help(
    stream: &CharStream<'_>,
    from: usize,
    message: &str,
    help: &str,
) -> PreprocessError {
    err_ctx!(
        MalformedExpression,
        message,
        &stream.named_source(),
        stream.span_from(from),
        help
    )
}
