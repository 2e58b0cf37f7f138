use crate::error::{DumpError, Result};

/// Lexical token of the predicate language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Match,
    NotMatch,
}

/// Token with the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

fn syntax_error(msg: impl Into<String>, offset: usize) -> DumpError {
    DumpError::ExpressionSyntax(format!("{} at offset {}", msg.into(), offset))
}

/// Split an expression into tokens
///
/// Also used by the session to split statement arguments, which share the
/// literal syntax of predicates.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let token = match c {
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b',' => {
                pos += 1;
                Token::Comma
            }
            b'+' => {
                pos += 1;
                Token::Plus
            }
            b'-' => {
                pos += 1;
                Token::Minus
            }
            b'*' => {
                pos += 1;
                Token::Star
            }
            b'/' => {
                pos += 1;
                Token::Slash
            }
            b'%' => {
                pos += 1;
                Token::Percent
            }
            b'&' | b'|' => {
                if bytes.get(pos + 1) != Some(&c) {
                    return Err(syntax_error(
                        format!("expected '{0}{0}'", c as char),
                        start,
                    ));
                }
                pos += 2;
                if c == b'&' {
                    Token::And
                } else {
                    Token::Or
                }
            }
            b'=' => match bytes.get(pos + 1) {
                Some(b'=') => {
                    pos += 2;
                    Token::Eq
                }
                Some(b'~') => {
                    pos += 2;
                    Token::Match
                }
                _ => return Err(syntax_error("expected '==' or '=~'", start)),
            },
            b'!' => match bytes.get(pos + 1) {
                Some(b'=') => {
                    pos += 2;
                    Token::Ne
                }
                Some(b'~') => {
                    pos += 2;
                    Token::NotMatch
                }
                _ => {
                    pos += 1;
                    Token::Not
                }
            },
            b'<' | b'>' => {
                let with_eq = bytes.get(pos + 1) == Some(&b'=');
                pos += if with_eq { 2 } else { 1 };
                match (c, with_eq) {
                    (b'<', false) => Token::Lt,
                    (b'<', true) => Token::Le,
                    (_, false) => Token::Gt,
                    (_, true) => Token::Ge,
                }
            }
            b'"' | b'\'' => {
                let (value, end) = lex_string(input, pos)?;
                pos = end;
                Token::Str(value)
            }
            b'0'..=b'9' => {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                let is_float = bytes.get(pos) == Some(&b'.')
                    && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit);
                if is_float {
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                    let text = &input[start..pos];
                    Token::Float(
                        text.parse()
                            .map_err(|_| syntax_error(format!("invalid number '{}'", text), start))?,
                    )
                } else {
                    let text = &input[start..pos];
                    Token::Int(
                        text.parse()
                            .map_err(|_| syntax_error(format!("invalid number '{}'", text), start))?,
                    )
                }
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                match &input[start..pos] {
                    "true" => Token::True,
                    "false" => Token::False,
                    ident => Token::Ident(ident.to_string()),
                }
            }
            _ => {
                let ch = input[start..].chars().next().unwrap_or('?');
                return Err(syntax_error(format!("unexpected character '{}'", ch), start));
            }
        };

        tokens.push(Spanned {
            token,
            offset: start,
        });
    }

    Ok(tokens)
}

/// Lex a quoted string starting at `start`; returns the value and the end offset
fn lex_string(input: &str, start: usize) -> Result<(String, usize)> {
    let mut chars = input[start..].char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err(syntax_error("expected string", start)),
    };

    let mut value = String::new();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, c @ ('\\' | '"' | '\''))) => value.push(c),
                // unknown escapes are kept verbatim so regex patterns survive
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            c if c == quote => return Ok((value, start + i + c.len_utf8())),
            c => value.push(c),
        }
    }

    Err(syntax_error("unterminated string", start))
}
