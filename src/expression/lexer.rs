//! Tokenizer for filter expressions

use std::fmt;

use super::errors::{CompileError, CompileResult};
use super::relop::RelOp;

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Op(RelOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::Int(v) => write!(f, "number {}", v),
            Token::Float(v) => write!(f, "number {}", v),
            Token::Str(s) => write!(f, "string {:?}", s),
            Token::Bool(b) => write!(f, "{}", b),
            Token::Op(op) => write!(f, "'{}'", op),
            Token::And => write!(f, "'&&'"),
            Token::Or => write!(f, "'||'"),
            Token::Not => write!(f, "'!'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
        }
    }
}

/// A token and the byte position where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

/// Splits `input` into tokens.
pub fn tokenize(input: &str) -> CompileResult<Vec<Spanned>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos];

        let token = match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b'&' if bytes.get(pos + 1) == Some(&b'&') => {
                pos += 2;
                Token::And
            }
            b'|' if bytes.get(pos + 1) == Some(&b'|') => {
                pos += 2;
                Token::Or
            }
            b'=' | b'!' | b'<' | b'>' => {
                let two = input.get(pos..pos + 2).and_then(RelOp::parse);
                match two {
                    Some(op) => {
                        pos += 2;
                        Token::Op(op)
                    }
                    None if c == b'!' => {
                        pos += 1;
                        Token::Not
                    }
                    None => {
                        pos += 1;
                        match RelOp::parse(&input[start..pos]) {
                            Some(op) => Token::Op(op),
                            None => return Err(unexpected(input, start)),
                        }
                    }
                }
            }
            b'"' | b'\'' => {
                let (text, next) = read_string(input, pos)?;
                pos = next;
                Token::Str(text)
            }
            b'0'..=b'9' | b'-' | b'.' => {
                let (token, next) = read_number(input, pos)?;
                pos = next;
                token
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                    pos += 1;
                }
                keyword_or_ident(&input[start..pos])
            }
            _ => return Err(unexpected(input, start)),
        };

        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

fn keyword_or_ident(word: &str) -> Token {
    match word.to_ascii_uppercase().as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "TRUE" => Token::Bool(true),
        "FALSE" => Token::Bool(false),
        _ => Token::Ident(word.to_string()),
    }
}

fn read_string(input: &str, start: usize) -> CompileResult<(String, usize)> {
    let quote = input.as_bytes()[start] as char;
    let mut text = String::new();
    let mut chars = input[start + 1..].char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            c if c == quote => return Ok((text, start + 1 + i + 1)),
            c => text.push(c),
        }
    }

    Err(CompileError::UnterminatedString { position: start })
}

fn read_number(input: &str, start: usize) -> CompileResult<(Token, usize)> {
    let bytes = input.as_bytes();
    let mut pos = start;
    if bytes[pos] == b'-' {
        pos += 1;
    }
    let mut is_float = false;
    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' => pos += 1,
            b'.' | b'e' | b'E' => {
                is_float = true;
                pos += 1;
            }
            b'+' | b'-' if matches!(bytes[pos - 1], b'e' | b'E') => pos += 1,
            _ => break,
        }
    }

    let text = &input[start..pos];
    let invalid = || CompileError::InvalidNumber {
        text: text.to_string(),
        position: start,
    };

    let token = if is_float {
        Token::Float(text.parse().map_err(|_| invalid())?)
    } else {
        Token::Int(text.parse().map_err(|_| invalid())?)
    };
    Ok((token, pos))
}

fn unexpected(input: &str, position: usize) -> CompileError {
    CompileError::UnexpectedChar {
        ch: input[position..].chars().next().unwrap_or('?'),
        position,
    }
}
