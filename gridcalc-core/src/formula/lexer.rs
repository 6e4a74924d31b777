//! Formula Lexer
//!
//! Splits formula text into tokens carrying their byte offsets. Handles
//! numbers, `"text"` literals, identifiers (cell references, names and
//! functions), sheet prefixes such as `Sheet1!` and `'My Sheet'!`, and the
//! operator set of the language.

use crate::error::ExtractError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Text(String),
    /// Letters, digits, `_`, `.` and `$`. The parser decides whether this is a
    /// cell reference, a function name, a boolean or a variable.
    Ident(String),
    /// Sheet name prefix (e.g., "Data" from "Data!A1" or "'Data'!A1")
    SheetPrefix(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    LParen,
    RParen,
    Colon,
    Comma,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub offset: usize,
}

fn error(offset: usize, message: impl Into<String>) -> ExtractError {
    ExtractError::Parse {
        offset,
        message: message.into(),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ExtractError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '^' => Some(TokenKind::Caret),
            '%' => Some(TokenKind::Percent),
            '&' => Some(TokenKind::Ampersand),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ':' => Some(TokenKind::Colon),
            ',' => Some(TokenKind::Comma),
            '=' => Some(TokenKind::Eq),
            _ => None,
        };
        if let Some(kind) = single {
            chars.next();
            tokens.push(Token { kind, offset });
            continue;
        }

        let kind = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        TokenKind::LtEq
                    }
                    Some(&(_, '>')) => {
                        chars.next();
                        TokenKind::NotEq
                    }
                    _ => TokenKind::Lt,
                }
            }
            '>' => {
                chars.next();
                if let Some(&(_, '=')) = chars.peek() {
                    chars.next();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '"' => {
                // "" inside a literal is an escaped quote
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => {
                            if let Some(&(_, '"')) = chars.peek() {
                                chars.next();
                                text.push('"');
                            } else {
                                break;
                            }
                        }
                        Some((_, ch)) => text.push(ch),
                        None => return Err(error(offset, "unterminated text literal")),
                    }
                }
                TokenKind::Text(text)
            }
            '\'' => {
                // Quoted sheet name, '' is an escaped quote
                chars.next();
                let mut sheet = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\'')) => {
                            if let Some(&(_, '\'')) = chars.peek() {
                                chars.next();
                                sheet.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some((_, ch)) => sheet.push(ch),
                        None => return Err(error(offset, "unterminated sheet name")),
                    }
                }
                match chars.next() {
                    Some((_, '!')) => TokenKind::SheetPrefix(sheet),
                    _ => return Err(error(offset, "quoted sheet name must be followed by `!`")),
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = offset;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Exponent: 1e3, 2.5E-2
                if let Some(&(i, e)) = chars.peek() {
                    if e == 'e' || e == 'E' {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        if let Some(&(_, sign)) = lookahead.peek() {
                            if sign == '+' || sign == '-' {
                                lookahead.next();
                            }
                        }
                        if lookahead.peek().is_some_and(|&(_, d)| d.is_ascii_digit()) {
                            end = i + 1;
                            chars.next();
                            if let Some(&(j, '+' | '-')) = chars.peek() {
                                end = j + 1;
                                chars.next();
                            }
                            while let Some(&(j, d)) = chars.peek() {
                                if d.is_ascii_digit() {
                                    end = j + 1;
                                    chars.next();
                                } else {
                                    break;
                                }
                            }
                        }
                    }
                }
                let literal = &input[offset..end];
                let number = literal
                    .parse()
                    .map_err(|_| error(offset, format!("invalid number `{literal}`")))?;
                TokenKind::Number(number)
            }
            c if is_ident_start(c) => {
                let mut end = offset;
                while let Some(&(i, ch)) = chars.peek() {
                    if is_ident_char(ch) {
                        end = i + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let ident = input[offset..end].to_string();
                if let Some(&(_, '!')) = chars.peek() {
                    chars.next();
                    TokenKind::SheetPrefix(ident)
                } else {
                    TokenKind::Ident(ident)
                }
            }
            other => return Err(error(offset, format!("unexpected character `{other}`"))),
        };
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}
