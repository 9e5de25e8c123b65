//! Tokenizer for feature expressions.

use super::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Question,
    Coalesce,
    Colon,
    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{name}'"),
            Self::Str(s) => format!("string '{s}'"),
            Self::Int(i) => format!("number {i}"),
            Self::Float(x) => format!("number {x}"),
            Self::Eof => "end of expression".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Question => "?",
            Self::Coalesce => "??",
            Self::Colon => ":",
            _ => "",
        }
    }
}

/// A token and the byte offset where it starts
pub(crate) type Spanned = (Token, usize);

pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, CompileError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;

        if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            tokens.push((Token::Ident(src[start..pos].to_string()), start));
            continue;
        }

        if c.is_ascii_digit() {
            let (token, end) = lex_number(src, start)?;
            tokens.push((token, start));
            pos = end;
            continue;
        }

        if c == b'\'' || c == b'"' {
            let (text, end) = lex_string(src, start)?;
            tokens.push((Token::Str(text), start));
            pos = end;
            continue;
        }

        let next = bytes.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            (b'=', Some(b'=')) => (Token::EqEq, 2),
            (b'!', Some(b'=')) => (Token::NotEq, 2),
            (b'<', Some(b'=')) => (Token::Le, 2),
            (b'>', Some(b'=')) => (Token::Ge, 2),
            (b'&', Some(b'&')) => (Token::AndAnd, 2),
            (b'|', Some(b'|')) => (Token::OrOr, 2),
            (b'?', Some(b'?')) => (Token::Coalesce, 2),
            (b'<', _) => (Token::Lt, 1),
            (b'>', _) => (Token::Gt, 1),
            (b'!', _) => (Token::Bang, 1),
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Star, 1),
            (b'/', _) => (Token::Slash, 1),
            (b'%', _) => (Token::Percent, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b'[', _) => (Token::LBracket, 1),
            (b']', _) => (Token::RBracket, 1),
            (b',', _) => (Token::Comma, 1),
            (b'.', _) => (Token::Dot, 1),
            (b'?', _) => (Token::Question, 1),
            (b':', _) => (Token::Colon, 1),
            (b'=', _) => {
                return Err(CompileError::new(start, "unexpected '=', did you mean '=='?"));
            }
            _ => {
                let ch = src[start..].chars().next().unwrap_or('?');
                return Err(CompileError::new(
                    start,
                    format!("unexpected character '{ch}'"),
                ));
            }
        };
        tokens.push((token, start));
        pos += width;
    }

    tokens.push((Token::Eof, src.len()));
    Ok(tokens)
}

fn lex_number(src: &str, start: usize) -> Result<(Token, usize), CompileError> {
    let bytes = src.as_bytes();
    let mut pos = start;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }

    let is_float = pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit();
    if is_float {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let text = &src[start..pos];
        let value = text
            .parse::<f64>()
            .map_err(|e| CompileError::new(start, format!("invalid number '{text}': {e}")))?;
        return Ok((Token::Float(value), pos));
    }

    let text = &src[start..pos];
    let value = text
        .parse::<i64>()
        .map_err(|e| CompileError::new(start, format!("invalid number '{text}': {e}")))?;
    Ok((Token::Int(value), pos))
}

fn lex_string(src: &str, start: usize) -> Result<(String, usize), CompileError> {
    let mut chars = src[start..].char_indices();
    let quote = chars.next().map(|(_, c)| c).unwrap_or('\'');
    let mut out = String::new();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => {
                let escaped = match chars.next() {
                    Some((_, 'n')) => '\n',
                    Some((_, 't')) => '\t',
                    Some((_, 'r')) => '\r',
                    Some((_, other)) => other,
                    None => break,
                };
                out.push(escaped);
            }
            c if c == quote => return Ok((out, start + offset + c.len_utf8())),
            c => out.push(c),
        }
    }

    Err(CompileError::new(start, "unterminated string literal"))
}
