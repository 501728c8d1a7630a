use crate::{error::Error, number::Number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Op::Plus => "+",
                Op::Minus => "-",
                Op::Star => "*",
                Op::Slash => "/",
                Op::DoubleSlash => "//",
                Op::Percent => "%",
                Op::DoubleStar => "**",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    Number(Number),
    Identifier,
    Operator(Op),
    Assign,
    LeftParen,
    RightParen,
    Comma,
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub slice: &'a str,
    pub offset: usize,
    pub kind: TokenKind,
}

impl<'a> std::fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::EndOfInput => write!(f, "end of input"),
            _ => write!(f, "'{}'", self.slice),
        }
    }
}

/// Streams tokens out of a source string. The last item is always a single
/// [`TokenKind::EndOfInput`] token unless an error was produced first.
#[derive(Debug)]
pub struct Lexer<'a> {
    rest: &'a str,
    byte: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            rest: input,
            byte: 0,
            finished: false,
        }
    }

    fn advance(&mut self, len: usize) -> &'a str {
        let slice = &self.rest[..len];
        self.rest = &self.rest[len..];
        self.byte += len;
        slice
    }

    fn lex_number(&mut self) -> Result<Token<'a>, Error> {
        let offset = self.byte;
        let rest: &'a str = self.rest;
        let bytes = rest.as_bytes();
        let digits_from = |mut i: usize| {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                i += 1;
            }
            i
        };

        let mut end = digits_from(0);
        let mut is_float = false;
        if bytes.get(end) == Some(&b'.') {
            is_float = true;
            end = digits_from(end + 1);
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            is_float = true;
            end += 1;
            if matches!(bytes.get(end), Some(b'+' | b'-')) {
                end += 1;
            }
            end = digits_from(end);
        }

        let literal = self.advance(end);
        let cleaned = literal.replace('_', "");

        let value = if is_float {
            cleaned.parse::<f64>().ok().map(Number::Float)
        } else {
            cleaned
                .parse::<i64>()
                .ok()
                .map(Number::Int)
                .or_else(|| cleaned.parse::<f64>().ok().map(Number::Float))
        };

        match value {
            Some(n) => Ok(Token {
                slice: literal,
                offset,
                kind: TokenKind::Number(n),
            }),
            None => Err(Error::lex(
                format!("malformed number '{literal}' at position {offset}"),
                offset,
                literal.len(),
            )),
        }
    }

    fn lex_identifier(&mut self) -> Token<'a> {
        let offset = self.byte;
        let end = self
            .rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest.len());
        Token {
            slice: self.advance(end),
            offset,
            kind: TokenKind::Identifier,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.advance(self.rest.len() - self.rest.trim_start().len());
        let offset = self.byte;

        let mut chars = self.rest.chars();
        let Some(c) = chars.next() else {
            self.finished = true;
            return Some(Ok(Token {
                slice: "",
                offset,
                kind: TokenKind::EndOfInput,
            }));
        };
        let starts_number =
            c.is_ascii_digit() || (c == '.' && chars.next().is_some_and(|n| n.is_ascii_digit()));

        if starts_number {
            let token = self.lex_number();
            self.finished = token.is_err();
            return Some(token);
        }
        if c.is_alphabetic() || c == '_' {
            return Some(Ok(self.lex_identifier()));
        }

        let (kind, len) = match c {
            '(' => (TokenKind::LeftParen, 1),
            ')' => (TokenKind::RightParen, 1),
            ',' => (TokenKind::Comma, 1),
            '*' if self.rest.starts_with("**") => (TokenKind::Operator(Op::DoubleStar), 2),
            '/' if self.rest.starts_with("//") => (TokenKind::Operator(Op::DoubleSlash), 2),
            '+' => (TokenKind::Operator(Op::Plus), 1),
            '-' => (TokenKind::Operator(Op::Minus), 1),
            '*' => (TokenKind::Operator(Op::Star), 1),
            '/' => (TokenKind::Operator(Op::Slash), 1),
            '%' => (TokenKind::Operator(Op::Percent), 1),
            '=' if self.rest.starts_with("==") => {
                self.finished = true;
                return Some(Err(Error::lex(
                    format!("unexpected '==' at position {offset}"),
                    offset,
                    2,
                )));
            }
            '=' => (TokenKind::Assign, 1),
            _ => {
                self.finished = true;
                return Some(Err(Error::lex(
                    format!("unexpected character '{c}' at position {offset}"),
                    offset,
                    c.len_utf8(),
                )));
            }
        };

        Some(Ok(Token {
            slice: self.advance(len),
            offset,
            kind,
        }))
    }
}

/// Tokenizes the whole input, ending with exactly one end-of-input token.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, Error> {
    Lexer::new(input).collect()
}
