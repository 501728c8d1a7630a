use log::trace;

use crate::{
    ast::{Node, PlotCommand, PlotTarget},
    error::Error,
    lexer::{tokenize, Op, Token, TokenKind},
};

/// Binding power of prefix `+`/`-`: tighter than every infix operator except
/// `**`, so `-3**2` is `-(3**2)`.
const PREFIX_BP: u8 = 30;

/// Deepest nesting accepted, both for parser recursion and for the height of
/// the resulting tree, which the evaluator walks recursively.
pub const MAX_DEPTH: usize = 256;

/// Left and right binding powers. A right power below the left one makes the
/// operator right-associative.
fn infix_binding_power(op: Op) -> (u8, u8) {
    match op {
        Op::Plus | Op::Minus => (10, 11),
        Op::Star | Op::Slash | Op::DoubleSlash | Op::Percent => (20, 21),
        Op::DoubleStar => (40, 39),
    }
}

/// Tokenizes and parses one statement.
pub fn parse(source: &str) -> Result<Node, Error> {
    let tokens = tokenize(source)?;
    Parser::new(source, tokens).parse()
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token<'a>>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parses exactly one statement and requires the input to end there.
    pub fn parse(&mut self) -> Result<Node, Error> {
        let node = self.parse_statement()?;

        let token = self.peek();
        if token.kind != TokenKind::EndOfInput {
            return Err(self.error(
                format!("extra input starting at position {}: {token}", token.offset),
                token,
            ));
        }

        trace!("parsed {node}");
        Ok(node)
    }

    fn peek_at(&self, ahead: usize) -> Token<'a> {
        self.tokens
            .get(self.pos + ahead)
            .copied()
            .filter(|token| token.kind != TokenKind::EndOfInput)
            .unwrap_or(Token {
                slice: "",
                offset: self.source.len(),
                kind: TokenKind::EndOfInput,
            })
    }

    fn peek(&self) -> Token<'a> {
        self.peek_at(0)
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek();
        if token.kind != TokenKind::EndOfInput {
            self.pos += 1;
        }
        token
    }

    // End of input gets an empty span right after the last character.
    fn error(&self, message: String, token: Token<'a>) -> Error {
        Error::parse(message, token.offset, token.slice.len())
    }

    fn too_deep(&self, token: Token<'a>) -> Error {
        self.error("expression nested too deeply".to_string(), token)
    }

    fn descend(&mut self, token: Token<'a>) -> Result<(), Error> {
        if self.depth >= MAX_DEPTH {
            return Err(self.too_deep(token));
        }
        self.depth += 1;
        Ok(())
    }

    fn grow(&self, height: usize, token: Token<'a>) -> Result<usize, Error> {
        if height > MAX_DEPTH {
            return Err(self.too_deep(token));
        }
        Ok(height)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>, Error> {
        let token = self.peek();
        if token.kind != kind {
            return Err(self.error(format!("expected {what}, found {token}"), token));
        }
        Ok(self.advance())
    }

    fn is_keyword(token: Token<'_>, word: &str) -> bool {
        token.kind == TokenKind::Identifier && token.slice.eq_ignore_ascii_case(word)
    }

    fn expect_keyword(&mut self, word: &str) -> Result<Token<'a>, Error> {
        let token = self.peek();
        if !Self::is_keyword(token, word) {
            return Err(self.error(format!("expected '{word}', found {token}"), token));
        }
        Ok(self.advance())
    }

    // A command word only acts as one when something other than `=` follows,
    // so `plot = 2` and a bare `plot` stay ordinary names.
    fn at_command(&self, word: &str) -> bool {
        Self::is_keyword(self.peek(), word)
            && !matches!(
                self.peek_at(1).kind,
                TokenKind::Assign | TokenKind::EndOfInput
            )
    }

    fn parse_statement(&mut self) -> Result<Node, Error> {
        if self.at_command("simplify") {
            let keyword = self.advance();
            let expr = self.parse_expr(0)?;
            return Ok(Node::Simplify {
                expr: Box::new(expr),
                offset: keyword.offset,
            });
        }
        if self.at_command("plot") {
            return self.parse_plot();
        }

        let (first, second) = (self.peek(), self.peek_at(1));
        if first.kind == TokenKind::Identifier && second.kind == TokenKind::Assign {
            self.descend(first)?;
            self.advance();
            self.advance();
            let value = self.parse_statement()?;
            self.depth -= 1;
            return Ok(Node::Assign {
                name: first.slice.to_string(),
                value: Box::new(value),
                offset: first.offset,
            });
        }

        self.parse_expr(0)
    }

    fn parse_plot(&mut self) -> Result<Node, Error> {
        let keyword = self.advance();

        let labelled = [
            TokenKind::Identifier,
            TokenKind::LeftParen,
            TokenKind::Identifier,
            TokenKind::RightParen,
            TokenKind::Assign,
        ]
        .iter()
        .enumerate()
        .all(|(i, kind)| self.peek_at(i).kind == *kind);

        let (variable, label) = if labelled {
            let function = self.advance();
            self.advance();
            let variable = self.advance();
            self.advance();
            self.advance();
            (
                Some(variable.slice.to_string()),
                Some(format!("{}({})", function.slice, variable.slice)),
            )
        } else {
            (None, None)
        };

        let expr = self.parse_expr(0)?;

        let domain = if Self::is_keyword(self.peek(), "from") {
            self.advance();
            let start = self.parse_expr(0)?;
            self.expect_keyword("to")?;
            let end = self.parse_expr(0)?;
            Some((Box::new(start), Box::new(end)))
        } else {
            None
        };

        let target = if Self::is_keyword(self.peek(), "target") {
            self.advance();
            let format = self.expect(TokenKind::Identifier, "an output format")?;
            Some(PlotTarget {
                format: format.slice.to_string(),
                offset: format.offset,
            })
        } else {
            None
        };

        Ok(Node::Plot(PlotCommand {
            expr: Box::new(expr),
            variable,
            label,
            domain,
            target,
            offset: keyword.offset,
        }))
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Node, Error> {
        self.parse_bp(min_bp).map(|(node, _)| node)
    }

    // Returns the node together with its height.
    fn parse_bp(&mut self, min_bp: u8) -> Result<(Node, usize), Error> {
        let token = self.advance();
        self.descend(token)?;

        let (mut left, mut height) = match token.kind {
            TokenKind::Number(value) => (
                Node::Number {
                    value,
                    offset: token.offset,
                },
                1,
            ),
            TokenKind::Identifier if self.peek().kind == TokenKind::LeftParen => {
                self.advance();
                let (args, tallest) = self.parse_args()?;
                let node = Node::Call {
                    name: token.slice.to_string(),
                    args,
                    offset: token.offset,
                };
                (node, self.grow(tallest + 1, token)?)
            }
            TokenKind::Identifier => (
                Node::Name {
                    name: token.slice.to_string(),
                    offset: token.offset,
                },
                1,
            ),
            TokenKind::Operator(op @ (Op::Plus | Op::Minus)) => {
                let (operand, operand_height) = self.parse_bp(PREFIX_BP)?;
                let node = Node::Unary {
                    op,
                    operand: Box::new(operand),
                    offset: token.offset,
                };
                (node, self.grow(operand_height + 1, token)?)
            }
            TokenKind::LeftParen => {
                let inner = self.parse_bp(0)?;
                self.expect(TokenKind::RightParen, "')'")?;
                inner
            }
            TokenKind::EndOfInput => {
                return Err(self.error("unexpected end of input".to_string(), token))
            }
            _ => return Err(self.error(format!("unexpected token {token}"), token)),
        };

        loop {
            let TokenKind::Operator(op) = self.peek().kind else {
                break;
            };
            let (left_bp, right_bp) = infix_binding_power(op);
            if left_bp < min_bp {
                break;
            }
            let op_token = self.advance();
            let (right, right_height) = self.parse_bp(right_bp)?;
            height = self.grow(height.max(right_height) + 1, op_token)?;
            left = Node::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                offset: op_token.offset,
            };
        }

        self.depth -= 1;
        Ok((left, height))
    }

    // Called after the opening parenthesis.
    fn parse_args(&mut self) -> Result<(Vec<Node>, usize), Error> {
        let mut args = Vec::new();
        let mut tallest = 0;
        if self.peek().kind != TokenKind::RightParen {
            loop {
                let (arg, height) = self.parse_bp(0)?;
                tallest = tallest.max(height);
                args.push(arg);
                if self.peek().kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "',' or ')'")?;
        Ok((args, tallest))
    }
}
