pub mod ast;
pub mod builtins;
pub mod diagnostic;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod number;
pub mod parser;

pub use ast::Node;
pub use diagnostic::format_diagnostic;
pub use error::Error;
pub use evaluator::{eval_expr, Evaluator};
pub use lexer::{tokenize, Token, TokenKind};
pub use number::Number;
pub use parser::{parse, Parser};
