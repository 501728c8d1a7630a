use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::diagnostic::format_diagnostic;

/// Everything that can go wrong between raw text and a number.
#[derive(Diagnostic, Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{message}")]
    #[diagnostic(code(smartcalc::lex))]
    Lex {
        message: String,
        #[label("this input")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(code(smartcalc::parse))]
    Parse {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(code(smartcalc::name))]
    NameResolution {
        message: String,
        #[label("not defined")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(code(smartcalc::eval))]
    Eval {
        message: String,
        #[label("while evaluating this")]
        span: Option<SourceSpan>,
    },

    /// Reported without a position on purpose.
    #[error("division by zero")]
    #[diagnostic(code(smartcalc::division_by_zero))]
    DivisionByZero,
}

impl Error {
    pub fn lex(message: impl Into<String>, offset: usize, len: usize) -> Self {
        Self::Lex {
            message: message.into(),
            span: (offset, len).into(),
        }
    }

    pub fn parse(message: impl Into<String>, offset: usize, len: usize) -> Self {
        Self::Parse {
            message: message.into(),
            span: (offset, len).into(),
        }
    }

    pub fn name(message: impl Into<String>, offset: usize, len: usize) -> Self {
        Self::NameResolution {
            message: message.into(),
            span: (offset, len).into(),
        }
    }

    pub fn eval(message: impl Into<String>, offset: usize) -> Self {
        Self::Eval {
            message: message.into(),
            span: Some((offset, 1).into()),
        }
    }

    /// An evaluation error with no meaningful position, e.g. raised by a
    /// collaborator that holds no source text.
    pub fn eval_unplaced(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
            span: None,
        }
    }

    /// Byte offset into the source the error points at, if it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Lex { span, .. }
            | Error::Parse { span, .. }
            | Error::NameResolution { span, .. } => Some(span.offset()),
            Error::Eval { span, .. } => span.map(|s| s.offset()),
            Error::DivisionByZero => None,
        }
    }

    /// Plain-text rendering with a caret under the failing column.
    pub fn render(&self, source: &str) -> String {
        match self.offset() {
            Some(offset) => format_diagnostic(&self.to_string(), source, offset),
            None => self.to_string(),
        }
    }

    /// Graphical rendering through miette's report handler.
    pub fn into_report(self, source: &str) -> miette::Report {
        miette::Report::new(self).with_source_code(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_offset() {
        let err = Error::parse("unexpected token '@'", 4, 1);
        assert_eq!(
            err.render("2 + @ 3"),
            "unexpected token '@'\n2 + @ 3\n    ^"
        );
    }

    #[test]
    fn test_division_by_zero_has_no_position() {
        assert_eq!(Error::DivisionByZero.offset(), None);
        assert_eq!(Error::DivisionByZero.render("1/0"), "division by zero");
    }

    #[test]
    fn test_unplaced_eval_error() {
        let err = Error::eval_unplaced("bad domain");
        assert_eq!(err.offset(), None);
        assert_eq!(err.render("anything"), "bad domain");
    }

    #[test]
    fn test_report_keeps_message() {
        let report = Error::name("unknown name 'y'", 0, 1).into_report("y");
        assert_eq!(report.to_string(), "unknown name 'y'");
    }
}
