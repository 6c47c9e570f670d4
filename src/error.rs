use std::fmt::{self, Display};
use std::result;

use crate::token::Token;

pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Name,
    Type,
    Value,
    Runtime,
    Compile,
    Io,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;
        let name = match self {
            Lexical => "Lexical",
            Syntax => "Syntax",
            Name => "Name",
            Type => "Type",
            Value => "Value",
            Runtime => "Runtime",
            Compile => "Compile",
            Io => "IO",
        };
        write!(f, "{}", name)
    }
}

/// Every failure is fatal: the first error aborts the run and is reported as is.
#[derive(Debug, thiserror::Error)]
#[error("{}{kind} error: {message}", location(.line))]
pub struct Error {
    kind: ErrorKind,
    line: Option<usize>,
    message: String,
}

fn location(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!("[line {}] ", line),
        None => String::new(),
    }
}

impl Error {
    fn new<S: Into<String>>(kind: ErrorKind, line: Option<usize>, message: S) -> Error {
        Error { kind, line, message: message.into() }
    }

    pub fn lexical<S: Into<String>>(line: usize, message: S) -> Error {
        Error::new(ErrorKind::Lexical, Some(line), message)
    }

    pub fn syntactic<S: Into<String>>(token: &Token, message: S) -> Error {
        let message = format!("{} (found {}).", message.into(), token.describe());
        Error::new(ErrorKind::Syntax, Some(token.line), message)
    }

    pub fn name<S: Into<String>>(token: &Token, message: S) -> Error {
        Error::new(ErrorKind::Name, Some(token.line), message)
    }

    pub fn type_mismatch<S: Into<String>>(token: &Token, message: S) -> Error {
        Error::new(ErrorKind::Type, Some(token.line), message)
    }

    pub fn value<S: Into<String>>(token: &Token, message: S) -> Error {
        Error::new(ErrorKind::Value, Some(token.line), message)
    }

    pub fn runtime<S: Into<String>>(token: &Token, message: S) -> Error {
        Error::new(ErrorKind::Runtime, Some(token.line), message)
    }

    pub fn compile<S: Into<String>>(line: usize, message: S) -> Error {
        Error::new(ErrorKind::Compile, Some(line), message)
    }

    /// Errors from outside any particular source line (CLI usage, files).
    pub fn usage<S: Into<String>>(message: S) -> Error {
        Error::new(ErrorKind::Io, None, message)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::new(ErrorKind::Io, None, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn display_includes_line_and_kind() {
        let e = Error::lexical(3, "Unterminated string literal.");
        assert_eq!("[line 3] Lexical error: Unterminated string literal.", e.to_string());
    }

    #[test]
    fn syntax_errors_name_the_offending_token() {
        let token = Token::new(TokenKind::Identifier, "x", 7);
        let e = Error::syntactic(&token, "Expected 'then' after condition");
        assert_eq!(
            "[line 7] Syntax error: Expected 'then' after condition (found 'x').",
            e.to_string()
        );
    }

    #[test]
    fn io_errors_have_no_line() {
        let e: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert_eq!(&ErrorKind::Io, e.kind());
        assert_eq!("missing", e.message());
        assert_eq!("IO error: missing", e.to_string());
    }
}
