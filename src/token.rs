#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) lexeme: String,
    pub(crate) line: usize,
}

#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    LeftParen, RightParen, Comma,
    Plus, Minus, Star, Slash, Concat,
    Greater, Less, EqualEqual, Equal,

    Identifier, String(String), Number,

    And, Do, Else, End, Function, If, Local,
    Not, Or, Print, Read, Return, Then, While,
    True, False,

    EndOfLine,
    EndOfFile,
}

impl Token {
    pub(crate) fn new<S: Into<String>>(kind: TokenKind, lexeme: S, line: usize) -> Self {
        Token { kind, lexeme: lexeme.into(), line }
    }

    /// How the token reads in a diagnostic.
    pub(crate) fn describe(&self) -> String {
        match self.kind {
            TokenKind::EndOfFile => "end of file".to_string(),
            TokenKind::EndOfLine => "end of line".to_string(),
            _ => format!("'{}'", self.lexeme),
        }
    }
}
