use crate::{
    error::{Error, Result},
    token::{Token, TokenKind},
};
use log::trace;
use peekmore::{PeekMore, PeekMoreIterator};
use phf::phf_map;
use std::str::Chars;

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "and" => TokenKind::And,
    "false" => TokenKind::False,
    "do" => TokenKind::Do,
    "else" => TokenKind::Else,
    "end" => TokenKind::End,
    "function" => TokenKind::Function,
    "if" => TokenKind::If,
    "local" => TokenKind::Local,
    "not" => TokenKind::Not,
    "or" => TokenKind::Or,
    "print" => TokenKind::Print,
    "read" => TokenKind::Read,
    "return" => TokenKind::Return,
    "then" => TokenKind::Then,
    "true" => TokenKind::True,
    "while" => TokenKind::While,
};

/// Hands out one token at a time. `next` always holds the current lookahead;
/// `select_next` replaces it with the following token in the source.
pub struct Scanner<'a> {
    src: PeekMoreIterator<Chars<'a>>,
    lexeme_buffer: String,
    line: usize,
    pub(crate) next: Token,
}

impl <'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.chars().peekmore(),
            lexeme_buffer: String::new(),
            line: 1,
            next: Token::new(TokenKind::EndOfFile, "", 1),
        }
    }

    pub fn select_next(&mut self) -> Result<()> {
        self.next = self.scan_token()?;
        trace!("token {:?} on line {}", self.next.kind, self.next.line);
        Ok(())
    }

    /// Scans the whole source, including the trailing `EndOfFile`.
    #[cfg(test)]
    fn scan_tokens(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.select_next()?;
            let at_end = self.next.kind == TokenKind::EndOfFile;
            tokens.push(self.next.clone());
            if at_end { break }
        }
        Ok(tokens)
    }

    fn scan_token(&mut self) -> Result<Token> {
        loop {
            self.lexeme_buffer.clear();
            let line = self.line;

            let next_char = match self.src.next() {
                Some(c) => c,
                None => return Ok(Token::new(TokenKind::EndOfFile, "", line)),
            };
            self.lexeme_buffer.push(next_char);

            if let Some(kind) = self.token_kind_from_char(next_char)? {
                return Ok(Token::new(kind, self.lexeme_buffer.clone(), line))
            }
        }
    }

    fn token_kind_from_char(&mut self, c: char) -> Result<Option<TokenKind>> {
        use TokenKind::*;
        let kind = match c {
            '(' => LeftParen,
            ')' => RightParen,
            ',' => Comma,
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => Slash,
            '>' => Greater,
            '<' => Less,
            '=' => if self.does_next_match('=') { EqualEqual } else { Equal },
            '.' => {
                if self.does_next_match('.') {
                    Concat
                } else {
                    return Err(Error::lexical(self.line, "Unexpected character '.', expected '..'."))
                }
            },
            ' ' | '\r' | '\t' => return Ok(None),
            '\n' => {
                self.line += 1;
                EndOfLine
            },
            '"' => self.extract_string()?,
            c if c.is_ascii_digit() => self.extract_number()?,
            c if can_start_identifier(&c) => self.extract_identifier(),
            c => return Err(Error::lexical(self.line, format!("Unexpected character '{}'.", c))),
        };
        Ok(Some(kind))
    }

    fn does_next_match(&mut self, c: char) -> bool {
        match self.src.peek() {
            Some(next) if c == *next => {
                self.lexeme_buffer.push(c);
                self.src.next();
                true
            }
            _ => false,
        }
    }

    fn extract_string(&mut self) -> Result<TokenKind> {
        self.advance_until(|n| *n == '"' || *n == '\n');
        match self.src.peek() {
            Some('"') => {
                self.lexeme_buffer.push('"');
                self.src.next();
                Ok(TokenKind::String(self.lexeme_buffer.trim_matches('"').to_string()))
            },
            _ => Err(Error::lexical(self.line, "Unterminated string literal.")),
        }
    }

    fn extract_number(&mut self) -> Result<TokenKind> {
        self.advance_until(|n| !n.is_ascii_digit());

        match self.src.peek() {
            Some(c) if is_part_of_valid_identifier(c) => Err(Error::lexical(
                self.line,
                format!("Malformed number '{}{}'.", self.lexeme_buffer, c)
            )),
            _ => Ok(TokenKind::Number),
        }
    }

    fn extract_identifier(&mut self) -> TokenKind {
        self.advance_until(|n| !is_part_of_valid_identifier(n));

        match KEYWORDS.get(self.lexeme_buffer.as_str()) {
            Some(kind) => kind.clone(),
            None => TokenKind::Identifier,
        }
    }

    fn advance_until(&mut self, should_stop: impl Fn(&char) -> bool) {
        while let Some(next) = self.src.peek() {
            if should_stop(next) { break }
            let next = *next;
            self.lexeme_buffer.push(next);
            self.src.next();
        }
    }
}

fn can_start_identifier(c: &char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_part_of_valid_identifier(c: &char) -> bool {
    c.is_ascii_alphanumeric() || c == &'_'
}
