use std::rc::Rc;

use log::debug;

use crate::{
    error::{Error, Result},
    expr::Expr,
    preprocessor,
    scanner::Scanner,
    stmt::Stmt,
    token::*,
};

const OR_TOKENS: &[&TokenKind] = &[
    &TokenKind::Or,
];

const AND_TOKENS: &[&TokenKind] = &[
    &TokenKind::And,
];

const RELATIONAL_TOKENS: &[&TokenKind] = &[
    &TokenKind::Greater,
    &TokenKind::Less,
    &TokenKind::EqualEqual,
];

const TERM_TOKENS: &[&TokenKind] = &[
    &TokenKind::Minus,
    &TokenKind::Plus,
    &TokenKind::Concat,
];

const FACTOR_TOKENS: &[&TokenKind] = &[
    &TokenKind::Star,
    &TokenKind::Slash,
];

const UNARY_TOKENS: &[&TokenKind] = &[
    &TokenKind::Not,
    &TokenKind::Minus,
    &TokenKind::Plus,
];

/// Preprocesses `source` and parses it into the program's root `Block`.
/// Nothing is evaluated here.
pub fn parse(source: &str) -> Result<Stmt> {
    let filtered = preprocessor::filter(source);
    debug!("preprocessed {} line(s)", filtered.lines().count());
    let mut parser = Parser::new(&filtered)?;
    let program = parser.program()?;
    debug!("parsed program up to line {}", parser.scanner.next.line);
    Ok(program)
}

pub struct Parser<'a> {
    scanner: Scanner<'a>,
    in_function: bool,
}

impl <'a> Parser<'a> {
    pub fn new(src: &'a str) -> Result<Self> {
        let mut scanner = Scanner::new(src);
        scanner.select_next()?;
        Ok(Parser { scanner, in_function: false })
    }

    pub fn program(&mut self) -> Result<Stmt> {
        let statements = self.statement_list(&[&TokenKind::EndOfFile], "end of file")?;
        Ok(Stmt::new_block(statements))
    }

    fn statement_list(&mut self, terminators: &[&TokenKind], expected: &str) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check_any(terminators) {
            if self.check_next(&TokenKind::EndOfFile) {
                return Err(Error::syntactic(&self.scanner.next, format!("Expected {}", expected)))
            }
            statements.push(self.statement(terminators)?);
        }
        Ok(statements)
    }

    fn statement(&mut self, terminators: &[&TokenKind]) -> Result<Stmt> {
        if self.match_single(&TokenKind::EndOfLine)?.is_some() {
            return Ok(Stmt::new_no_op())
        }

        let statement = if self.match_single(&TokenKind::Local)?.is_some() {
            self.var_declaration()?
        } else if let Some(keyword) = self.match_single(&TokenKind::Print)? {
            self.print_statement(keyword)?
        } else if let Some(keyword) = self.match_single(&TokenKind::If)? {
            self.if_statement(keyword)?
        } else if let Some(keyword) = self.match_single(&TokenKind::While)? {
            self.while_statement(keyword)?
        } else if let Some(keyword) = self.match_single(&TokenKind::Function)? {
            self.function_declaration(keyword)?
        } else if let Some(keyword) = self.match_single(&TokenKind::Return)? {
            Stmt::new_return(keyword, self.expression()?)
        } else if self.check_next(&TokenKind::Identifier) {
            self.assignment_or_call()?
        } else {
            return Err(Error::syntactic(&self.scanner.next, "Expected a statement"))
        };

        self.end_of_statement(terminators)?;
        Ok(statement)
    }

    fn end_of_statement(&mut self, terminators: &[&TokenKind]) -> Result<()> {
        if self.match_single(&TokenKind::EndOfLine)?.is_some()
            || self.check_next(&TokenKind::EndOfFile)
            || self.check_any(terminators)
        {
            Ok(())
        } else {
            Err(Error::syntactic(&self.scanner.next, "Expected end of line after statement"))
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenKind::Identifier, "Expected variable name after 'local'")?;

        let initializer = if self.match_single(&TokenKind::Equal)?.is_some() {
            Some(self.expression()?)
        } else {
            None
        };

        Ok(Stmt::new_var_declare(name, initializer))
    }

    fn print_statement(&mut self, keyword: Token) -> Result<Stmt> {
        self.consume(&TokenKind::LeftParen, "Expected '(' after 'print'")?;
        let expression = self.expression()?;
        self.consume(&TokenKind::RightParen, "Expected ')' after print argument")?;
        Ok(Stmt::new_print(keyword, expression))
    }

    fn if_statement(&mut self, keyword: Token) -> Result<Stmt> {
        let condition = self.expression()?;
        self.consume(&TokenKind::Then, "Expected 'then' after if condition")?;
        self.match_single(&TokenKind::EndOfLine)?;

        let then_branch = self.statement_list(&[&TokenKind::Else, &TokenKind::End], "'else' or 'end'")?;
        let else_branch = if self.match_single(&TokenKind::Else)?.is_some() {
            self.match_single(&TokenKind::EndOfLine)?;
            self.statement_list(&[&TokenKind::End], "'end'")?
        } else {
            Vec::new()
        };
        self.consume(&TokenKind::End, "Expected 'end' to close 'if'")?;

        Ok(Stmt::new_if_else(
            keyword,
            condition,
            Box::new(Stmt::new_statement_list(then_branch)),
            Box::new(Stmt::new_statement_list(else_branch)),
        ))
    }

    fn while_statement(&mut self, keyword: Token) -> Result<Stmt> {
        let condition = self.expression()?;
        self.consume(&TokenKind::Do, "Expected 'do' after while condition")?;
        self.match_single(&TokenKind::EndOfLine)?;

        let body = self.statement_list(&[&TokenKind::End], "'end'")?;
        self.consume(&TokenKind::End, "Expected 'end' to close 'while'")?;

        Ok(Stmt::new_while_loop(keyword, condition, Box::new(Stmt::new_statement_list(body))))
    }

    fn function_declaration(&mut self, keyword: Token) -> Result<Stmt> {
        if self.in_function {
            return Err(Error::syntactic(&keyword, "Functions cannot be declared inside other functions"))
        }

        let name = self.consume(&TokenKind::Identifier, "Expected function name")?;
        self.consume(&TokenKind::LeftParen, "Expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check_next(&TokenKind::RightParen) {
            loop {
                params.push(self.consume(&TokenKind::Identifier, "Expected a parameter name")?);
                if self.match_single(&TokenKind::Comma)?.is_none() { break }
            }
        }
        self.consume(&TokenKind::RightParen, "Expected ')' after parameters")?;
        self.match_single(&TokenKind::EndOfLine)?;

        self.in_function = true;
        let body = self.statement_list(&[&TokenKind::End], "'end'");
        self.in_function = false;
        let body = body?;
        self.consume(&TokenKind::End, "Expected 'end' to close function body")?;

        Ok(Stmt::new_function_declare(name, params, Rc::new(Stmt::new_block(body))))
    }

    fn assignment_or_call(&mut self) -> Result<Stmt> {
        let name = self.advance()?;

        if self.match_single(&TokenKind::Equal)?.is_some() {
            Ok(Stmt::new_var_assign(name, self.expression()?))
        } else if self.match_single(&TokenKind::LeftParen)?.is_some() {
            Ok(Stmt::new_expression(self.finish_call(name)?))
        } else {
            Err(Error::syntactic(&self.scanner.next, "Expected '=' or '(' after identifier"))
        }
    }

    pub fn expression(&mut self) -> Result<Expr> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(Self::and, OR_TOKENS)
    }

    fn and(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(Self::relational, AND_TOKENS)
    }

    fn relational(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(Self::term, RELATIONAL_TOKENS)
    }

    fn term(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(Self::factor, TERM_TOKENS)
    }

    fn factor(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(Self::unary, FACTOR_TOKENS)
    }

    fn unary(&mut self) -> Result<Expr> {
        if let Some(op) = self.match_any(UNARY_TOKENS)? {
            let operand = Box::new(self.unary()?);
            Ok(Expr::new_unary_op(op, operand))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let next = self.advance()?;

        match next.kind.clone() {
            TokenKind::Number => Ok(Expr::new_int_literal(next)),
            TokenKind::True => Ok(Expr::new_int_literal(Token::new(TokenKind::Number, "1", next.line))),
            TokenKind::False => Ok(Expr::new_int_literal(Token::new(TokenKind::Number, "0", next.line))),
            TokenKind::String(value) => Ok(Expr::new_string_literal(next, value)),
            TokenKind::Identifier => {
                if self.match_single(&TokenKind::LeftParen)?.is_some() {
                    self.finish_call(next)
                } else {
                    Ok(Expr::new_var_access(next))
                }
            },
            TokenKind::LeftParen => {
                let expression = self.expression()?;
                self.consume(&TokenKind::RightParen, "Expected ')' after expression")?;
                Ok(expression)
            },
            TokenKind::Read => {
                self.consume(&TokenKind::LeftParen, "Expected '(' after 'read'")?;
                self.consume(&TokenKind::RightParen, "Expected ')' after 'read('")?;
                Ok(Expr::new_read(next))
            },
            _ => Err(Error::syntactic(&next, "Expected an expression")),
        }
    }

    fn finish_call(&mut self, name: Token) -> Result<Expr> {
        let mut arguments = Vec::new();

        if !self.check_next(&TokenKind::RightParen) {
            arguments.push(self.expression()?);
            while self.match_single(&TokenKind::Comma)?.is_some() {
                arguments.push(self.expression()?);
            }
        }
        self.consume(&TokenKind::RightParen, "Expected ')' after arguments")?;

        Ok(Expr::new_function_call(name, arguments))
    }

    fn check_next(&self, kind: &TokenKind) -> bool {
        &self.scanner.next.kind == kind
    }

    fn check_any(&self, kinds: &[&TokenKind]) -> bool {
        kinds.iter().any(|k| self.check_next(k))
    }

    /// Hands back the lookahead token and moves the scanner past it.
    fn advance(&mut self) -> Result<Token> {
        let current = self.scanner.next.clone();
        self.scanner.select_next()?;
        Ok(current)
    }

    fn consume(&mut self, kind: &TokenKind, error_msg: &str) -> Result<Token> {
        self.match_single(kind)?
            .ok_or_else(|| Error::syntactic(&self.scanner.next, error_msg))
    }

    fn match_binary_precedence_with_tokens(
        &mut self,
        parse: impl Fn(&mut Self) -> Result<Expr>,
        kinds: &[&TokenKind]
    ) -> Result<Expr> {
        let mut e = parse(self)?;

        while let Some(op) = self.match_any(kinds)? {
            let right = Box::new(parse(self)?);
            e = Expr::new_binary_op(Box::new(e), op, right);
        }

        Ok(e)
    }

    fn match_single(&mut self, kind: &TokenKind) -> Result<Option<Token>> {
        if self.check_next(kind) {
            self.advance().map(Some)
        } else {
            Ok(None)
        }
    }

    fn match_any(&mut self, kinds: &[&TokenKind]) -> Result<Option<Token>> {
        match kinds.iter().find(|k| self.check_next(k)) {
            Some(kind) => self.match_single(kind),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, printer};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn assert_source_parses_to(source: &str, expected: &str) {
        let program = parse(source).expect("source should parse");
        assert_eq!(expected, printer::print(&program));
    }

    fn parse_error(source: &str) -> crate::error::Error {
        parse(source).expect_err("source should not parse")
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_source_parses_to("print(1 + 2 * 3)\n", "(block (print (+ 1 (* 2 3))))");
    }

    #[test]
    fn binary_operators_are_left_associative() {
        assert_source_parses_to("x = 1 - 2 - 3", "(block (= x (- (- 1 2) 3)))");
        assert_source_parses_to("x = 8 / 4 / 2", "(block (= x (/ (/ 8 4) 2)))");
    }

    #[test]
    fn precedence_tiers_nest_from_or_down_to_factor() {
        assert_source_parses_to(
            "x = a or b and c > d .. e * f",
            "(block (= x (or a (and b (> c (.. d (* e f)))))))"
        );
    }

    #[test]
    fn concat_shares_the_additive_tier() {
        assert_source_parses_to("x = 1 + 2 .. 3", "(block (= x (.. (+ 1 2) 3)))");
    }

    #[test]
    fn unary_operators_bind_to_a_single_factor() {
        assert_source_parses_to("x = -a * b", "(block (= x (* (- a) b)))");
        assert_source_parses_to("x = not a == b", "(block (= x (== (not a) b)))");
        assert_source_parses_to("x = - - +1", "(block (= x (- (- (+ 1)))))");
    }

    #[test]
    fn boolean_literals_become_integers() {
        assert_source_parses_to(
            "while false do\nend\nx = not true",
            "(block (while 0 (list)) (= x (not 1)))"
        );
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_source_parses_to("x = (1 + 2) * 3", "(block (= x (* (+ 1 2) 3)))");
    }

    #[test]
    fn local_with_and_without_initializer() {
        assert_source_parses_to("local x\nlocal y = \"s\"", "(block (local x) (local y \"s\"))");
    }

    #[test]
    fn blank_lines_are_no_ops() {
        assert_source_parses_to("\n-- comment\nprint(1)", "(block (noop) (noop) (print 1))");
    }

    #[test]
    fn if_with_else_builds_both_branches() {
        assert_source_parses_to(
            "if x > 1 then\nprint(1)\nelse\nprint(2)\nprint(3)\nend\n",
            "(block (if (> x 1) (list (print 1)) (list (print 2) (print 3))))"
        );
    }

    #[test]
    fn if_without_else_has_an_empty_else_branch() {
        assert_source_parses_to("if x then\nprint(x)\nend", "(block (if x (list (print x)) (list)))");
    }

    #[test]
    fn while_loop_holds_its_condition_and_body() {
        assert_source_parses_to(
            "while i < 3 do\ni = i + 1\nend",
            "(block (while (< i 3) (list (= i (+ i 1)))))"
        );
    }

    #[test]
    fn function_declaration_and_calls() {
        assert_source_parses_to(
            "function add(a, b)\nreturn a + b\nend\nprint(add(2, 3))\nadd(1, read())",
            "(block (function add (a b) (block (return (+ a b)))) (print (call add 2 3)) (call add 1 (read)))"
        );
    }

    #[test]
    fn function_header_and_body_may_share_a_line() {
        assert_source_parses_to(
            "function add(a, b) return a + b end",
            "(block (function add (a b) (block (return (+ a b)))))"
        );
    }

    #[test]
    fn function_without_parameters() {
        assert_source_parses_to("function f()\nend\nf()", "(block (function f () (block)) (call f))");
    }

    #[test]
    fn parsing_never_evaluates() {
        assert_source_parses_to("print(1 / 0)\nprint(y)", "(block (print (/ 1 0)) (print y))");
    }

    #[rstest]
    #[case::missing_then("if x\nprint(1)\nend")]
    #[case::missing_do("while x\nprint(1)\nend")]
    #[case::missing_end("if x then\nprint(1)\n")]
    #[case::missing_while_end("while x do\nprint(1)")]
    #[case::missing_print_paren("print 1")]
    #[case::unclosed_paren("print((1 + 2)")]
    #[case::unclosed_call("f(1, 2")]
    #[case::read_without_parens("x = read")]
    #[case::two_statements_on_one_line("x = 1 y = 2")]
    #[case::statement_after_end("if x then\nend print(1)")]
    #[case::bare_expression("1 + 2")]
    #[case::bare_identifier("x")]
    #[case::local_without_name("local = 3")]
    #[case::dangling_operator("x = 1 +")]
    #[case::trailing_comma_in_params("function f(a,)\nend")]
    #[case::nested_function("function f()\nfunction g()\nend\nend")]
    #[case::stray_end("end")]
    fn malformed_programs_are_syntax_errors(#[case] source: &str) {
        assert_eq!(&ErrorKind::Syntax, parse_error(source).kind());
    }

    #[test]
    fn lexical_errors_surface_through_the_parser() {
        assert_eq!(&ErrorKind::Lexical, parse_error("x = 1 @ 2").kind());
    }

    #[test]
    fn syntax_errors_report_the_line() {
        let err = parse_error("local x = 1\n\nif x\nend");
        assert_eq!(Some(3), err.line());
    }
}
