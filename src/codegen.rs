use std::collections::HashMap;

use log::{debug, info};

use crate::{
    error::{Error, Result},
    expr::{self, Expr},
    stmt::{self, Stmt},
    token::{Token, TokenKind},
};

const HEADER: &str = "\
; constants
SYS_EXIT equ 1
SYS_READ equ 3
SYS_WRITE equ 4
STDIN equ 0
STDOUT equ 1
True equ 1
False equ 0

segment .data

formatin: db \"%d\", 0
formatout: db \"%d\", 10, 0 ; newline, nul terminator
scanint: times 4 db 0 ; 32-bit integer

segment .bss
res RESB 1

section .text
global main
extern scanf
extern printf
extern fflush
extern stdout

; comparison helpers: EAX = 1 when the flags match, 0 otherwise
binop_je:
JE binop_true
JMP binop_false

binop_jg:
JG binop_true
JMP binop_false

binop_jl:
JL binop_true
JMP binop_false

binop_false:
MOV EAX, False
JMP binop_exit
binop_true:
MOV EAX, True
binop_exit:
RET

main:

PUSH EBP ; save the caller's base pointer
MOV EBP, ESP ; new frame
";

const FOOTER: &str = "\
; flush stdout and exit

PUSH DWORD [stdout]
CALL fflush
ADD ESP, 4

MOV ESP, EBP
POP EBP

MOV EAX, 1
XOR EBX, EBX
INT 0x80
";

/// Translates the integer subset of the language into 32-bit NASM assembly.
/// Every expression leaves its result in `EAX`; locals live at `[EBP-4k]`.
pub struct CodeGenerator {
    code: Vec<String>,
    locals: HashMap<String, usize>,
    labels: usize,
}

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator { code: Vec::new(), locals: HashMap::new(), labels: 0 }
    }

    pub fn generate(mut self, program: &Stmt) -> Result<String> {
        info!("generating assembly");
        self.statement(program)?;
        debug!("{} local slot(s), {} label(s)", self.locals.len(), self.labels);

        let mut out = String::from(HEADER);
        out.push('\n');
        if !self.locals.is_empty() {
            out.push_str(&format!("SUB ESP, {} ; local variables\n", 4 * self.locals.len()));
        }
        for instruction in &self.code {
            out.push_str(instruction);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(FOOTER);
        Ok(out)
    }

    fn emit<S: Into<String>>(&mut self, instruction: S) {
        self.code.push(instruction.into());
    }

    fn next_label(&mut self) -> usize {
        self.labels += 1;
        self.labels
    }

    fn slot(&self, name: &Token) -> Result<usize> {
        self.locals.get(&name.lexeme)
            .copied()
            .ok_or_else(|| Error::name(name, format!("Variable '{}' is not declared.", name.lexeme)))
    }

    /// `and` / `or` as jumps: the right operand only runs when the left one
    /// doesn't decide the result, and `EAX` always ends up `True` or `False`.
    fn short_circuit(&mut self, e: &expr::BinaryOp, decided_by: bool) -> Result<()> {
        let id = self.next_label();
        let (prefix, jump, decided, undecided) = if decided_by {
            ("or", "JNE", "True", "False")
        } else {
            ("and", "JE", "False", "True")
        };
        let label = format!("{}_{}_{}", prefix, decided.to_lowercase(), id);

        for operand in [&e.left, &e.right] {
            self.expression(operand)?;
            self.emit("CMP EAX, False");
            self.emit(format!("{} {}", jump, label));
        }
        self.emit(format!("MOV EAX, {}", undecided));
        self.emit(format!("JMP {}_end_{}", prefix, id));
        self.emit(format!("{}:", label));
        self.emit(format!("MOV EAX, {}", decided));
        self.emit(format!("{}_end_{}:", prefix, id));
        Ok(())
    }

    fn statement(&mut self, s: &Stmt) -> Result<()> {
        s.accept(self)
    }

    fn statements(&mut self, statements: &[Stmt]) -> Result<()> {
        statements.iter().try_for_each(|s| self.statement(s))
    }

    fn expression(&mut self, e: &Expr) -> Result<()> {
        e.accept(self)
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn unsupported(token: &Token, what: &str) -> Error {
    Error::compile(token.line, format!("{} cannot be compiled.", what))
}

impl expr::Visitor<Result<()>> for CodeGenerator {
    fn visit_binary_op_expr(&mut self, e: &expr::BinaryOp) -> Result<()> {
        match e.op.kind {
            TokenKind::Concat => return Err(unsupported(&e.op, "String concatenation")),
            TokenKind::And => return self.short_circuit(e, false),
            TokenKind::Or => return self.short_circuit(e, true),
            _ => {},
        }

        self.expression(&e.right)?;
        self.emit("PUSH EAX");
        self.expression(&e.left)?;
        self.emit("POP EBX");

        match e.op.kind {
            TokenKind::EqualEqual | TokenKind::Greater | TokenKind::Less => {
                self.emit("CMP EAX, EBX");
                self.emit(match e.op.kind {
                    TokenKind::EqualEqual => "CALL binop_je",
                    TokenKind::Greater => "CALL binop_jg",
                    _ => "CALL binop_jl",
                });
            },
            TokenKind::Plus => self.emit("ADD EAX, EBX"),
            TokenKind::Minus => self.emit("SUB EAX, EBX"),
            TokenKind::Star => self.emit("IMUL EAX, EBX"),
            TokenKind::Slash => {
                self.emit("CDQ");
                self.emit("IDIV EBX");
            },
            _ => return Err(unsupported(&e.op, &format!("Operator '{}'", e.op.lexeme))),
        }
        Ok(())
    }

    fn visit_unary_op_expr(&mut self, e: &expr::UnaryOp) -> Result<()> {
        self.expression(&e.operand)?;
        match e.op.kind {
            TokenKind::Not => {
                self.emit("CMP EAX, False");
                self.emit("CALL binop_je");
            },
            TokenKind::Minus => self.emit("NEG EAX"),
            _ => {},
        }
        Ok(())
    }

    fn visit_int_literal_expr(&mut self, e: &expr::IntLiteral) -> Result<()> {
        let value = e.literal.lexeme.parse::<i32>()
            .map_err(|_| Error::value(
                &e.literal,
                format!("Integer literal '{}' does not fit in 32 bits.", e.literal.lexeme)
            ))?;
        self.emit(format!("MOV EAX, {}", value));
        Ok(())
    }

    fn visit_string_literal_expr(&mut self, e: &expr::StringLiteral) -> Result<()> {
        Err(unsupported(&e.literal, "String literal"))
    }

    fn visit_var_access_expr(&mut self, e: &expr::VarAccess) -> Result<()> {
        let offset = self.slot(&e.name)?;
        self.emit(format!("MOV EAX, [EBP-{}]", offset));
        Ok(())
    }

    fn visit_function_call_expr(&mut self, e: &expr::FunctionCall) -> Result<()> {
        Err(unsupported(&e.name, "Function call"))
    }

    fn visit_read_expr(&mut self, _: &expr::Read) -> Result<()> {
        self.emit("PUSH scanint");
        self.emit("PUSH formatin");
        self.emit("CALL scanf");
        self.emit("ADD ESP, 8");
        self.emit("MOV EAX, DWORD [scanint]");
        Ok(())
    }
}

impl stmt::Visitor<Result<()>> for CodeGenerator {
    fn visit_no_op_stmt(&mut self, _: &stmt::NoOp) -> Result<()> {
        Ok(())
    }

    fn visit_var_declare_stmt(&mut self, s: &stmt::VarDeclare) -> Result<()> {
        if self.locals.contains_key(&s.name.lexeme) {
            return Err(Error::name(
                &s.name,
                format!("Variable '{}' is already declared in this scope.", s.name.lexeme)
            ))
        }
        let offset = 4 * (self.locals.len() + 1);
        self.locals.insert(s.name.lexeme.clone(), offset);

        if let Some(initializer) = &s.initializer {
            self.expression(initializer)?;
            self.emit(format!("MOV [EBP-{}], EAX", offset));
        }
        Ok(())
    }

    fn visit_var_assign_stmt(&mut self, s: &stmt::VarAssign) -> Result<()> {
        self.expression(&s.value)?;
        let offset = self.slot(&s.name)?;
        self.emit(format!("MOV [EBP-{}], EAX", offset));
        Ok(())
    }

    fn visit_function_declare_stmt(&mut self, s: &stmt::FunctionDeclare) -> Result<()> {
        Err(unsupported(&s.name, "Function declaration"))
    }

    fn visit_expression_stmt(&mut self, s: &stmt::Expression) -> Result<()> {
        self.expression(&s.expression)
    }

    fn visit_print_stmt(&mut self, s: &stmt::Print) -> Result<()> {
        self.expression(&s.expression)?;
        self.emit("PUSH EAX");
        self.emit("PUSH formatout");
        self.emit("CALL printf");
        self.emit("ADD ESP, 8");
        Ok(())
    }

    fn visit_while_loop_stmt(&mut self, s: &stmt::WhileLoop) -> Result<()> {
        let id = self.next_label();
        self.emit(format!("while_{}:", id));
        self.expression(&s.condition)?;
        self.emit("CMP EAX, False");
        self.emit(format!("JE while_end_{}", id));
        self.statement(&s.body)?;
        self.emit(format!("JMP while_{}", id));
        self.emit(format!("while_end_{}:", id));
        Ok(())
    }

    fn visit_if_else_stmt(&mut self, s: &stmt::IfElse) -> Result<()> {
        let id = self.next_label();
        self.emit(format!("if_{}:", id));
        self.expression(&s.condition)?;
        self.emit("CMP EAX, False");
        self.emit(format!("JE if_else_{}", id));
        self.statement(&s.then_branch)?;
        self.emit(format!("JMP if_end_{}", id));
        self.emit(format!("if_else_{}:", id));
        self.statement(&s.else_branch)?;
        self.emit(format!("if_end_{}:", id));
        Ok(())
    }

    fn visit_return_stmt(&mut self, s: &stmt::Return) -> Result<()> {
        Err(unsupported(&s.keyword, "Return"))
    }

    fn visit_statement_list_stmt(&mut self, s: &stmt::StatementList) -> Result<()> {
        self.statements(&s.statements)
    }

    fn visit_block_stmt(&mut self, s: &stmt::Block) -> Result<()> {
        self.statements(&s.statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, parser::parse};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn body(source: &str) -> Vec<String> {
        let program = parse(source).unwrap();
        let mut generator = CodeGenerator::new();
        generator.statement(&program).unwrap();
        generator.code
    }

    fn compile_error(source: &str) -> ErrorKind {
        let program = parse(source).unwrap();
        *CodeGenerator::new().generate(&program).unwrap_err().kind()
    }

    #[test]
    fn binary_op_evaluates_right_then_left() {
        assert_eq!(
            vec!["MOV EAX, 2", "PUSH EAX", "MOV EAX, 1", "POP EBX", "SUB EAX, EBX"],
            body("print(1 - 2)")[..5].to_vec()
        );
    }

    #[test]
    fn print_calls_printf() {
        assert_eq!(
            vec!["MOV EAX, 4", "PUSH EAX", "PUSH formatout", "CALL printf", "ADD ESP, 8"],
            body("print(4)")
        );
    }

    #[test]
    fn locals_get_consecutive_stack_slots() {
        assert_eq!(
            vec!["MOV EAX, 1", "MOV [EBP-4], EAX", "MOV EAX, [EBP-4]", "MOV [EBP-8], EAX"],
            body("local a = 1\nlocal b\nb = a")
        );
    }

    #[test]
    fn division_sign_extends_first() {
        let code = body("local x = 6 / 3");
        assert_eq!(vec!["CDQ", "IDIV EBX"], code[4..6].to_vec());
    }

    #[test]
    fn loops_and_branches_get_distinct_labels() {
        let code = body("local i = 0\nwhile i < 2 do\nif i == 1 then\nprint(i)\nend\ni = i + 1\nend");
        for label in ["while_1:", "JE while_end_1", "JMP while_1", "while_end_1:", "if_2:", "JE if_else_2", "if_end_2:"] {
            assert!(code.iter().any(|l| l == label), "missing {}", label);
        }
    }

    #[test]
    fn and_jumps_out_on_the_first_false_operand() {
        assert_eq!(
            vec![
                "MOV EAX, 2", "CMP EAX, False", "JE and_false_1",
                "MOV EAX, 1", "CMP EAX, False", "JE and_false_1",
                "MOV EAX, True", "JMP and_end_1",
                "and_false_1:", "MOV EAX, False",
                "and_end_1:",
            ],
            body("local x = 2 and 1")[..11].to_vec()
        );
    }

    #[test]
    fn or_jumps_out_on_the_first_true_operand() {
        assert_eq!(
            vec![
                "MOV EAX, 0", "CMP EAX, False", "JNE or_true_1",
                "PUSH scanint", "PUSH formatin", "CALL scanf", "ADD ESP, 8", "MOV EAX, DWORD [scanint]",
                "CMP EAX, False", "JNE or_true_1",
                "MOV EAX, False", "JMP or_end_1",
                "or_true_1:", "MOV EAX, True",
                "or_end_1:",
            ],
            body("local x = 0 or read()")[..15].to_vec()
        );
    }

    #[test]
    fn local_inside_a_loop_gets_one_slot_for_every_iteration() {
        let program = parse("local i = 0\nwhile i < 3 do\nlocal sq = i * i\nprint(sq)\ni = i + 1\nend").unwrap();
        let asm = CodeGenerator::new().generate(&program).unwrap();
        assert!(asm.contains("SUB ESP, 8 ; local variables\n"));
        assert!(asm.contains("MOV [EBP-8], EAX"));
    }

    #[test]
    fn generated_program_wraps_code_in_header_and_footer() {
        let program = parse("local x = read()\nprint(x)").unwrap();
        let asm = CodeGenerator::new().generate(&program).unwrap();
        assert!(asm.starts_with("; constants\n"));
        assert!(asm.contains("SUB ESP, 4 ; local variables\nPUSH scanint\n"));
        assert!(asm.trim_end().ends_with("INT 0x80"));
    }

    #[rstest]
    #[case::string_literal("print(\"hi\")", ErrorKind::Compile)]
    #[case::concat("print(1 .. 2)", ErrorKind::Compile)]
    #[case::function("function f()\nend", ErrorKind::Compile)]
    #[case::call("f()", ErrorKind::Compile)]
    #[case::top_level_return("return 1", ErrorKind::Compile)]
    #[case::undeclared("x = 1", ErrorKind::Name)]
    #[case::redeclared("local x\nlocal x", ErrorKind::Name)]
    #[case::wide_literal("print(4294967296)", ErrorKind::Value)]
    fn rejected_programs(#[case] source: &str, #[case] expected: ErrorKind) {
        assert_eq!(expected, compile_error(source));
    }
}
