use crate::{
    expr::{self, Expr},
    stmt::{self, Stmt},
};

/// Renders a parsed program as nested S-expressions, e.g. `(block (print (+ 1 2)))`.
pub fn print(s: &Stmt) -> String {
    let mut printer = AstPrinter {};
    s.accept(&mut printer)
}

#[cfg(test)]
fn print_expr(e: &Expr) -> String {
    let mut printer = AstPrinter {};
    e.accept(&mut printer)
}

struct AstPrinter;

impl AstPrinter {
    fn parenthesize(&mut self, name: &str, parts: &[String]) -> String {
        let mut s = String::new();
        s.push('(');
        s.push_str(name);

        for part in parts.iter() {
            s.push(' ');
            s.push_str(part.as_str());
        }

        s.push(')');
        s
    }

    fn statements(&mut self, name: &str, statements: &[Stmt]) -> String {
        let parts: Vec<String> = statements.iter().map(|s| s.accept(self)).collect();
        self.parenthesize(name, &parts)
    }
}

impl expr::Visitor<String> for AstPrinter {
    fn visit_binary_op_expr(&mut self, e: &expr::BinaryOp) -> String {
        let parts = [e.left.accept(self), e.right.accept(self)];
        self.parenthesize(e.op.lexeme.as_str(), &parts)
    }

    fn visit_unary_op_expr(&mut self, e: &expr::UnaryOp) -> String {
        let parts = [e.operand.accept(self)];
        self.parenthesize(e.op.lexeme.as_str(), &parts)
    }

    fn visit_int_literal_expr(&mut self, e: &expr::IntLiteral) -> String {
        e.literal.lexeme.clone()
    }

    fn visit_string_literal_expr(&mut self, e: &expr::StringLiteral) -> String {
        format!("\"{}\"", e.value)
    }

    fn visit_var_access_expr(&mut self, e: &expr::VarAccess) -> String {
        e.name.lexeme.clone()
    }

    fn visit_function_call_expr(&mut self, e: &expr::FunctionCall) -> String {
        let mut parts = vec![e.name.lexeme.clone()];
        parts.extend(e.arguments.iter().map(|a| a.accept(self)));
        self.parenthesize("call", &parts)
    }

    fn visit_read_expr(&mut self, _: &expr::Read) -> String {
        self.parenthesize("read", &[])
    }
}

impl stmt::Visitor<String> for AstPrinter {
    fn visit_no_op_stmt(&mut self, _: &stmt::NoOp) -> String {
        self.parenthesize("noop", &[])
    }

    fn visit_var_declare_stmt(&mut self, s: &stmt::VarDeclare) -> String {
        let mut parts = vec![s.name.lexeme.clone()];
        if let Some(initializer) = &s.initializer {
            parts.push(initializer.accept(self));
        }
        self.parenthesize("local", &parts)
    }

    fn visit_var_assign_stmt(&mut self, s: &stmt::VarAssign) -> String {
        let parts = [s.name.lexeme.clone(), s.value.accept(self)];
        self.parenthesize("=", &parts)
    }

    fn visit_function_declare_stmt(&mut self, s: &stmt::FunctionDeclare) -> String {
        let params: Vec<&str> = s.params.iter().map(|p| p.lexeme.as_str()).collect();
        let parts = [
            s.name.lexeme.clone(),
            format!("({})", params.join(" ")),
            s.body.accept(self),
        ];
        self.parenthesize("function", &parts)
    }

    fn visit_expression_stmt(&mut self, s: &stmt::Expression) -> String {
        s.expression.accept(self)
    }

    fn visit_print_stmt(&mut self, s: &stmt::Print) -> String {
        let parts = [s.expression.accept(self)];
        self.parenthesize("print", &parts)
    }

    fn visit_while_loop_stmt(&mut self, s: &stmt::WhileLoop) -> String {
        let parts = [s.condition.accept(self), s.body.accept(self)];
        self.parenthesize("while", &parts)
    }

    fn visit_if_else_stmt(&mut self, s: &stmt::IfElse) -> String {
        let parts = [
            s.condition.accept(self),
            s.then_branch.accept(self),
            s.else_branch.accept(self),
        ];
        self.parenthesize("if", &parts)
    }

    fn visit_return_stmt(&mut self, s: &stmt::Return) -> String {
        let parts = [s.value.accept(self)];
        self.parenthesize("return", &parts)
    }

    fn visit_statement_list_stmt(&mut self, s: &stmt::StatementList) -> String {
        self.statements("list", &s.statements)
    }

    fn visit_block_stmt(&mut self, s: &stmt::Block) -> String {
        self.statements("block", &s.statements)
    }
}
