use std::{
    io::{BufRead, Write},
    mem,
    ops::ControlFlow::{self, Break, Continue},
};

use log::{debug, info, trace};

use crate::{
    environment::{FunctionTable, VariableTable},
    error::{Error, Result},
    expr::{self, Expr},
    stmt::{self, Stmt},
    token::{Token, TokenKind},
    value::Value,
};

/// What running a statement leaves behind: keep going, or unwind to the
/// nearest function call carrying a `return` value.
type Flow = ControlFlow<Value>;

/// Walks a parsed program. `print` goes to `writer` and `read()` pulls one
/// line at a time from `reader`.
pub struct Interpreter<W, R> {
    writer: W,
    reader: R,
    functions: FunctionTable,
    frame: VariableTable,
}

impl <W: Write, R: BufRead> Interpreter<W, R> {
    pub fn new(writer: W, reader: R) -> Self {
        Interpreter {
            writer,
            reader,
            functions: FunctionTable::new(),
            frame: VariableTable::new(),
        }
    }

    pub fn interpret(&mut self, program: &Stmt) -> Result<()> {
        info!("interpreting program");
        if let Break(value) = self.execute(program)? {
            debug!("program returned {} at top level", value);
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn execute(&mut self, s: &Stmt) -> Result<Flow> {
        s.accept(self)
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for statement in statements {
            if let Break(value) = self.execute(statement)? {
                return Ok(Break(value))
            }
        }
        Ok(Continue(()))
    }

    fn evaluate(&mut self, e: &Expr) -> Result<Value> {
        e.accept(self)
    }

    fn check_condition(&mut self, keyword: &Token, condition: &Expr) -> Result<bool> {
        let value = self.evaluate(condition)?;
        value.is_truthy().ok_or_else(|| Error::type_mismatch(
            keyword,
            format!("'{}' condition must be an integer but got a {}.", keyword.lexeme, value.type_name())
        ))
    }

    /// `and` / `or`: the right operand only runs when the left one doesn't
    /// already decide the result.
    fn short_circuit(&mut self, e: &expr::BinaryOp, decided_by: bool) -> Result<Value> {
        let left = logical_operand(&e.op, self.evaluate(&e.left)?)?;
        if left == decided_by {
            return Ok(left.into())
        }
        let right = logical_operand(&e.op, self.evaluate(&e.right)?)?;
        Ok(right.into())
    }

    fn call(&mut self, e: &expr::FunctionCall) -> Result<Value> {
        let function = self.functions.get(&e.name, e.arguments.len())?.clone();

        let mut arguments = Vec::with_capacity(e.arguments.len());
        for argument in &e.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        let mut frame = VariableTable::new();
        for (param, argument) in function.params.iter().zip(arguments) {
            frame.declare(param)?;
            frame.assign(param, argument)?;
        }

        debug!("calling '{}' on line {}", e.name.lexeme, e.name.line);
        let caller = mem::replace(&mut self.frame, frame);
        let result = self.execute(&function.body);
        self.frame = caller;

        match result? {
            Break(value) => Ok(value),
            Continue(()) => Ok(Value::Integer(0)),
        }
    }
}

impl <W: Write, R: BufRead> expr::Visitor<Result<Value>> for Interpreter<W, R> {
    fn visit_binary_op_expr(&mut self, e: &expr::BinaryOp) -> Result<Value> {
        match e.op.kind {
            TokenKind::And => return self.short_circuit(e, false),
            TokenKind::Or => return self.short_circuit(e, true),
            _ => {},
        }

        let left = self.evaluate(&e.left)?;
        let right = self.evaluate(&e.right)?;

        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => integer_binary_op(&e.op, l, r),
            (Value::String(l), Value::String(r)) => string_binary_op(&e.op, l, r),
            (l, r) if e.op.kind == TokenKind::Concat => Ok(Value::String(format!("{}{}", l, r))),
            (l, r) => Err(Error::type_mismatch(
                &e.op,
                format!("Operator '{}' cannot combine a {} with a {}.", e.op.lexeme, l.type_name(), r.type_name())
            )),
        }
    }

    fn visit_unary_op_expr(&mut self, e: &expr::UnaryOp) -> Result<Value> {
        let operand = self.evaluate(&e.operand)?;

        match (&e.op.kind, operand) {
            (TokenKind::Not, Value::Integer(n)) => Ok((n == 0).into()),
            (TokenKind::Minus, Value::Integer(n)) => n.checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| Error::runtime(&e.op, format!("Integer overflow negating {}.", n))),
            (TokenKind::Plus, Value::Integer(n)) => Ok(Value::Integer(n)),
            (_, operand) => Err(Error::type_mismatch(
                &e.op,
                format!("Unary '{}' expects an integer but got a {}.", e.op.lexeme, operand.type_name())
            )),
        }
    }

    fn visit_int_literal_expr(&mut self, e: &expr::IntLiteral) -> Result<Value> {
        e.literal.lexeme.parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| Error::value(
                &e.literal,
                format!("Invalid integer literal '{}'.", e.literal.lexeme)
            ))
    }

    fn visit_string_literal_expr(&mut self, e: &expr::StringLiteral) -> Result<Value> {
        Ok(Value::String(e.value.clone()))
    }

    fn visit_var_access_expr(&mut self, e: &expr::VarAccess) -> Result<Value> {
        self.frame.get(&e.name)
    }

    fn visit_function_call_expr(&mut self, e: &expr::FunctionCall) -> Result<Value> {
        self.call(e)
    }

    fn visit_read_expr(&mut self, e: &expr::Read) -> Result<Value> {
        // Anything printed so far should be visible before blocking on input.
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(Error::value(&e.keyword, "read() reached the end of input."))
        }

        let input = line.trim();
        trace!("read() got {:?}", input);
        match input {
            "true" => Ok(Value::Integer(1)),
            "false" => Ok(Value::Integer(0)),
            _ => input.parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| Error::value(
                    &e.keyword,
                    format!("read() expects an integer, 'true' or 'false' but got '{}'.", input)
                )),
        }
    }
}

impl <W: Write, R: BufRead> stmt::Visitor<Result<Flow>> for Interpreter<W, R> {
    fn visit_no_op_stmt(&mut self, _: &stmt::NoOp) -> Result<Flow> {
        Ok(Continue(()))
    }

    fn visit_var_declare_stmt(&mut self, s: &stmt::VarDeclare) -> Result<Flow> {
        self.frame.declare(&s.name)?;
        if let Some(initializer) = &s.initializer {
            let value = self.evaluate(initializer)?;
            self.frame.assign(&s.name, value)?;
        }
        Ok(Continue(()))
    }

    fn visit_var_assign_stmt(&mut self, s: &stmt::VarAssign) -> Result<Flow> {
        let value = self.evaluate(&s.value)?;
        self.frame.assign(&s.name, value)?;
        Ok(Continue(()))
    }

    fn visit_function_declare_stmt(&mut self, s: &stmt::FunctionDeclare) -> Result<Flow> {
        self.functions.define(s)?;
        Ok(Continue(()))
    }

    fn visit_expression_stmt(&mut self, s: &stmt::Expression) -> Result<Flow> {
        self.evaluate(&s.expression)?;
        Ok(Continue(()))
    }

    fn visit_print_stmt(&mut self, s: &stmt::Print) -> Result<Flow> {
        let value = self.evaluate(&s.expression)?;
        writeln!(self.writer, "{}", value)?;
        Ok(Continue(()))
    }

    fn visit_while_loop_stmt(&mut self, s: &stmt::WhileLoop) -> Result<Flow> {
        while self.check_condition(&s.keyword, &s.condition)? {
            if let Break(value) = self.execute(&s.body)? {
                return Ok(Break(value))
            }
        }
        Ok(Continue(()))
    }

    fn visit_if_else_stmt(&mut self, s: &stmt::IfElse) -> Result<Flow> {
        if self.check_condition(&s.keyword, &s.condition)? {
            self.execute(&s.then_branch)
        } else {
            self.execute(&s.else_branch)
        }
    }

    fn visit_return_stmt(&mut self, s: &stmt::Return) -> Result<Flow> {
        let value = self.evaluate(&s.value)?;
        Ok(Break(value))
    }

    fn visit_statement_list_stmt(&mut self, s: &stmt::StatementList) -> Result<Flow> {
        self.execute_all(&s.statements)
    }

    fn visit_block_stmt(&mut self, s: &stmt::Block) -> Result<Flow> {
        self.execute_all(&s.statements)
    }
}

fn logical_operand(op: &Token, value: Value) -> Result<bool> {
    value.is_truthy().ok_or_else(|| Error::type_mismatch(
        op,
        format!("Operator '{}' expects integers but got a {}.", op.lexeme, value.type_name())
    ))
}

fn integer_binary_op(op: &Token, l: i64, r: i64) -> Result<Value> {
    let result = match op.kind {
        TokenKind::Plus => l.checked_add(r),
        TokenKind::Minus => l.checked_sub(r),
        TokenKind::Star => l.checked_mul(r),
        TokenKind::Slash => {
            if r == 0 {
                return Err(Error::runtime(op, "Division by zero."))
            }
            l.checked_div(r)
        },
        TokenKind::Greater => return Ok((l > r).into()),
        TokenKind::Less => return Ok((l < r).into()),
        TokenKind::EqualEqual => return Ok((l == r).into()),
        TokenKind::Concat => return Ok(Value::String(format!("{}{}", l, r))),
        _ => return Err(unsupported_operator(op, "integers")),
    };

    result
        .map(Value::Integer)
        .ok_or_else(|| Error::runtime(op, format!("Integer overflow in {} {} {}.", l, op.lexeme, r)))
}

fn string_binary_op(op: &Token, mut l: String, r: String) -> Result<Value> {
    match op.kind {
        TokenKind::Greater => Ok((l > r).into()),
        TokenKind::Less => Ok((l < r).into()),
        TokenKind::EqualEqual => Ok((l == r).into()),
        TokenKind::Concat => {
            l.push_str(&r);
            Ok(Value::String(l))
        },
        _ => Err(unsupported_operator(op, "strings")),
    }
}

fn unsupported_operator(op: &Token, operands: &str) -> Error {
    Error::type_mismatch(op, format!("Operator '{}' is not defined for two {}.", op.lexeme, operands))
}
