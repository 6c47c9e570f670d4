use std::rc::Rc;

use astgen::generate_ast;
use crate::{expr::Expr, token::Token};

// `WhileLoop` and `IfElse` bodies are always `StatementList`s; function bodies
// and the program root are `Block`s, the boundary a `Return` unwinds to.
generate_ast!(
    Stmt,
    [
        NoOp            => {};
        VarDeclare      => { name: Token, initializer: Option<Expr> };
        VarAssign       => { name: Token, value: Expr };
        FunctionDeclare => { name: Token, params: Vec<Token>, body: Rc<Stmt> };
        Expression      => { expression: Expr };
        Print           => { keyword: Token, expression: Expr };
        WhileLoop       => { keyword: Token, condition: Expr, body: Box<Stmt> };
        IfElse          => { keyword: Token, condition: Expr, then_branch: Box<Stmt>, else_branch: Box<Stmt> };
        Return          => { keyword: Token, value: Expr };
        StatementList   => { statements: Vec<Stmt> };
        Block           => { statements: Vec<Stmt> };
    ]
);
