use crate::token::Token;
use astgen::generate_ast;

generate_ast!(
    Expr,
    [
        BinaryOp      => { left: Box<Expr>, op: Token, right: Box<Expr> };
        UnaryOp       => { op: Token, operand: Box<Expr> };
        IntLiteral    => { literal: Token };
        StringLiteral => { literal: Token, value: String };
        VarAccess     => { name: Token };
        FunctionCall  => { name: Token, arguments: Vec<Expr> };
        Read          => { keyword: Token };
    ]
);
