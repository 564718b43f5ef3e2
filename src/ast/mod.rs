use std::rc::Rc;

use serde::Serialize;

// ── Expressions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Serialize)]
pub enum Expr {
    Literal {
        value: Literal,
        line: usize,
    },
    Variable {
        name: String,
        line: usize,
    },
    Assign {
        name: String,
        value: Box<Expr>,
        line: usize,
    },
    Binary {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
        line: usize,
    },
    Logical {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
        line: usize,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
        line: usize,
    },
    Grouping {
        expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        line: usize,
    },
    Get {
        object: Box<Expr>,
        name: String,
        line: usize,
    },
    Set {
        object: Box<Expr>,
        name: String,
        value: Box<Expr>,
        line: usize,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        line: usize,
    },
    IndexAssign {
        object: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        line: usize,
    },
    ListLiteral {
        elements: Vec<Expr>,
        line: usize,
    },
    MapLiteral {
        entries: Vec<(Expr, Expr)>,
        line: usize,
    },
    This {
        line: usize,
    },
    Super {
        method: String,
        line: usize,
    },
    New {
        class_name: String,
        arguments: Vec<Expr>,
        line: usize,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal { line, .. } => *line,
            Expr::Variable { line, .. } => *line,
            Expr::Assign { line, .. } => *line,
            Expr::Binary { line, .. } => *line,
            Expr::Logical { line, .. } => *line,
            Expr::Unary { line, .. } => *line,
            Expr::Grouping { expr } => expr.line(),
            Expr::Call { line, .. } => *line,
            Expr::Get { line, .. } => *line,
            Expr::Set { line, .. } => *line,
            Expr::Index { line, .. } => *line,
            Expr::IndexAssign { line, .. } => *line,
            Expr::ListLiteral { line, .. } => *line,
            Expr::MapLiteral { line, .. } => *line,
            Expr::This { line } => *line,
            Expr::Super { line, .. } => *line,
            Expr::New { line, .. } => *line,
        }
    }
}

// ── Statements ──────────────────────────────────────────────────────────

/// A function or method declaration. Shared by reference between the AST
/// and every runtime function value created from it.
#[derive(Debug, Serialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    Expression {
        expr: Expr,
    },
    Print {
        expr: Expr,
        line: usize,
    },
    Input {
        variable: String,
        prompt: Option<Expr>,
        line: usize,
    },
    Block {
        statements: Vec<Stmt>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        line: usize,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        line: usize,
    },
    ForEach {
        variable: String,
        iterable: Expr,
        body: Box<Stmt>,
        line: usize,
    },
    Function {
        decl: Rc<FunctionDecl>,
    },
    Class {
        name: String,
        superclass: Option<String>,
        methods: Vec<Rc<FunctionDecl>>,
        line: usize,
    },
    Return {
        value: Option<Expr>,
        line: usize,
    },
}
