//! Statement nodes.

use latte_core::Span;

use crate::ast::decl::FnDecl;
use crate::ast::expr::Expr;
use crate::ast::ops::AssignOp;
use crate::ast::types::TypeRef;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    /// `x : T = e`, `val x = e`
    Local(LocalStmt),
    /// `target = e`, `target += e` ... A plain `x = e` to an unknown name
    /// defines a local.
    Assign(AssignStmt),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Try(TryStmt),
    Synchronized(SyncStmt),
    Throw(ThrowStmt),
    /// Inner function declared in a method body.
    InnerFn(FnDecl),
    Break(Span),
    Continue(Span),
    /// `...`
    Pass(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalStmt {
    pub name: String,
    pub ty: Option<TypeRef>,
    pub value: Option<Expr>,
    /// Declared with `val`.
    pub immutable: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Expr,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBranch {
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `if` with any number of `elseif` branches and an optional `else`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub branches: Vec<IfBranch>,
    pub else_body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `for x in e`: `e` is an array, or anything the runtime can iterate.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub var: String,
    pub iterable: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `try` followed by `catch e` and/or `finally`.
#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub body: Vec<Stmt>,
    pub catch: Option<CatchClause>,
    pub finally: Option<Vec<Stmt>>,
    pub span: Span,
}

/// `catch e`: catches everything thrown in the `try` body.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub var: String,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `synchronized(e1, e2, ...)` block. Locks are kept in written order.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStmt {
    pub locks: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStmt {
    pub value: Expr,
    pub span: Span,
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(e) => e.span(),
            Stmt::Local(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Try(s) => s.span,
            Stmt::Synchronized(s) => s.span,
            Stmt::Throw(s) => s.span,
            Stmt::InnerFn(f) => f.span,
            Stmt::Break(span) | Stmt::Continue(span) | Stmt::Pass(span) => *span,
        }
    }
}
