//! Expression nodes.

use latte_core::{FloatLit, Span};

use crate::ast::ops::{BinaryOp, UnaryOp};
use crate::ast::stmt::Stmt;
use crate::ast::types::{Path, TypeRef};
use crate::ast::decl::Param;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(FloatLit),
    Double(FloatLit),
    Bool(bool),
    Str(String),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralExpr),
    /// Bare identifier.
    Name(NameExpr),
    /// `a::b::C`, a path written with the scope separator.
    Path(Path),
    This(Span),
    /// `target.name`
    Field(FieldExpr),
    /// `callee(args)`; the callee is a name, path or field access.
    Call(CallExpr),
    /// `new T(args)`
    New(NewExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    /// `e as T`
    Cast(CastExpr),
    Lambda(LambdaExpr),
    /// `[a, b]`
    List(ListExpr),
    /// `["k": v]`
    Map(MapExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpr {
    pub value: Literal,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameExpr {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpr {
    pub target: Box<Expr>,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpr {
    pub ty: TypeRef,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub expr: Box<Expr>,
    pub ty: TypeRef,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    pub params: Vec<Param>,
    pub body: LambdaBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListExpr {
    pub items: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapExpr {
    pub entries: Vec<(Expr, Expr)>,
    pub span: Span,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Name(e) => e.span,
            Expr::Path(p) => p.span,
            Expr::This(span) => *span,
            Expr::Field(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::New(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Cast(e) => e.span,
            Expr::Lambda(e) => e.span,
            Expr::List(e) => e.span,
            Expr::Map(e) => e.span,
        }
    }

    pub fn name(name: impl Into<String>, span: Span) -> Self {
        Expr::Name(NameExpr {
            name: name.into(),
            span,
        })
    }

    pub fn literal(value: Literal, span: Span) -> Self {
        Expr::Literal(LiteralExpr { value, span })
    }

    /// The dotted segments of a chain of plain names (`a.b.c`), if this
    /// expression is one.
    pub fn as_path_segments(&self) -> Option<Vec<String>> {
        match self {
            Expr::Name(n) => Some(vec![n.name.clone()]),
            Expr::Path(p) => Some(p.segments.clone()),
            Expr::Field(f) => {
                let mut segments = f.target.as_path_segments()?;
                segments.push(f.name.clone());
                Some(segments)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_chain_as_path() {
        let chain = Expr::Field(FieldExpr {
            target: Box::new(Expr::Field(FieldExpr {
                target: Box::new(Expr::name("a", Span::default())),
                name: "b".into(),
                span: Span::default(),
            })),
            name: "C".into(),
            span: Span::default(),
        });
        assert_eq!(chain.as_path_segments(), Some(vec!["a".into(), "b".into(), "C".into()]));

        let call = Expr::Call(CallExpr {
            callee: Box::new(Expr::name("f", Span::default())),
            args: vec![],
            span: Span::default(),
        });
        assert_eq!(call.as_path_segments(), None);
    }
}
