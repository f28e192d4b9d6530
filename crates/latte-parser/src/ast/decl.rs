//! Declarations: compilation unit, imports, classes, members.

use latte_core::Span;

use crate::ast::expr::Expr;
use crate::ast::stmt::Stmt;
use crate::ast::types::{Modifiers, Path, TypeRef};

/// One parsed source unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilationUnit {
    pub package: Option<Path>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
}

/// `import a::b::C`, `import a::b::_`, `import a::b::C::member`.
///
/// Whether a wildcard names a package or a type's static members, and
/// whether an exact import names a type or a static member, is decided by
/// the resolver against the class registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: Path,
    pub wildcard: bool,
    pub span: Span,
}

impl ImportDecl {
    pub fn line(&self) -> u32 {
        self.span.line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    Class(ClassDecl),
    Interface(InterfaceDecl),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Class(c) => &c.name,
            TypeDecl::Interface(i) => &i.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeDecl::Class(c) => c.span,
            TypeDecl::Interface(i) => i.span,
        }
    }
}

/// A parent in a class header: `: Base(args), Iface`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub ty: Path,
    /// Constructor arguments, present only when written with parentheses.
    pub args: Option<Vec<Expr>>,
    pub span: Span,
}

/// `class A(a, b) : Base(a), Iface` with its body.
///
/// Constructor parameters become fields and the parameters of the single
/// constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub modifiers: Modifiers,
    pub name: String,
    pub params: Vec<Param>,
    pub parents: Vec<ParentRef>,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub modifiers: Modifiers,
    pub name: String,
    pub parents: Vec<Path>,
    pub methods: Vec<FnDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(FnDecl),
    /// Statements in a class body run by the constructor, or by the static
    /// initializer when inside a `static` section.
    Init(InitBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub name: String,
    pub ty: Option<TypeRef>,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitBlock {
    pub is_static: bool,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A parameter of a method, inner function, class header or lambda.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub modifiers: Modifiers,
    pub name: String,
    pub ty: Option<TypeRef>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FnBody {
    /// `= expr`
    Expr(Expr),
    Block(Vec<Stmt>),
    /// Interface or abstract method.
    None,
}

/// Method or inner function.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub modifiers: Modifiers,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<TypeRef>,
    pub body: FnBody,
    pub span: Span,
}

impl FnDecl {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.body, FnBody::None)
    }
}

impl ClassDecl {
    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(f) => Some(f),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &FnDecl> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(f) => Some(f),
            _ => None,
        })
    }
}
