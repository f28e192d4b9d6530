//! Resolved program representation.
//!
//! The resolver turns the parser's AST into this tree: every name is bound
//! to a local, a field, a static member or a type, lambdas carry their
//! capture lists, and every class carries the header it was registered
//! with. Code generation reads nothing else.

use latte_core::{JvmType, MethodDescriptor, QualifiedName, Span};
use latte_parser::{BinaryOp, Literal, UnaryOp};
use latte_registry::{AccessFlags, ClassEntry};

/// What a name resolved to outside of any local scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedSymbol {
    Type(QualifiedName),
    StaticMember { owner: QualifiedName, member: String },
}

// ============================================================================
// Units and classes
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedUnit {
    /// Logical name the unit was compiled under.
    pub name: String,
    pub package: Vec<String>,
    pub classes: Vec<ClassDef>,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub entry: ClassEntry,
    /// Absent for interfaces.
    pub constructor: Option<ConstructorDef>,
    pub static_init: Option<Body>,
    pub methods: Vec<MethodDef>,
    pub span: Span,
}

impl ClassDef {
    pub fn name(&self) -> &QualifiedName {
        &self.entry.name
    }
}

/// The single constructor of a class: parameters become fields, then the
/// super constructor runs, then field initializers and init blocks.
#[derive(Debug, Clone)]
pub struct ConstructorDef {
    pub descriptor: MethodDescriptor,
    /// Parameter locals and the field each one is stored into.
    pub fields: Vec<(LocalId, String)>,
    pub super_args: Vec<Expr>,
    pub body: Body,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub access: AccessFlags,
    /// `None` for abstract methods.
    pub body: Option<Body>,
    pub span: Span,
}

impl MethodDef {
    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }
}

// ============================================================================
// Bodies and locals
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Param,
    /// A variable of an enclosing function, read-only here.
    Capture,
    Var,
}

#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub name: String,
    pub kind: LocalKind,
    /// Declared type; undeclared variables take the type of their first value.
    pub declared: Option<JvmType>,
    pub span: Span,
}

/// Code of one method, constructor, lambda or inner function.
#[derive(Debug, Clone, Default)]
pub struct Body {
    pub locals: Vec<LocalDecl>,
    pub params: Vec<LocalId>,
    pub stmts: Vec<Stmt>,
}

impl Body {
    pub fn local(&self, id: LocalId) -> &LocalDecl {
        &self.locals[id.0 as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InnerId(pub u32);

/// A function declared inside another body. It is compiled into a static
/// method taking the enclosing instance (if any), then its captured
/// variables, then its own parameters.
#[derive(Debug, Clone)]
pub struct InnerFnDef {
    pub id: InnerId,
    pub name: String,
    /// Locals of the declaring body, passed on every call.
    pub captures: Vec<Capture>,
    pub takes_self: bool,
    pub ret: JvmType,
    pub body: Body,
    pub span: Span,
}

/// One captured variable: the local outside and its stand-in inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    pub outer: LocalId,
    pub inner: LocalId,
}

#[derive(Debug, Clone)]
pub struct LambdaDef {
    pub captures: Vec<Capture>,
    pub body: Body,
    /// Whether the body is a bare expression; its value is the result.
    pub expression_body: bool,
    pub span: Span,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    /// First definition of a local.
    Let {
        local: LocalId,
        value: Option<Expr>,
        span: Span,
    },
    Assign {
        target: Place,
        /// `+=` and friends.
        op: Option<BinaryOp>,
        value: Expr,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    /// `for x in e`; `local` takes each element in turn.
    For {
        local: LocalId,
        iterable: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    Try {
        body: Vec<Stmt>,
        /// Local holding the caught value, and the handler body.
        catch: Option<(LocalId, Vec<Stmt>)>,
        finally: Option<Vec<Stmt>>,
        span: Span,
    },
    Synchronized {
        locks: Vec<Expr>,
        body: Vec<Stmt>,
        span: Span,
    },
    Throw {
        value: Expr,
        span: Span,
    },
    InnerFn(Box<InnerFnDef>),
    Break(Span),
    Continue(Span),
}

#[derive(Debug, Clone)]
pub enum Place {
    Local(LocalId),
    Field { target: Box<Expr>, name: String },
    StaticField { owner: QualifiedName, name: String },
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal, Span),
    Local(LocalId, Span),
    /// The enclosing class instance.
    This(Span),
    Field {
        target: Box<Expr>,
        name: String,
        span: Span,
    },
    StaticField {
        owner: QualifiedName,
        name: String,
        span: Span,
    },
    /// A type in value position: its class object.
    Type(QualifiedName, Span),
    Call {
        callee: Callee,
        args: Vec<Expr>,
        span: Span,
    },
    New {
        class: QualifiedName,
        args: Vec<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Cast {
        expr: Box<Expr>,
        ty: JvmType,
        span: Span,
    },
    Lambda(Box<LambdaDef>),
    List(Vec<Expr>, Span),
    Map(Vec<(Expr, Expr)>, Span),
}

#[derive(Debug, Clone)]
pub enum Callee {
    /// Instance method on a value.
    Method { target: Box<Expr>, name: String },
    Static { owner: QualifiedName, name: String },
    /// An inner function, with the current values of its captures.
    Inner { id: InnerId, captures: Vec<Expr> },
    /// A function object held in a value.
    Value(Box<Expr>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, span)
            | Expr::Local(_, span)
            | Expr::This(span)
            | Expr::Type(_, span)
            | Expr::List(_, span)
            | Expr::Map(_, span) => *span,
            Expr::Field { span, .. }
            | Expr::StaticField { span, .. }
            | Expr::Call { span, .. }
            | Expr::New { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Cast { span, .. } => *span,
            Expr::Lambda(lambda) => lambda.span,
        }
    }
}
