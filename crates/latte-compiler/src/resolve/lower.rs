//! AST → resolved tree.
//!
//! [`BodyLowerer`] walks one method, constructor or initializer body with a
//! [`LocalScope`] and binds every name it meets. Lexical bindings come
//! first (locals, captured variables, inner functions, members of the
//! enclosing class); anything else goes to the [`NameResolver`].

use latte_core::{CodeGenError, JvmType, LatteError, QualifiedName, ResolveError, Span};
use latte_parser as ast;
use latte_parser::{AssignOp, FnBody, LambdaBody};

use super::headers::{param_type, return_type};
use super::names::{NameResolver, Want};
use crate::hir::*;
use crate::scope::LocalScope;

type Result<T> = std::result::Result<T, LatteError>;

pub struct BodyLowerer<'n, 'a> {
    names: &'n NameResolver<'a>,
    class: &'n QualifiedName,
    scope: LocalScope,
    /// Inner function ids are unique within one top-level class.
    next_inner: &'n mut u32,
}

impl<'n, 'a> BodyLowerer<'n, 'a> {
    pub fn new(names: &'n NameResolver<'a>, class: &'n QualifiedName, has_self: bool, next_inner: &'n mut u32) -> Self {
        Self {
            names,
            class,
            scope: LocalScope::new(has_self),
            next_inner,
        }
    }

    pub fn declare_param(&mut self, param: &ast::Param, ty: JvmType) -> LocalId {
        self.scope.declare(&param.name, LocalKind::Param, Some(ty), param.span)
    }

    /// Lower the statements of a function body in the current scope.
    pub fn body_stmts(&mut self, stmts: &[ast::Stmt]) -> Result<Vec<Stmt>> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            self.stmt(stmt, &mut out)?;
        }
        Ok(out)
    }

    /// `= expr` bodies return their value.
    pub fn fn_body(&mut self, body: &FnBody, span: Span) -> Result<Vec<Stmt>> {
        match body {
            FnBody::Expr(expr) => Ok(vec![Stmt::Return {
                value: Some(self.expr(expr)?),
                span: expr.span(),
            }]),
            FnBody::Block(stmts) => self.body_stmts(stmts),
            FnBody::None => Err(CodeGenError::Unsupported {
                what: "a function without a body".into(),
                span,
            }
            .into()),
        }
    }

    /// Assignment of a field initializer, run by the constructor or the
    /// static initializer.
    pub fn field_init(&mut self, field: &ast::FieldDecl, value: &ast::Expr, is_static: bool) -> Result<Stmt> {
        let value = self.expr(value)?;
        let target = if is_static {
            Place::StaticField {
                owner: self.class.clone(),
                name: field.name.clone(),
            }
        } else {
            Place::Field {
                target: Box::new(Expr::This(field.span)),
                name: field.name.clone(),
            }
        };
        Ok(Stmt::Assign {
            target,
            op: None,
            value,
            span: field.span,
        })
    }

    pub fn finish(self, params: Vec<LocalId>, stmts: Vec<Stmt>) -> Body {
        Body {
            locals: self.scope.finish().locals,
            params,
            stmts,
        }
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn block(&mut self, stmts: &[ast::Stmt]) -> Result<Vec<Stmt>> {
        self.scope.push_scope();
        let lowered = self.body_stmts(stmts);
        self.scope.pop_scope();
        lowered
    }

    fn stmt(&mut self, stmt: &ast::Stmt, out: &mut Vec<Stmt>) -> Result<()> {
        let lowered = match stmt {
            ast::Stmt::Expr(expr) => Stmt::Expr(self.expr(expr)?),
            ast::Stmt::Local(local) => {
                let value = local.value.as_ref().map(|v| self.expr(v)).transpose()?;
                let declared = local.ty.as_ref().map(|t| self.names.resolve_type_ref(t)).transpose()?;
                let id = self.scope.declare(&local.name, LocalKind::Var, declared, local.span);
                Stmt::Let {
                    local: id,
                    value,
                    span: local.span,
                }
            }
            ast::Stmt::Assign(assign) => self.assign(assign)?,
            ast::Stmt::Return(ret) => Stmt::Return {
                value: ret.value.as_ref().map(|v| self.expr(v)).transpose()?,
                span: ret.span,
            },
            ast::Stmt::If(stmt) => {
                let mut branches = Vec::with_capacity(stmt.branches.len());
                for branch in &stmt.branches {
                    let cond = self.expr(&branch.cond)?;
                    branches.push((cond, self.block(&branch.body)?));
                }
                let else_body = stmt.else_body.as_ref().map(|b| self.block(b)).transpose()?;
                Stmt::If {
                    branches,
                    else_body,
                    span: stmt.span,
                }
            }
            ast::Stmt::While(stmt) => Stmt::While {
                cond: self.expr(&stmt.cond)?,
                body: self.block(&stmt.body)?,
                span: stmt.span,
            },
            ast::Stmt::For(stmt) => {
                let iterable = self.expr(&stmt.iterable)?;
                self.scope.push_scope();
                let local = self.scope.declare(&stmt.var, LocalKind::Var, None, stmt.span);
                let body = self.body_stmts(&stmt.body);
                self.scope.pop_scope();
                Stmt::For {
                    local,
                    iterable,
                    body: body?,
                    span: stmt.span,
                }
            }
            ast::Stmt::Try(stmt) => {
                let body = self.block(&stmt.body)?;
                let catch = match &stmt.catch {
                    Some(clause) => {
                        self.scope.push_scope();
                        let local = self.scope.declare(&clause.var, LocalKind::Var, Some(JvmType::object()), clause.span);
                        let body = self.body_stmts(&clause.body);
                        self.scope.pop_scope();
                        Some((local, body?))
                    }
                    None => None,
                };
                Stmt::Try {
                    body,
                    catch,
                    finally: stmt.finally.as_ref().map(|b| self.block(b)).transpose()?,
                    span: stmt.span,
                }
            }
            ast::Stmt::Synchronized(stmt) => Stmt::Synchronized {
                locks: stmt.locks.iter().map(|l| self.expr(l)).collect::<Result<_>>()?,
                body: self.block(&stmt.body)?,
                span: stmt.span,
            },
            ast::Stmt::Throw(stmt) => Stmt::Throw {
                value: self.expr(&stmt.value)?,
                span: stmt.span,
            },
            ast::Stmt::InnerFn(decl) => Stmt::InnerFn(Box::new(self.inner_fn(decl)?)),
            ast::Stmt::Break(span) => Stmt::Break(*span),
            ast::Stmt::Continue(span) => Stmt::Continue(*span),
            ast::Stmt::Pass(_) => return Ok(()),
        };
        out.push(lowered);
        Ok(())
    }

    fn assign(&mut self, assign: &ast::AssignStmt) -> Result<Stmt> {
        let value = self.expr(&assign.value)?;

        // `x = e` with nothing called `x` in sight defines a local.
        if let ast::Expr::Name(name) = &assign.target
            && assign.op == AssignOp::Assign
            && !self.is_bound(&name.name, name.span)
        {
            let id = self.scope.declare(&name.name, LocalKind::Var, None, name.span);
            return Ok(Stmt::Let {
                local: id,
                value: Some(value),
                span: assign.span,
            });
        }

        let target = match self.expr(&assign.target)? {
            Expr::Local(id, span) => {
                let local = self.scope.local(id);
                if local.kind == LocalKind::Capture {
                    return Err(CodeGenError::CapturedAssignment {
                        name: local.name.clone(),
                        span,
                    }
                    .into());
                }
                Place::Local(id)
            }
            Expr::Field { target, name, .. } => Place::Field { target, name },
            Expr::StaticField { owner, name, .. } => Place::StaticField { owner, name },
            other => return Err(CodeGenError::InvalidAssignment { span: other.span() }.into()),
        };
        Ok(Stmt::Assign {
            target,
            op: assign.op.binary(),
            value,
            span: assign.span,
        })
    }

    /// Whether assigning to `name` would hit an existing binding.
    fn is_bound(&self, name: &str, span: Span) -> bool {
        self.is_lexical(name)
            || !matches!(
                self.names.resolve_simple(name, span, Want::Any),
                Err(ResolveError::Unresolved { .. })
            )
    }

    /// Locals, captures and fields of the enclosing class.
    fn is_lexical(&self, name: &str) -> bool {
        self.scope.is_visible(name) || self.own_field(name).is_some()
    }

    fn own_field(&self, name: &str) -> Option<bool> {
        self.names
            .registry()
            .find_field(self.class, name)
            .map(|(_, field)| field.is_static())
    }

    // ==========================================================================
    // Inner functions and lambdas
    // ==========================================================================

    fn inner_fn(&mut self, decl: &ast::FnDecl) -> Result<InnerFnDef> {
        let id = InnerId(*self.next_inner);
        *self.next_inner += 1;

        let captures = self.free_variables(decl);
        self.scope.declare_function(&decl.name, id, captures.clone());
        let ret = return_type(decl, self.names)?;
        let takes_self = self.scope.has_self();

        self.scope.enter_function();
        let lowered = self.inner_fn_body(decl, &captures);
        let frame = self.scope.exit_function();
        let (params, stmts) = lowered?;

        tracing::trace!(name = %decl.name, captures = frame.captures.len(), "lowered inner function");
        Ok(InnerFnDef {
            id,
            name: decl.name.clone(),
            captures: frame.captures,
            takes_self,
            ret,
            body: Body {
                locals: frame.locals,
                params,
                stmts,
            },
            span: decl.span,
        })
    }

    fn inner_fn_body(&mut self, decl: &ast::FnDecl, captures: &[String]) -> Result<(Vec<LocalId>, Vec<Stmt>)> {
        for name in captures {
            self.scope.capture(name);
        }
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let ty = param_type(param, self.names)?;
            params.push(self.declare_param(param, ty));
        }
        let stmts = self.fn_body(&decl.body, decl.span)?;
        Ok((params, stmts))
    }

    /// Variables of the enclosing functions an inner function uses, in
    /// order of first use. Calls to other inner functions contribute their
    /// own captures, since those are passed along at the call.
    fn free_variables(&self, decl: &ast::FnDecl) -> Vec<String> {
        let mut used = Vec::new();
        match &decl.body {
            FnBody::Expr(expr) => collect_expr(expr, &mut used),
            FnBody::Block(stmts) => collect_stmts(stmts, &mut used),
            FnBody::None => {}
        }

        let mut free: Vec<String> = Vec::new();
        let push = |name: &str, free: &mut Vec<String>| {
            if !decl.params.iter().any(|p| p.name == name) && !free.iter().any(|f| f == name) {
                free.push(name.to_string());
            }
        };
        for name in &used {
            if self.scope.is_visible(name) {
                push(name, &mut free);
            }
            if let Some(called) = self.scope.lookup_function(name) {
                for captured in &called.captures {
                    push(captured, &mut free);
                }
            }
        }
        free
    }

    fn lambda(&mut self, lambda: &ast::LambdaExpr) -> Result<Expr> {
        self.scope.enter_function();
        let lowered = self.lambda_body(lambda);
        let frame = self.scope.exit_function();
        let (params, stmts, expression_body) = lowered?;

        Ok(Expr::Lambda(Box::new(LambdaDef {
            captures: frame.captures,
            body: Body {
                locals: frame.locals,
                params,
                stmts,
            },
            expression_body,
            span: lambda.span,
        })))
    }

    fn lambda_body(&mut self, lambda: &ast::LambdaExpr) -> Result<(Vec<LocalId>, Vec<Stmt>, bool)> {
        let mut params = Vec::with_capacity(lambda.params.len());
        for param in &lambda.params {
            let declared = param.ty.as_ref().map(|t| self.names.resolve_type_ref(t)).transpose()?;
            params.push(self.scope.declare(&param.name, LocalKind::Param, declared, param.span));
        }
        match &lambda.body {
            LambdaBody::Expr(expr) => {
                let value = self.expr(expr)?;
                let span = value.span();
                Ok((
                    params,
                    vec![Stmt::Return {
                        value: Some(value),
                        span,
                    }],
                    true,
                ))
            }
            LambdaBody::Block(stmts) => Ok((params, self.body_stmts(stmts)?, false)),
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    pub fn expr(&mut self, expr: &ast::Expr) -> Result<Expr> {
        Ok(match expr {
            ast::Expr::Literal(lit) => Expr::Literal(lit.value.clone(), lit.span),
            ast::Expr::Name(name) => self.name_value(&name.name, name.span)?,
            ast::Expr::Path(path) => self.path_value(&path.segments, path.span)?,
            ast::Expr::This(span) => self.this(*span)?,
            ast::Expr::Field(field) => match self.unbound_path(expr) {
                Some(segments) => self.path_value(&segments, field.span)?,
                None => Expr::Field {
                    target: Box::new(self.expr(&field.target)?),
                    name: field.name.clone(),
                    span: field.span,
                },
            },
            ast::Expr::Call(call) => self.call(call)?,
            ast::Expr::New(new) => {
                let class = match &new.ty {
                    ast::TypeRef::Named(path) => self.names.resolve_type_path(path)?,
                    other => {
                        return Err(CodeGenError::Unsupported {
                            what: format!("constructing '{other}'"),
                            span: new.span,
                        }
                        .into());
                    }
                };
                Expr::New {
                    class,
                    args: self.exprs(&new.args)?,
                    span: new.span,
                }
            }
            ast::Expr::Unary(unary) => Expr::Unary {
                op: unary.op,
                operand: Box::new(self.expr(&unary.operand)?),
                span: unary.span,
            },
            ast::Expr::Binary(binary) => Expr::Binary {
                op: binary.op,
                left: Box::new(self.expr(&binary.left)?),
                right: Box::new(self.expr(&binary.right)?),
                span: binary.span,
            },
            ast::Expr::Cast(cast) => Expr::Cast {
                expr: Box::new(self.expr(&cast.expr)?),
                ty: self.names.resolve_type_ref(&cast.ty)?,
                span: cast.span,
            },
            ast::Expr::Lambda(lambda) => self.lambda(lambda)?,
            ast::Expr::List(list) => Expr::List(self.exprs(&list.items)?, list.span),
            ast::Expr::Map(map) => {
                let mut entries = Vec::with_capacity(map.entries.len());
                for (key, value) in &map.entries {
                    entries.push((self.expr(key)?, self.expr(value)?));
                }
                Expr::Map(entries, map.span)
            }
        })
    }

    fn exprs(&mut self, exprs: &[ast::Expr]) -> Result<Vec<Expr>> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    fn this(&self, span: Span) -> Result<Expr> {
        if self.scope.has_self() {
            Ok(Expr::This(span))
        } else {
            Err(CodeGenError::Unsupported {
                what: "'this' in a static context".into(),
                span,
            }
            .into())
        }
    }

    /// The segments of `a.b.c` when `a` is not a lexical name, so the chain
    /// may be a qualified type or static member.
    fn unbound_path(&self, expr: &ast::Expr) -> Option<Vec<String>> {
        let segments = expr.as_path_segments()?;
        let first = segments.first()?;
        (!self.is_lexical(first)).then_some(segments)
    }

    fn name_value(&mut self, name: &str, span: Span) -> Result<Expr> {
        if let Some(id) = self.scope.lookup(name) {
            return Ok(Expr::Local(id, span));
        }
        if let Some(is_static) = self.own_field(name) {
            return self.own_field_value(name, is_static, span);
        }
        Ok(match self.names.resolve_simple(name, span, Want::Any)? {
            ResolvedSymbol::Type(ty) => Expr::Type(ty, span),
            ResolvedSymbol::StaticMember { owner, member } => Expr::StaticField {
                owner,
                name: member,
                span,
            },
        })
    }

    fn own_field_value(&self, name: &str, is_static: bool, span: Span) -> Result<Expr> {
        if is_static {
            return Ok(Expr::StaticField {
                owner: self.class.clone(),
                name: name.to_string(),
                span,
            });
        }
        if !self.scope.has_self() {
            return Err(CodeGenError::Unsupported {
                what: format!("instance field '{name}' in a static context"),
                span,
            }
            .into());
        }
        Ok(Expr::Field {
            target: Box::new(Expr::This(span)),
            name: name.to_string(),
            span,
        })
    }

    fn path_value(&mut self, segments: &[String], span: Span) -> Result<Expr> {
        let resolved = self.names.resolve_path(segments, span)?;
        Ok(member_chain(resolved.symbol, &resolved.rest, span))
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    fn call(&mut self, call: &ast::CallExpr) -> Result<Expr> {
        let args = self.exprs(&call.args)?;
        let span = call.span;

        let callee = match call.callee.as_ref() {
            ast::Expr::Name(name) => return self.call_name(&name.name, args, span),
            callee @ (ast::Expr::Path(_) | ast::Expr::Field(_)) => match self.unbound_path(callee) {
                Some(segments) => return self.call_path(&segments, args, span),
                None => match callee {
                    ast::Expr::Field(field) => Callee::Method {
                        target: Box::new(self.expr(&field.target)?),
                        name: field.name.clone(),
                    },
                    other => Callee::Value(Box::new(self.expr(other)?)),
                },
            },
            other => Callee::Value(Box::new(self.expr(other)?)),
        };
        Ok(Expr::Call { callee, args, span })
    }

    fn call_name(&mut self, name: &str, args: Vec<Expr>, span: Span) -> Result<Expr> {
        if let Some(inner) = self.scope.lookup_function(name) {
            let captures = inner
                .captures
                .iter()
                .map(|captured| self.name_value(captured, span))
                .collect::<Result<_>>()?;
            return Ok(Expr::Call {
                callee: Callee::Inner { id: inner.id, captures },
                args,
                span,
            });
        }
        if let Some(id) = self.scope.lookup(name) {
            return Ok(Expr::Call {
                callee: Callee::Value(Box::new(Expr::Local(id, span))),
                args,
                span,
            });
        }
        if let Some(callee) = self.own_method(name, span)? {
            return Ok(Expr::Call { callee, args, span });
        }
        if let Some(is_static) = self.own_field(name) {
            let value = self.own_field_value(name, is_static, span)?;
            return Ok(Expr::Call {
                callee: Callee::Value(Box::new(value)),
                args,
                span,
            });
        }

        Ok(match self.names.resolve_simple(name, span, Want::Any)? {
            ResolvedSymbol::Type(class) => Expr::New { class, args, span },
            ResolvedSymbol::StaticMember { owner, member } => Expr::Call {
                callee: Callee::Static { owner, name: member },
                args,
                span,
            },
        })
    }

    /// A method of the enclosing class or its supertypes.
    fn own_method(&self, name: &str, span: Span) -> Result<Option<Callee>> {
        let methods = self.names.registry().find_methods(self.class, name);
        if methods.is_empty() {
            return Ok(None);
        }
        let has_instance = methods.iter().any(|(_, m)| !m.is_static());
        if has_instance && self.scope.has_self() {
            return Ok(Some(Callee::Method {
                target: Box::new(Expr::This(span)),
                name: name.to_string(),
            }));
        }
        if methods.iter().any(|(_, m)| m.is_static()) {
            return Ok(Some(Callee::Static {
                owner: self.class.clone(),
                name: name.to_string(),
            }));
        }
        Err(CodeGenError::Unsupported {
            what: format!("instance method '{name}' in a static context"),
            span,
        }
        .into())
    }

    /// `a.b.C(args)`, `C.m(args)`, `C.f.m(args)`.
    fn call_path(&mut self, segments: &[String], args: Vec<Expr>, span: Span) -> Result<Expr> {
        let resolved = self.names.resolve_path(segments, span)?;
        let callee = match (resolved.symbol, resolved.rest.as_slice()) {
            (ResolvedSymbol::Type(class), []) => return Ok(Expr::New { class, args, span }),
            (ResolvedSymbol::Type(owner), [name]) => Callee::Static {
                owner,
                name: name.clone(),
            },
            (ResolvedSymbol::StaticMember { owner, member }, []) => Callee::Static { owner, name: member },
            (symbol, [path @ .., name]) => Callee::Method {
                target: Box::new(member_chain(symbol, path, span)),
                name: name.clone(),
            },
        };
        Ok(Expr::Call { callee, args, span })
    }
}

/// The value of `symbol` followed by member accesses.
fn member_chain(symbol: ResolvedSymbol, rest: &[String], span: Span) -> Expr {
    let (mut expr, rest) = match (symbol, rest) {
        (ResolvedSymbol::Type(owner), [first, rest @ ..]) => (
            Expr::StaticField {
                owner,
                name: first.clone(),
                span,
            },
            rest,
        ),
        (ResolvedSymbol::Type(ty), []) => (Expr::Type(ty, span), rest),
        (ResolvedSymbol::StaticMember { owner, member }, rest) => (
            Expr::StaticField {
                owner,
                name: member,
                span,
            },
            rest,
        ),
    };
    for name in rest {
        expr = Expr::Field {
            target: Box::new(expr),
            name: name.clone(),
            span,
        };
    }
    expr
}

// ==========================================================================
// Free names
// ==========================================================================

fn collect_stmts(stmts: &[ast::Stmt], out: &mut Vec<String>) {
    for stmt in stmts {
        match stmt {
            ast::Stmt::Expr(e) => collect_expr(e, out),
            ast::Stmt::Local(s) => {
                if let Some(value) = &s.value {
                    collect_expr(value, out);
                }
            }
            ast::Stmt::Assign(s) => {
                collect_expr(&s.target, out);
                collect_expr(&s.value, out);
            }
            ast::Stmt::Return(s) => {
                if let Some(value) = &s.value {
                    collect_expr(value, out);
                }
            }
            ast::Stmt::If(s) => {
                for branch in &s.branches {
                    collect_expr(&branch.cond, out);
                    collect_stmts(&branch.body, out);
                }
                if let Some(body) = &s.else_body {
                    collect_stmts(body, out);
                }
            }
            ast::Stmt::While(s) => {
                collect_expr(&s.cond, out);
                collect_stmts(&s.body, out);
            }
            ast::Stmt::For(s) => {
                collect_expr(&s.iterable, out);
                collect_stmts(&s.body, out);
            }
            ast::Stmt::Try(s) => {
                collect_stmts(&s.body, out);
                if let Some(catch) = &s.catch {
                    collect_stmts(&catch.body, out);
                }
                if let Some(body) = &s.finally {
                    collect_stmts(body, out);
                }
            }
            ast::Stmt::Synchronized(s) => {
                s.locks.iter().for_each(|l| collect_expr(l, out));
                collect_stmts(&s.body, out);
            }
            ast::Stmt::Throw(s) => collect_expr(&s.value, out),
            ast::Stmt::InnerFn(f) => match &f.body {
                FnBody::Expr(e) => collect_expr(e, out),
                FnBody::Block(b) => collect_stmts(b, out),
                FnBody::None => {}
            },
            ast::Stmt::Break(_) | ast::Stmt::Continue(_) | ast::Stmt::Pass(_) => {}
        }
    }
}

fn collect_expr(expr: &ast::Expr, out: &mut Vec<String>) {
    match expr {
        ast::Expr::Name(n) => out.push(n.name.clone()),
        ast::Expr::Path(p) => out.extend(p.segments.first().cloned()),
        ast::Expr::Literal(_) | ast::Expr::This(_) => {}
        ast::Expr::Field(f) => collect_expr(&f.target, out),
        ast::Expr::Call(c) => {
            collect_expr(&c.callee, out);
            c.args.iter().for_each(|a| collect_expr(a, out));
        }
        ast::Expr::New(n) => n.args.iter().for_each(|a| collect_expr(a, out)),
        ast::Expr::Unary(u) => collect_expr(&u.operand, out),
        ast::Expr::Binary(b) => {
            collect_expr(&b.left, out);
            collect_expr(&b.right, out);
        }
        ast::Expr::Cast(c) => collect_expr(&c.expr, out),
        ast::Expr::Lambda(l) => match &l.body {
            LambdaBody::Expr(e) => collect_expr(e, out),
            LambdaBody::Block(b) => collect_stmts(b, out),
        },
        ast::Expr::List(l) => l.items.iter().for_each(|i| collect_expr(i, out)),
        ast::Expr::Map(m) => {
            for (k, v) in &m.entries {
                collect_expr(k, out);
                collect_expr(v, out);
            }
        }
    }
}
