//! Name resolution.
//!
//! Imports are classified against the registry ([`ImportTable`]), simple
//! and qualified names are bound by [`NameResolver`], class headers are
//! built in [`headers`], and [`resolve`] lowers every body of a parsed unit
//! into the [`hir`](crate::hir) tree.

pub mod headers;
mod imports;
mod lower;
mod names;

pub use imports::{Import, ImportKind, ImportTable, ImportTarget};
pub use lower::BodyLowerer;
pub use names::{NameResolver, PathResolution, Want};

use latte_core::{JvmType, LatteError, MethodDescriptor, QualifiedName, ResolveError};
use latte_parser::{ClassDecl, CompilationUnit, FnBody, FnDecl, InterfaceDecl, Member, Modifiers, TypeDecl};
use latte_registry::{AccessFlags, ClassEntry};

use crate::hir::{Body, ClassDef, ConstructorDef, MethodDef, ResolvedUnit};
use headers::{class_parents, method_access, method_descriptor, param_type};

/// Lower every class of `unit`. Headers must already be registered.
///
/// Errors are collected per method, constructor and initializer so one
/// bad body does not hide the others.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve(name: &str, unit: &CompilationUnit, names: &NameResolver<'_>) -> Result<ResolvedUnit, Vec<LatteError>> {
    let mut errors = Vec::new();
    let mut classes = Vec::with_capacity(unit.types.len());

    for decl in &unit.types {
        let qn = QualifiedName::new(names.package().to_vec(), decl.name());
        let Some(entry) = names.registry().get(&qn).cloned() else {
            errors.push(ResolveError::unresolved(qn.dotted(), decl.span()).into());
            continue;
        };
        let class = match decl {
            TypeDecl::Class(class) => lower_class(class, entry, names, &mut errors),
            TypeDecl::Interface(iface) => lower_interface(iface, entry, names, &mut errors),
        };
        classes.push(class);
    }

    if errors.is_empty() {
        Ok(ResolvedUnit {
            name: name.to_string(),
            package: names.package().to_vec(),
            classes,
        })
    } else {
        Err(errors)
    }
}

fn lower_class(
    decl: &ClassDecl,
    entry: ClassEntry,
    names: &NameResolver<'_>,
    errors: &mut Vec<LatteError>,
) -> ClassDef {
    let qn = entry.name.clone();
    let mut next_inner = 0;

    let constructor = lower_constructor(decl, &qn, names, &mut next_inner)
        .map_err(|e| errors.push(e))
        .ok();
    let static_init = lower_static_init(decl, &qn, names, &mut next_inner)
        .map_err(|e| errors.push(e))
        .ok()
        .flatten();

    let mut methods = Vec::new();
    for method in decl.methods() {
        match lower_method(method, &qn, names, &mut next_inner) {
            Ok(def) => methods.push(def),
            Err(e) => errors.push(e),
        }
    }

    tracing::debug!(class = %qn.dotted(), methods = methods.len(), "resolved class");
    ClassDef {
        entry,
        constructor,
        static_init,
        methods,
        span: decl.span,
    }
}

fn lower_interface(
    decl: &InterfaceDecl,
    entry: ClassEntry,
    names: &NameResolver<'_>,
    errors: &mut Vec<LatteError>,
) -> ClassDef {
    let mut methods = Vec::with_capacity(decl.methods.len());
    for method in &decl.methods {
        match method_descriptor(method, names) {
            Ok(descriptor) => methods.push(MethodDef {
                name: method.name.clone(),
                descriptor,
                access: AccessFlags::PUBLIC | AccessFlags::ABSTRACT,
                body: None,
                span: method.span,
            }),
            Err(e) => errors.push(e.into()),
        }
    }
    ClassDef {
        entry,
        constructor: None,
        static_init: None,
        methods,
        span: decl.span,
    }
}

fn lower_method(
    method: &FnDecl,
    class: &QualifiedName,
    names: &NameResolver<'_>,
    next_inner: &mut u32,
) -> Result<MethodDef, LatteError> {
    let descriptor = method_descriptor(method, names)?;
    let mut access = method_access(method.modifiers);
    if method.is_abstract() {
        access |= AccessFlags::ABSTRACT;
    }

    let body = match &method.body {
        FnBody::None => None,
        body => {
            let mut lowerer = BodyLowerer::new(names, class, !method.is_static(), next_inner);
            let params = method
                .params
                .iter()
                .zip(&descriptor.params)
                .map(|(param, ty)| lowerer.declare_param(param, ty.clone()))
                .collect();
            let stmts = lowerer.fn_body(body, method.span)?;
            Some(lowerer.finish(params, stmts))
        }
    };

    Ok(MethodDef {
        name: method.name.clone(),
        descriptor,
        access,
        body,
        span: method.span,
    })
}

/// The super constructor runs first, then parameters are stored into their
/// fields, then instance field initializers and init blocks in member order.
fn lower_constructor(
    decl: &ClassDecl,
    class: &QualifiedName,
    names: &NameResolver<'_>,
    next_inner: &mut u32,
) -> Result<ConstructorDef, LatteError> {
    let parents = class_parents(decl, names)?;
    let mut lowerer = BodyLowerer::new(names, class, true, next_inner);

    let mut params = Vec::with_capacity(decl.params.len());
    let mut fields = Vec::with_capacity(decl.params.len());
    let mut param_types: Vec<JvmType> = Vec::with_capacity(decl.params.len());
    for param in &decl.params {
        let ty = param_type(param, names)?;
        let id = lowerer.declare_param(param, ty.clone());
        params.push(id);
        fields.push((id, param.name.clone()));
        param_types.push(ty);
    }

    let super_args = match parents.super_index.and_then(|i| decl.parents[i].args.as_ref()) {
        Some(args) => args.iter().map(|a| lowerer.expr(a)).collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let mut stmts = Vec::new();
    for member in &decl.members {
        match member {
            Member::Field(field) if !field.modifiers.contains(Modifiers::STATIC) => {
                if let Some(init) = &field.init {
                    stmts.push(lowerer.field_init(field, init, false)?);
                }
            }
            Member::Init(init) if !init.is_static => stmts.extend(lowerer.body_stmts(&init.body)?),
            _ => {}
        }
    }

    Ok(ConstructorDef {
        descriptor: MethodDescriptor::void(param_types),
        fields,
        super_args,
        body: lowerer.finish(params, stmts),
    })
}

fn lower_static_init(
    decl: &ClassDecl,
    class: &QualifiedName,
    names: &NameResolver<'_>,
    next_inner: &mut u32,
) -> Result<Option<Body>, LatteError> {
    let mut lowerer = BodyLowerer::new(names, class, false, next_inner);
    let mut stmts = Vec::new();
    let mut any = false;
    for member in &decl.members {
        match member {
            Member::Field(field) if field.modifiers.contains(Modifiers::STATIC) => {
                if let Some(init) = &field.init {
                    stmts.push(lowerer.field_init(field, init, true)?);
                    any = true;
                }
            }
            Member::Init(init) if init.is_static => {
                stmts.extend(lowerer.body_stmts(&init.body)?);
                any = true;
            }
            _ => {}
        }
    }
    Ok(any.then(|| lowerer.finish(Vec::new(), stmts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{Callee, Expr, LocalKind, Place, Stmt};
    use latte_core::{CodeGenError, ScannerMode};
    use latte_registry::ClassRegistry;

    fn lower(source: &str) -> Result<ResolvedUnit, Vec<LatteError>> {
        let unit = latte_parser::parse_source(source, ScannerMode::Indentation).unwrap();
        let package: Vec<String> = unit.package.as_ref().map(|p| p.segments.clone()).unwrap_or_default();
        let mut registry = ClassRegistry::with_builtins();
        for decl in &unit.types {
            registry.register(headers::skeleton(&package, decl)).unwrap();
        }
        let imports = ImportTable::build(&unit.imports, &["java.lang".to_string()], &registry).unwrap();
        let headers: Vec<ClassEntry> = {
            let names = NameResolver::new(&registry, &imports, &package);
            unit.types
                .iter()
                .map(|decl| {
                    let qn = QualifiedName::new(package.clone(), decl.name());
                    match decl {
                        TypeDecl::Class(c) => headers::class_header(qn, c, &names),
                        TypeDecl::Interface(i) => headers::interface_header(qn, i, &names),
                    }
                    .unwrap()
                })
                .collect()
        };
        for entry in headers {
            registry.replace(entry);
        }
        let names = NameResolver::new(&registry, &imports, &package);
        resolve("Test.lt", &unit, &names)
    }

    fn method_body<'u>(unit: &'u ResolvedUnit, name: &str) -> &'u Body {
        unit.classes[0]
            .methods
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.body.as_ref())
            .unwrap()
    }

    #[test]
    fn first_assignment_defines_a_local() {
        let unit = lower("class A\n    def f()\n        x = 1\n        x = 2\n        return x").unwrap();
        let body = method_body(&unit, "f");
        assert!(matches!(body.stmts[0], Stmt::Let { .. }));
        assert!(matches!(body.stmts[1], Stmt::Assign { target: Place::Local(_), op: None, .. }));
        assert_eq!(body.locals.len(), 1);
    }

    #[test]
    fn fields_and_methods_of_the_class_bind_to_this() {
        let unit = lower("class A(n:int)\n    def get() = n\n    def twice() = get() + n").unwrap();
        let body = method_body(&unit, "twice");
        let Stmt::Return { value: Some(Expr::Binary { left, right, .. }), .. } = &body.stmts[0] else {
            panic!("unexpected {:?}", body.stmts[0]);
        };
        assert!(matches!(left.as_ref(), Expr::Call { callee: Callee::Method { target, .. }, .. } if matches!(target.as_ref(), Expr::This(_))));
        assert!(matches!(right.as_ref(), Expr::Field { name, .. } if name == "n"));
    }

    #[test]
    fn qualified_and_imported_calls_are_static() {
        let unit = lower("class A\n    static\n        def f() = java::lang::Math.abs(1)\n        def g() = Math.abs(1)").unwrap();
        for name in ["f", "g"] {
            let body = method_body(&unit, name);
            assert!(matches!(
                &body.stmts[0],
                Stmt::Return { value: Some(Expr::Call { callee: Callee::Static { owner, name }, .. }), .. }
                    if owner.dotted() == "java.lang.Math" && name == "abs"
            ));
        }
    }

    #[test]
    fn system_out_println_is_a_method_on_a_static_field() {
        let unit = lower("class A\n    def f()\n        System.out.println(1)").unwrap();
        let body = method_body(&unit, "f");
        let Stmt::Expr(Expr::Call { callee: Callee::Method { target, name }, .. }) = &body.stmts[0] else {
            panic!("unexpected {:?}", body.stmts[0]);
        };
        assert_eq!(name, "println");
        assert!(matches!(target.as_ref(), Expr::StaticField { owner, name, .. } if owner.dotted() == "java.lang.System" && name == "out"));
    }

    #[test]
    fn lambdas_capture_outer_locals() {
        let unit = lower("class A\n    def f()\n        i = 1\n        g = (o) -> o + i\n        return g").unwrap();
        let body = method_body(&unit, "f");
        let Stmt::Let { value: Some(Expr::Lambda(lambda)), .. } = &body.stmts[1] else {
            panic!("unexpected {:?}", body.stmts[1]);
        };
        assert_eq!(lambda.captures.len(), 1);
        assert!(lambda.expression_body);
        let captured = lambda.body.local(lambda.captures[0].inner);
        assert_eq!(captured.kind, LocalKind::Capture);
        assert_eq!(captured.name, "i");
    }

    #[test]
    fn inner_functions_capture_what_they_use() {
        let unit = lower("class A\n    def f()\n        i = 1\n        j = 2\n        inner(k:int):int = i + k\n        return inner(3)")
            .unwrap();
        let body = method_body(&unit, "f");
        let Stmt::InnerFn(inner) = &body.stmts[2] else {
            panic!("unexpected {:?}", body.stmts[2]);
        };
        assert_eq!(inner.captures.len(), 1);
        assert!(inner.takes_self);
        let Stmt::Return { value: Some(Expr::Call { callee: Callee::Inner { captures, .. }, args, .. }), .. } = &body.stmts[3] else {
            panic!("unexpected {:?}", body.stmts[3]);
        };
        assert_eq!(captures.len(), 1);
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn loop_and_catch_variables_live_in_their_bodies() {
        let unit = lower(
            "class A\n    def f(xs)\n        for x in xs\n            System.out.println(x)\n        try\n            System.out.println(1)\n        catch e\n            System.out.println(e)\n        finally\n            System.out.println(2)",
        )
        .unwrap();
        let body = method_body(&unit, "f");
        let Stmt::For { local, body: loop_body, .. } = &body.stmts[0] else {
            panic!("unexpected {:?}", body.stmts[0]);
        };
        assert_eq!(body.local(*local).name, "x");
        assert_eq!(loop_body.len(), 1);
        let Stmt::Try { catch: Some((caught, handler)), finally: Some(finally), .. } = &body.stmts[1] else {
            panic!("unexpected {:?}", body.stmts[1]);
        };
        assert_eq!(body.local(*caught).declared, Some(JvmType::object()));
        assert_eq!(handler.len(), 1);
        assert_eq!(finally.len(), 1);

        let errors = lower("class A\n    def f(xs)\n        for x in xs\n            ...\n        return x").unwrap_err();
        assert!(matches!(errors[0], LatteError::Resolve(ResolveError::Unresolved { ref name, .. }) if name == "x"));
    }

    #[test]
    fn assigning_a_captured_variable_is_rejected() {
        let errors = lower("class A\n    def f()\n        i = 1\n        def g()\n            i = 2").unwrap_err();
        assert!(matches!(
            errors[0],
            LatteError::CodeGen(CodeGenError::CapturedAssignment { ref name, .. }) if name == "i"
        ));
    }

    #[test]
    fn constructor_runs_initializers_in_member_order() {
        let unit = lower("class A(a)\n    x = 1\n    System.out.println(x)\n    y = 2\n    static\n        Z = 3").unwrap();
        let class = &unit.classes[0];
        let ctor = class.constructor.as_ref().unwrap();
        assert_eq!(ctor.fields.len(), 1);
        assert_eq!(ctor.body.stmts.len(), 3);
        assert!(matches!(&ctor.body.stmts[0], Stmt::Assign { target: Place::Field { name, .. }, .. } if name == "x"));
        assert!(matches!(&ctor.body.stmts[1], Stmt::Expr(_)));
        let clinit = class.static_init.as_ref().unwrap();
        assert!(matches!(&clinit.stmts[0], Stmt::Assign { target: Place::StaticField { name, .. }, .. } if name == "Z"));
    }

    #[test]
    fn this_in_a_static_method_is_an_error() {
        let errors = lower("class A\n    static\n        def f() = this").unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unknown_names_are_reported_per_method() {
        let errors = lower("class A\n    def f() = nothing\n    def g() = alsoNothing").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, LatteError::Resolve(_))));
    }
}
