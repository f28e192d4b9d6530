//! Class headers.
//!
//! Headers are built in two steps so that units of one batch can refer to
//! each other in any order:
//!
//! 1. [`skeleton`] registers every declared class with its name and kind
//!    only, so imports and type names can already be resolved.
//! 2. [`class_header`] / [`interface_header`] resolve parents, fields and
//!    method signatures; the result replaces the skeleton in the registry.
//!
//! Signature rules:
//! - an untyped parameter or field is `java.lang.Object`
//! - `Unit` is `void`
//! - a method with an expression body and no declared return type returns
//!   `java.lang.Object`; with a block body it returns `void` unless some
//!   `return` carries a value
//! - class parameters become fields and the parameters of the single
//!   constructor

use latte_core::{CodeGenError, JvmType, LatteError, MethodDescriptor, QualifiedName, ResolveError, Span};
use latte_parser::{ClassDecl, FnBody, FnDecl, InterfaceDecl, Modifiers, Param, Stmt, TypeDecl};
use latte_registry::{AccessFlags, ClassEntry, FieldEntry, MethodEntry};

use super::names::NameResolver;

/// Name and kind of a declared type, without members.
pub fn skeleton(package: &[String], decl: &TypeDecl) -> ClassEntry {
    let name = QualifiedName::new(package.to_vec(), decl.name());
    match decl {
        TypeDecl::Class(_) => ClassEntry::class(name),
        TypeDecl::Interface(_) => ClassEntry::interface(name),
    }
}

/// Parents of a class split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parents {
    pub super_class: Option<QualifiedName>,
    /// Index into `ClassDecl::parents` of the super class.
    pub super_index: Option<usize>,
    pub interfaces: Vec<QualifiedName>,
}

pub fn class_parents(decl: &ClassDecl, names: &NameResolver<'_>) -> Result<Parents, LatteError> {
    let mut parents = Parents::default();
    for (index, parent) in decl.parents.iter().enumerate() {
        let ty = names.resolve_type_path(&parent.ty)?;
        let is_interface = names.registry().get(&ty).is_some_and(ClassEntry::is_interface);
        if is_interface {
            parents.interfaces.push(ty);
        } else if parents.super_class.is_none() {
            parents.super_class = Some(ty);
            parents.super_index = Some(index);
        } else {
            return Err(CodeGenError::Unsupported {
                what: format!("a second super class '{}'", parent.ty),
                span: parent.span,
            }
            .into());
        }
    }
    Ok(parents)
}

pub fn class_header(
    name: QualifiedName,
    decl: &ClassDecl,
    names: &NameResolver<'_>,
) -> Result<ClassEntry, LatteError> {
    let parents = class_parents(decl, names)?;
    let mut entry = ClassEntry::class(name).with_super(Some(
        parents
            .super_class
            .unwrap_or_else(|| QualifiedName::parse("java.lang.Object")),
    ));
    entry.interfaces = parents.interfaces;
    if decl.modifiers.contains(Modifiers::FINAL) {
        entry.access |= AccessFlags::FINAL;
    }

    let mut ctor_params = Vec::with_capacity(decl.params.len());
    for param in &decl.params {
        let ty = param_type(param, names)?;
        ctor_params.push(ty.clone());
        entry.fields.push(FieldEntry::new(&param.name, ty, field_access(param.modifiers)));
    }
    for field in decl.fields() {
        let ty = match &field.ty {
            Some(ty) => names.resolve_type_ref(ty)?,
            None => JvmType::object(),
        };
        if entry.field(&field.name).is_some() {
            return Err(duplicate(&format!("field '{}'", field.name), field.span));
        }
        entry.fields.push(FieldEntry::new(&field.name, ty, field_access(field.modifiers)));
    }

    entry.methods.push(MethodEntry::new(
        "<init>",
        MethodDescriptor::void(ctor_params),
        AccessFlags::PUBLIC,
    ));
    for method in decl.methods() {
        let descriptor = method_descriptor(method, names)?;
        let mut access = method_access(method.modifiers);
        if method.is_abstract() {
            access |= AccessFlags::ABSTRACT;
            entry.access |= AccessFlags::ABSTRACT;
        }
        let method_entry = MethodEntry::new(&method.name, descriptor, access);
        if entry.methods.iter().any(|m| m.same_signature(&method_entry)) {
            return Err(duplicate(&format!("method '{}{}'", method.name, method_entry.descriptor), method.span));
        }
        entry.methods.push(method_entry);
    }
    if decl.modifiers.contains(Modifiers::ABSTRACT) {
        entry.access |= AccessFlags::ABSTRACT;
    }
    Ok(entry)
}

pub fn interface_header(
    name: QualifiedName,
    decl: &InterfaceDecl,
    names: &NameResolver<'_>,
) -> Result<ClassEntry, LatteError> {
    let mut entry = ClassEntry::interface(name);
    for parent in &decl.parents {
        entry.interfaces.push(names.resolve_type_path(parent)?);
    }
    for method in &decl.methods {
        if method.is_static() {
            return Err(CodeGenError::Unsupported {
                what: format!("static interface method '{}'", method.name),
                span: method.span,
            }
            .into());
        }
        let descriptor = method_descriptor(method, names)?;
        let method_entry = MethodEntry::new(&method.name, descriptor, AccessFlags::PUBLIC | AccessFlags::ABSTRACT);
        if entry.methods.iter().any(|m| m.same_signature(&method_entry)) {
            return Err(duplicate(&format!("method '{}{}'", method.name, method_entry.descriptor), method.span));
        }
        entry.methods.push(method_entry);
    }
    Ok(entry)
}

fn duplicate(what: &str, span: Span) -> LatteError {
    CodeGenError::Unsupported {
        what: format!("a second definition of {what}"),
        span,
    }
    .into()
}

// ==========================================================================
// Signatures
// ==========================================================================

pub fn param_type(param: &Param, names: &NameResolver<'_>) -> Result<JvmType, ResolveError> {
    match &param.ty {
        Some(ty) => names.resolve_type_ref(ty),
        None => Ok(JvmType::object()),
    }
}

pub fn method_descriptor(method: &FnDecl, names: &NameResolver<'_>) -> Result<MethodDescriptor, ResolveError> {
    let params = method
        .params
        .iter()
        .map(|p| param_type(p, names))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MethodDescriptor::new(params, return_type(method, names)?))
}

pub fn return_type(method: &FnDecl, names: &NameResolver<'_>) -> Result<JvmType, ResolveError> {
    if let Some(ty) = &method.ret {
        return names.resolve_type_ref(ty);
    }
    Ok(match &method.body {
        FnBody::Expr(_) => JvmType::object(),
        FnBody::Block(stmts) if returns_value(stmts) => JvmType::object(),
        FnBody::Block(_) => JvmType::Void,
        FnBody::None => JvmType::object(),
    })
}

/// Whether some `return` in `stmts` carries a value. Nested functions and
/// lambdas are not looked into.
pub fn returns_value(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Stmt::Return(ret) => ret.value.is_some(),
        Stmt::If(s) => {
            s.branches.iter().any(|b| returns_value(&b.body)) || s.else_body.as_deref().is_some_and(returns_value)
        }
        Stmt::While(s) => returns_value(&s.body),
        Stmt::For(s) => returns_value(&s.body),
        Stmt::Try(s) => {
            returns_value(&s.body)
                || s.catch.as_ref().is_some_and(|c| returns_value(&c.body))
                || s.finally.as_deref().is_some_and(returns_value)
        }
        Stmt::Synchronized(s) => returns_value(&s.body),
        _ => false,
    })
}

/// Methods are public unless marked otherwise.
pub fn method_access(modifiers: Modifiers) -> AccessFlags {
    let mut access = if modifiers.contains(Modifiers::PRIVATE) {
        AccessFlags::PRIVATE
    } else if modifiers.contains(Modifiers::PROTECTED) {
        AccessFlags::PROTECTED
    } else {
        AccessFlags::PUBLIC
    };
    if modifiers.contains(Modifiers::STATIC) {
        access |= AccessFlags::STATIC;
    }
    if modifiers.contains(Modifiers::FINAL) {
        access |= AccessFlags::FINAL;
    }
    if modifiers.contains(Modifiers::SYNCHRONIZED) {
        access |= AccessFlags::SYNCHRONIZED;
    }
    access
}

/// Fields are package-private unless marked otherwise.
pub fn field_access(modifiers: Modifiers) -> AccessFlags {
    let mut access = if modifiers.contains(Modifiers::PUBLIC) {
        AccessFlags::PUBLIC
    } else if modifiers.contains(Modifiers::PRIVATE) {
        AccessFlags::PRIVATE
    } else if modifiers.contains(Modifiers::PROTECTED) {
        AccessFlags::PROTECTED
    } else {
        AccessFlags::empty()
    };
    if modifiers.contains(Modifiers::STATIC) {
        access |= AccessFlags::STATIC;
    }
    if modifiers.contains(Modifiers::VOLATILE) {
        access |= AccessFlags::VOLATILE;
    }
    if modifiers.contains(Modifiers::TRANSIENT) {
        access |= AccessFlags::TRANSIENT;
    }
    access
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::imports::ImportTable;
    use latte_core::{PrimitiveKind, ScannerMode};
    use latte_parser::parse_source;
    use latte_registry::ClassRegistry;

    fn header(source: &str) -> Result<ClassEntry, LatteError> {
        let unit = parse_source(source, ScannerMode::Indentation).unwrap();
        let mut registry = ClassRegistry::with_builtins();
        for decl in &unit.types {
            registry.register(skeleton(&[], decl)).unwrap();
        }
        let imports = ImportTable::build(&[], &["java.lang".to_string()], &registry).unwrap();
        let names = NameResolver::new(&registry, &imports, &[]);
        match &unit.types[0] {
            TypeDecl::Class(c) => class_header(QualifiedName::simple(&c.name), c, &names),
            TypeDecl::Interface(i) => interface_header(QualifiedName::simple(&i.name), i, &names),
        }
    }

    fn descriptor(entry: &ClassEntry, name: &str) -> String {
        entry.methods_named(name).next().unwrap().descriptor.to_string()
    }

    #[test]
    fn primitive_signatures_are_kept() {
        let entry = header("class T\n  def f_short(s:short):short = s\n  def f_bool(b:bool):bool = b").unwrap();
        assert_eq!(descriptor(&entry, "f_short"), "(S)S");
        assert_eq!(descriptor(&entry, "f_bool"), "(Z)Z");
    }

    #[test]
    fn inferred_signatures() {
        let entry = header(
            "class T\n  def a(x) = x\n  def b()\n    println(1)\n  def c(x)\n    return x\n  def d():Unit = println(1)",
        )
        .unwrap();
        assert_eq!(descriptor(&entry, "a"), "(Ljava/lang/Object;)Ljava/lang/Object;");
        assert_eq!(descriptor(&entry, "b"), "()V");
        assert_eq!(descriptor(&entry, "c"), "(Ljava/lang/Object;)Ljava/lang/Object;");
        assert_eq!(descriptor(&entry, "d"), "()V");
        assert!(entry.methods_named("a").next().unwrap().access.contains(AccessFlags::PUBLIC));
    }

    #[test]
    fn returns_inside_loops_and_handlers_make_a_result() {
        let entry = header(
            "class T\n  def a(xs)\n    for x in xs\n      return x\n  def b()\n    try\n      println(1)\n    catch e\n      return e\n  def c()\n    try\n      println(1)\n    finally\n      println(2)",
        )
        .unwrap();
        assert_eq!(descriptor(&entry, "a"), "(Ljava/lang/Object;)Ljava/lang/Object;");
        assert_eq!(descriptor(&entry, "b"), "()Ljava/lang/Object;");
        assert_eq!(descriptor(&entry, "c"), "()V");
    }

    #[test]
    fn class_parameters_become_fields_and_constructor() {
        let entry = header("class P(x:int, public y)\n  z:long = 1").unwrap();
        assert_eq!(entry.fields.len(), 3);
        assert_eq!(entry.fields[0].ty, JvmType::Primitive(PrimitiveKind::Int));
        assert!(entry.fields[1].access.contains(AccessFlags::PUBLIC));
        assert!(entry.fields[0].access.is_empty());
        let ctor = entry.constructors().next().unwrap();
        assert_eq!(ctor.descriptor.to_string(), "(ILjava/lang/Object;)V");
    }

    #[test]
    fn parents_split_into_super_and_interfaces() {
        let entry = header("class R : Thread, java::io::Serializable\n  def run():Unit\n    ...").unwrap();
        assert_eq!(entry.super_class, Some(QualifiedName::parse("java.lang.Thread")));
        assert_eq!(entry.interfaces, vec![QualifiedName::parse("java.io.Serializable")]);
    }

    #[test]
    fn abstract_methods_make_the_class_abstract() {
        let entry = header("class A\n  abstract f(x:int):int").unwrap();
        assert!(entry.is_abstract());
        assert!(entry.methods_named("f").next().unwrap().is_abstract());
    }

    #[test]
    fn interface_methods_are_public_abstract() {
        let entry = header("interface IntParamReturnInt\n  def x(i:int):int").unwrap();
        assert!(entry.is_interface());
        let method = entry.methods_named("x").next().unwrap();
        assert!(method.is_abstract());
        assert_eq!(method.descriptor.to_string(), "(I)I");
    }

    #[test]
    fn unknown_parameter_types_are_unresolved() {
        let error = header("class T\n  def f(x:Nope) = x").unwrap_err();
        assert!(matches!(error, LatteError::Resolve(ResolveError::Unresolved { .. })));
    }

    #[test]
    fn duplicate_methods_are_rejected() {
        assert!(header("class T\n  def f(x:int) = x\n  def f(y:int) = y").is_err());
    }
}
