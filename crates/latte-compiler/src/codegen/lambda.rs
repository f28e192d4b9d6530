//! Lambda classes.
//!
//! Every lambda becomes its own class implementing (or extending) its
//! target type:
//!
//! ```text
//! final class A$Latte$Lambda$0 implements java.util.function.IntUnaryOperator {
//!     public final A self;
//!     public final int k;                       // one field per capture
//!     A$Latte$Lambda$0(A self, int k)
//!     public int applyAsInt(int x)              // adapter: box, call, unbox
//!     public Object lambda$body(Object x)       // the lambda's code
//! }
//! ```
//!
//! The target method boxes its arguments into `lambda$body` and converts the
//! `Object` result back following the [`AdapterPlan`] for its shape. Inside
//! `lambda$body`, `this` refers to the enclosing instance through `self`.

use latte_core::{CodeGenError, JvmType, MethodDescriptor, OBJECT, QualifiedName, Span};
use latte_registry::AccessFlags;

use super::adapter_cache::{AdapterKey, AdapterPlan, ResultAdapter};
use super::function::{FnGen, FnMode, LocalSlot};
use super::{ClassShared, GeneratedClass, LT_RUNTIME, Result, dotted};
use crate::bytecode::{ClassWriter, Opcode};
use crate::emit::{InvokeKind, MethodEmitter};
use crate::hir::{Body, LambdaDef};

const BODY_METHOD: &str = "lambda$body";
const SELF_FIELD: &str = "self";

/// The type a lambda implements and the method it overrides.
#[derive(Debug, Clone)]
struct LambdaTarget {
    super_name: String,
    interface: Option<String>,
    method: String,
    sam: MethodDescriptor,
}

/// Everything needed to emit one lambda class.
struct LambdaClass<'l> {
    name: String,
    target: LambdaTarget,
    plan: AdapterPlan,
    self_ty: Option<JvmType>,
    /// Field name and type per capture.
    captures: Vec<(String, JvmType)>,
    def: &'l LambdaDef,
}

/// `lt.lang.function.FunctionN` for an untyped lambda of `arity` parameters.
fn function_type(arity: usize, span: Span) -> Result<JvmType> {
    if arity > 2 {
        return Err(CodeGenError::InvalidLambdaTarget {
            target: format!("lt.lang.function.Function{arity}"),
            reason: "untyped lambdas take at most 2 parameters".into(),
            span,
        });
    }
    Ok(JvmType::Reference(format!("lt/lang/function/Function{arity}")))
}

fn capture_field(name: &str) -> String {
    if name == SELF_FIELD {
        format!("{name}$capture")
    } else {
        name.to_string()
    }
}

impl FnGen<'_, '_> {
    /// Type of the object a lambda evaluates to. Without a useful target
    /// it is one of the `FunctionN` interfaces.
    pub(crate) fn lambda_type(&self, lambda: &LambdaDef, target: Option<&JvmType>) -> Result<JvmType> {
        match target {
            Some(ty) if !ty.is_object() => Ok(ty.clone()),
            _ => function_type(lambda.body.params.len(), lambda.span),
        }
    }

    /// Generate the lambda's class and emit its instantiation.
    pub(crate) fn lambda(&mut self, lambda: &LambdaDef, target: Option<&JvmType>) -> Result<JvmType> {
        let ty = self.lambda_type(lambda, target)?;
        let target = self.lambda_target(&ty, lambda)?;

        let self_ty = self.this_type();
        let captures: Vec<(String, JvmType)> = lambda
            .captures
            .iter()
            .map(|c| (capture_field(self.local_name(c.outer)), self.expected_local_type(c.outer)))
            .collect();
        let plan = self.shared.adapters.plan(AdapterKey {
            sam: target.sam.clone(),
            self_ty: self_ty.clone().unwrap_or_else(JvmType::object),
            captures: captures.iter().map(|(_, ty)| ty.clone()).collect(),
        });
        let name = self.shared.next_lambda_name();
        tracing::debug!(class = %name, sam = %target.sam, captures = captures.len(), "lambda");

        let class = LambdaClass {
            name: name.clone(),
            target,
            plan,
            self_ty: self_ty.clone(),
            captures,
            def: lambda,
        };
        let generated = build_class(self.shared, &class)?;
        self.shared.lambdas.push(generated);

        // new Lambda(self, captures...)
        self.em.type_insn(Opcode::New, &name);
        self.em.op(Opcode::Dup);
        if self_ty.is_some() {
            self.load_this(lambda.span)?;
        } else {
            self.em.push_null();
        }
        for capture in &lambda.captures {
            self.load_local(capture.outer, lambda.span)?;
        }
        self.em.invoke(InvokeKind::Special, &name, "<init>", &class.plan.constructor);
        Ok(ty)
    }

    fn lambda_target(&self, ty: &JvmType, lambda: &LambdaDef) -> Result<LambdaTarget> {
        let span = lambda.span;
        let invalid = |target: String, reason: String| CodeGenError::InvalidLambdaTarget { target, reason, span };
        let JvmType::Reference(internal) = ty else {
            return Err(invalid(ty.to_string(), "not a class or interface".into()));
        };
        let name = QualifiedName::parse(internal);
        let registry = self.registry();
        let sam = registry
            .single_abstract_method(&name)
            .map_err(|e| invalid(name.dotted(), e.to_string()))?;
        let found = lambda.body.params.len();
        if sam.descriptor.params.len() != found {
            return Err(CodeGenError::LambdaArity {
                expected: sam.descriptor.params.len(),
                found,
                span,
            });
        }
        let entry = registry
            .get(&name)
            .ok_or_else(|| invalid(name.dotted(), "not registered".into()))?;
        let (super_name, interface) = if entry.is_interface() {
            (OBJECT.to_string(), Some(internal.clone()))
        } else if entry.has_default_constructor() {
            (internal.clone(), None)
        } else {
            return Err(invalid(name.dotted(), "abstract class without a no-argument constructor".into()));
        };
        Ok(LambdaTarget {
            super_name,
            interface,
            method: sam.name.clone(),
            sam: sam.descriptor.clone(),
        })
    }
}

// ============================================================================
// Class emission
// ============================================================================

fn build_class(shared: &mut ClassShared<'_>, class: &LambdaClass<'_>) -> Result<GeneratedClass> {
    let mut writer = ClassWriter::new(
        &class.name,
        &class.target.super_name,
        AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::SUPER | AccessFlags::SYNTHETIC,
    );
    if let Some(interface) = &class.target.interface {
        writer.add_interface(interface);
    }
    let self_field = class.self_ty.clone().unwrap_or_else(JvmType::object);
    let field_access = AccessFlags::PUBLIC | AccessFlags::FINAL;
    writer.add_field(field_access, SELF_FIELD, &self_field.descriptor());
    for (field, ty) in &class.captures {
        writer.add_field(field_access, field, &ty.descriptor());
    }

    constructor(&mut writer, class, &self_field)?;
    adapter_method(shared, &mut writer, class)?;
    body_method(shared, &mut writer, class)?;

    if let Some(file) = &shared.source_file {
        writer.set_source_file(file);
    }
    Ok(GeneratedClass {
        name: dotted(&class.name),
        bytes: writer.into_bytes()?,
    })
}

/// `<init>(self, captures...)`: call the no-argument super constructor,
/// then store every argument in its field.
fn constructor(writer: &mut ClassWriter, class: &LambdaClass<'_>, self_field: &JvmType) -> Result<()> {
    let desc = &class.plan.constructor;
    let mut em = MethodEmitter::new(writer.pool_mut(), "<init>", 1 + desc.arg_slots());
    let this = JvmType::object();
    em.load(&this, 0);
    em.invoke(
        InvokeKind::Special,
        &class.target.super_name,
        "<init>",
        &MethodDescriptor::void(vec![]),
    );

    let fields = std::iter::once((SELF_FIELD, self_field)).chain(class.captures.iter().map(|(n, ty)| (n.as_str(), ty)));
    let mut slot = 1;
    for (field, ty) in fields {
        em.load(&this, 0);
        em.load(ty, slot);
        em.put_field(&class.name, field, ty);
        slot += ty.slots();
    }
    em.return_value(&JvmType::Void);
    let code = em.finish()?;
    writer.add_method(AccessFlags::PUBLIC, "<init>", &desc.to_string(), Some(code));
    Ok(())
}

/// The target method: box every argument, call `lambda$body` and convert
/// its result.
fn adapter_method(shared: &mut ClassShared<'_>, writer: &mut ClassWriter, class: &LambdaClass<'_>) -> Result<()> {
    let sam = &class.target.sam;
    let empty = Body::default();
    let mode = FnMode::Lambda {
        class: class.name.clone(),
        self_ty: class.self_ty.clone(),
    };
    let mut generator = FnGen::new(shared, writer.pool_mut(), &class.target.method, mode, &empty, sam.ret.clone());

    let slots: Vec<u16> = sam.params.iter().map(|ty| generator.alloc_temp(ty)).collect();
    generator.em.load(&JvmType::object(), 0);
    for ((ty, slot), boxed) in sam.params.iter().zip(slots).zip(&class.plan.boxed_params) {
        generator.em.load(ty, slot);
        if boxed.is_some() {
            generator.box_value(ty, class.def.span)?;
        }
    }
    generator
        .em
        .invoke(InvokeKind::Virtual, &class.name, BODY_METHOD, &class.plan.body);

    match &class.plan.result {
        ResultAdapter::Discard => generator.em.op(Opcode::Pop),
        ResultAdapter::RuntimeCast(p) => {
            let desc = MethodDescriptor::new(vec![JvmType::object()], JvmType::Primitive(*p));
            generator.em.invoke(InvokeKind::Static, LT_RUNTIME, p.runtime_cast(), &desc);
        }
        ResultAdapter::Checkcast(operand) => generator.em.type_insn(Opcode::Checkcast, operand),
        ResultAdapter::Direct => {}
    }
    generator.em.return_value(&sam.ret);
    let code = generator.finish()?;
    writer.add_method(AccessFlags::PUBLIC, &class.target.method, &sam.to_string(), Some(code));
    Ok(())
}

/// `lambda$body(Object...)Object`: the lambda's own statements.
fn body_method(shared: &mut ClassShared<'_>, writer: &mut ClassWriter, class: &LambdaClass<'_>) -> Result<()> {
    let def = class.def;
    let body = &def.body;
    let mode = FnMode::Lambda {
        class: class.name.clone(),
        self_ty: class.self_ty.clone(),
    };
    let object = JvmType::object();
    let mut generator = FnGen::new(shared, writer.pool_mut(), BODY_METHOD, mode, body, object.clone());

    let raw: Vec<u16> = body.params.iter().map(|_| generator.alloc_temp(&object)).collect();

    for (capture, (field, ty)) in def.captures.iter().zip(&class.captures) {
        generator.em.load(&object, 0);
        generator.em.get_field(&class.name, field, ty);
        let slot = generator.define_local(capture.inner, ty.clone());
        generator.em.store(ty, slot.slot);
    }

    // Parameters arrive as `Object`; undeclared ones take the target's
    // parameter type.
    for ((id, slot), sam_ty) in body.params.iter().zip(raw).zip(&class.target.sam.params) {
        let ty = body.local(*id).declared.clone().unwrap_or_else(|| sam_ty.clone());
        if ty.is_object() {
            generator.set_slot(*id, LocalSlot { slot, ty });
            continue;
        }
        generator.em.load(&object, slot);
        generator.convert(&object, &ty, body.local(*id).span)?;
        let local = generator.define_local(*id, ty.clone());
        generator.em.store(&ty, local.slot);
    }

    generator.block(&body.stmts)?;
    let code = generator.finish()?;
    writer.add_method(
        AccessFlags::PUBLIC | AccessFlags::SYNTHETIC,
        BODY_METHOD,
        &class.plan.body.to_string(),
        Some(code),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::bytecode::{ClassDump, Opcode};
    use crate::codegen::tests::{compile, compile_errors};

    fn lambda_class<'a>(classes: &'a [ClassDump], index: usize) -> &'a ClassDump {
        let name = format!("A$Latte$Lambda${index}");
        classes.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn untyped_lambdas_implement_function_n() {
        let classes = compile("class A\n  def f() = (x) -> x\n");
        let lambda = lambda_class(&classes, 0);
        assert_eq!(lambda.interfaces, vec!["lt/lang/function/Function1".to_string()]);
        assert_eq!(lambda.super_name.as_deref(), Some("java/lang/Object"));
        let apply = lambda.method("apply").unwrap();
        assert_eq!(apply.descriptor, "(Ljava/lang/Object;)Ljava/lang/Object;");
        assert!(lambda.method("lambda$body").is_some());
        assert_eq!(lambda.field("self").unwrap().descriptor, "LA;");
    }

    #[test]
    fn primitive_targets_get_adapters() {
        let classes = compile(
            "import java::util::function::_\nclass A\n  def f():IntUnaryOperator\n    k = 3\n    return (x) -> x + k\n",
        );
        let lambda = lambda_class(&classes, 0);
        let apply = lambda.method("applyAsInt").unwrap();
        assert_eq!(apply.descriptor, "(I)I");
        let code = apply.code.as_ref().unwrap();
        let names: Vec<&str> = code.invocations().filter_map(|i| i.member()).map(|m| m.1).collect();
        assert_eq!(names, vec!["valueOf", "lambda$body", "castToInt"]);
        assert_eq!(lambda.field("k").unwrap().descriptor, "I");
        let init = lambda.method("<init>").unwrap();
        assert_eq!(init.descriptor, "(LA;I)V");
    }

    #[test]
    fn void_targets_discard_the_result() {
        let classes = compile("class A\n  static\n    def f():Runnable = () -> System.out.println(1)\n");
        let lambda = lambda_class(&classes, 0);
        let run = lambda.method("run").unwrap();
        assert_eq!(run.descriptor, "()V");
        let code = run.code.as_ref().unwrap();
        assert_eq!(code.count(Opcode::Pop), 1);
        assert_eq!(code.count(Opcode::Return), 1);
        // No enclosing instance in a static method.
        assert_eq!(lambda.field("self").unwrap().descriptor, "Ljava/lang/Object;");
    }

    #[test]
    fn each_lambda_gets_its_own_class() {
        let classes = compile("class A\n  def f() = [() -> 1, () -> 2, (a, b) -> a]\n");
        assert_eq!(classes.len(), 4);
        assert_eq!(lambda_class(&classes, 2).interfaces, vec!["lt/lang/function/Function2".to_string()]);
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let errors = compile_errors("class A\n  def f():Runnable = (x) -> x\n");
        assert!(errors[0].to_string().contains("parameter"));
    }

    #[test]
    fn non_functional_targets_are_rejected() {
        let errors = compile_errors("class A\n  def f():String = () -> 1\n");
        assert!(errors[0].to_string().contains("cannot be implemented by a lambda"));
    }
}
