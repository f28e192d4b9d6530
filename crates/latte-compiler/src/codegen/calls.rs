//! Call binding.
//!
//! A call is bound to a registered method when the receiver's type is known
//! and exactly one overload fits best. Receivers of unknown type, and
//! calls whose best overload is ambiguous, go through the runtime's
//! reflective `Dynamic.invoke`/`Dynamic.invokeStatic`.

use latte_core::{CodeGenError, JvmType, MethodDescriptor, QualifiedName, Span};
use latte_registry::MethodEntry;

use super::function::FnGen;
use super::overload::{ArgTy, Selection, select_overload};
use super::{DYNAMIC, Result};
use crate::bytecode::Opcode;
use crate::emit::InvokeKind;
use crate::hir::{Callee, Expr, InnerId};

/// How a call is emitted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CallPlan {
    Bound {
        kind: InvokeKind,
        owner: String,
        name: String,
        desc: MethodDescriptor,
    },
    /// `Dynamic.invoke(receiver, name, args)`
    Dynamic { name: String },
    /// `Dynamic.invokeStatic(owner.class, name, args)`
    DynamicStatic { owner: String, name: String },
    /// Static synthetic method of an inner function.
    Inner(InnerId),
}

impl CallPlan {
    /// Type left on the stack by the call.
    pub fn ret(&self, generator: &FnGen<'_, '_>) -> JvmType {
        match self {
            CallPlan::Bound { desc, .. } => desc.ret.clone(),
            CallPlan::Dynamic { .. } | CallPlan::DynamicStatic { .. } => JvmType::object(),
            CallPlan::Inner(id) => generator.shared.inner_fns.get(id).map_or_else(JvmType::object, |sig| sig.ret.clone()),
        }
    }
}

fn invoke_dynamic_desc() -> MethodDescriptor {
    MethodDescriptor::new(
        vec![
            JvmType::object(),
            JvmType::string(),
            JvmType::Array(Box::new(JvmType::object())),
        ],
        JvmType::object(),
    )
}

fn invoke_static_desc() -> MethodDescriptor {
    MethodDescriptor::new(
        vec![
            JvmType::Reference("java/lang/Class".into()),
            JvmType::string(),
            JvmType::Array(Box::new(JvmType::object())),
        ],
        JvmType::object(),
    )
}

impl FnGen<'_, '_> {
    // ==========================================================================
    // Planning
    // ==========================================================================

    pub(crate) fn arg_types(&self, args: &[Expr]) -> Result<Vec<ArgTy>> {
        args.iter()
            .map(|arg| {
                Ok(match arg {
                    Expr::Literal(latte_parser::Literal::Null, _) => ArgTy::Null,
                    Expr::Lambda(lambda) => ArgTy::Lambda(lambda.body.params.len()),
                    other => ArgTy::Value(self.type_of(other)?),
                })
            })
            .collect()
    }

    /// Pick among `methods` for `args`.
    fn select<'m>(&self, methods: &[&'m MethodEntry], args: &[Expr]) -> Result<Selected<'m>> {
        let arg_types = self.arg_types(args)?;
        let descs: Vec<&MethodDescriptor> = methods.iter().map(|m| &m.descriptor).collect();
        Ok(match select_overload(&descs, &arg_types, self.registry()) {
            Selection::Found(found) => Selected::One(methods[found.index]),
            Selection::NotApplicable => Selected::None,
            Selection::Ambiguous(_) => Selected::Ambiguous,
        })
    }

    pub(crate) fn plan_call(&self, callee: &Callee, args: &[Expr], span: Span) -> Result<CallPlan> {
        match callee {
            Callee::Method { target, name } => {
                let receiver = self.type_of(target)?;
                self.plan_method(&receiver, name, args, span)
            }
            Callee::Static { owner, name } => self.plan_static(owner, name, args, span),
            Callee::Inner { id, .. } => Ok(CallPlan::Inner(*id)),
            Callee::Value(target) => {
                let ty = self.type_of(target)?;
                self.plan_value_call(&ty, args, span)
            }
        }
    }

    fn plan_method(&self, receiver: &JvmType, name: &str, args: &[Expr], span: Span) -> Result<CallPlan> {
        let dynamic = || CallPlan::Dynamic { name: name.to_string() };
        let owner_name = match receiver {
            JvmType::Void => return Err(CodeGenError::VoidValue { span }),
            JvmType::Primitive(p) => p.box_class().to_string(),
            JvmType::Reference(name) => name.clone(),
            JvmType::Array(_) => return Ok(dynamic()),
        };
        let owner = QualifiedName::parse(&owner_name);
        let Some(entry) = self.registry().get(&owner) else {
            return Ok(dynamic());
        };
        let methods: Vec<&MethodEntry> = self
            .registry()
            .find_methods(&owner, name)
            .into_iter()
            .map(|(_, m)| m)
            .filter(|m| !m.is_static())
            .collect();
        if methods.is_empty() {
            return Ok(dynamic());
        }
        match self.select(&methods, args)? {
            Selected::One(method) => {
                let kind = if entry.is_interface() {
                    InvokeKind::Interface
                } else if method.access.contains(latte_registry::AccessFlags::PRIVATE) {
                    InvokeKind::Special
                } else {
                    InvokeKind::Virtual
                };
                Ok(CallPlan::Bound {
                    kind,
                    owner: owner_name,
                    name: name.to_string(),
                    desc: method.descriptor.clone(),
                })
            }
            Selected::None => Err(CodeGenError::NoApplicableMethod {
                owner: owner.dotted(),
                name: name.to_string(),
                span,
            }),
            Selected::Ambiguous => Ok(dynamic()),
        }
    }

    fn plan_static(&self, owner: &QualifiedName, name: &str, args: &[Expr], span: Span) -> Result<CallPlan> {
        let all = self.registry().find_methods(owner, name);
        if all.is_empty() {
            return Err(CodeGenError::UnknownMember {
                owner: owner.dotted(),
                name: name.to_string(),
                span,
            });
        }
        let methods: Vec<&MethodEntry> = all.into_iter().map(|(_, m)| m).filter(|m| m.is_static()).collect();
        let not_applicable = || CodeGenError::NoApplicableMethod {
            owner: owner.dotted(),
            name: name.to_string(),
            span,
        };
        if methods.is_empty() {
            return Err(not_applicable());
        }
        match self.select(&methods, args)? {
            Selected::One(method) => Ok(CallPlan::Bound {
                kind: InvokeKind::Static,
                owner: owner.internal_name(),
                name: name.to_string(),
                desc: method.descriptor.clone(),
            }),
            Selected::None => Err(not_applicable()),
            Selected::Ambiguous => Ok(CallPlan::DynamicStatic {
                owner: owner.internal_name(),
                name: name.to_string(),
            }),
        }
    }

    /// Calling a function object: its single abstract method when the arity
    /// fits, otherwise `apply` through the runtime.
    fn plan_value_call(&self, ty: &JvmType, args: &[Expr], span: Span) -> Result<CallPlan> {
        let dynamic = CallPlan::Dynamic { name: "apply".into() };
        let JvmType::Reference(name) = ty else {
            return match ty {
                JvmType::Void => Err(CodeGenError::VoidValue { span }),
                _ => Ok(dynamic),
            };
        };
        let owner = QualifiedName::parse(name);
        let Ok(sam) = self.registry().single_abstract_method(&owner) else {
            return Ok(dynamic);
        };
        if sam.descriptor.params.len() != args.len() {
            return Ok(dynamic);
        }
        let is_interface = self.registry().get(&owner).is_some_and(|e| e.is_interface());
        Ok(CallPlan::Bound {
            kind: if is_interface {
                InvokeKind::Interface
            } else {
                InvokeKind::Virtual
            },
            owner: name.clone(),
            name: sam.name.clone(),
            desc: sam.descriptor.clone(),
        })
    }

    /// The constructor of `class` fitting `args`.
    pub(crate) fn plan_constructor(&self, class: &QualifiedName, args: &[Expr], span: Span) -> Result<MethodDescriptor> {
        let no_ctor = || CodeGenError::NoApplicableMethod {
            owner: class.dotted(),
            name: "<init>".into(),
            span,
        };
        let ctors: Vec<&MethodEntry> = self
            .registry()
            .find_methods(class, "<init>")
            .into_iter()
            .map(|(_, m)| m)
            .collect();
        match self.select(&ctors, args)? {
            Selected::One(ctor) => Ok(ctor.descriptor.clone()),
            Selected::None => Err(no_ctor()),
            Selected::Ambiguous => Err(CodeGenError::Unsupported {
                what: format!("ambiguous constructor call for '{}'", class.dotted()),
                span,
            }),
        }
    }

    // ==========================================================================
    // Emission
    // ==========================================================================

    /// Emit `args`, each converted to its parameter type.
    pub(crate) fn emit_args(&mut self, args: &[Expr], params: &[JvmType]) -> Result<()> {
        for (arg, param) in args.iter().zip(params) {
            self.expr_as(arg, param)?;
        }
        Ok(())
    }

    /// `new Object[] { boxed args... }`
    fn emit_arg_array(&mut self, args: &[Expr]) -> Result<()> {
        self.em.push_int(args.len() as i32);
        self.em.type_insn(Opcode::Anewarray, latte_core::OBJECT);
        for (index, arg) in args.iter().enumerate() {
            self.em.op(Opcode::Dup);
            self.em.push_int(index as i32);
            self.expr_as(arg, &JvmType::object())?;
            self.em.op(Opcode::Aastore);
        }
        Ok(())
    }

    pub(crate) fn call(&mut self, callee: &Callee, args: &[Expr], span: Span) -> Result<JvmType> {
        let plan = self.plan_call(callee, args, span)?;
        let ret = plan.ret(self);
        match (callee, &plan) {
            (Callee::Method { target, .. } | Callee::Value(target), CallPlan::Bound { kind, owner, name, desc }) => {
                let receiver = self.expr(target)?;
                self.box_value(&receiver, span)?;
                if receiver.primitive().is_none() && receiver.class_name() != Some(owner.as_str()) {
                    self.convert(&receiver, &JvmType::Reference(owner.clone()), span)?;
                }
                self.emit_args(args, &desc.params)?;
                self.em.invoke(*kind, owner, name, desc);
            }
            (Callee::Method { target, .. } | Callee::Value(target), CallPlan::Dynamic { name }) => {
                let receiver = self.expr(target)?;
                self.box_value(&receiver, span)?;
                self.em.push_string(name);
                self.emit_arg_array(args)?;
                self.em.invoke(InvokeKind::Static, DYNAMIC, "invoke", &invoke_dynamic_desc());
            }
            (Callee::Static { .. }, CallPlan::Bound { kind, owner, name, desc }) => {
                self.emit_args(args, &desc.params)?;
                self.em.invoke(*kind, owner, name, desc);
            }
            (Callee::Static { .. }, CallPlan::DynamicStatic { owner, name }) => {
                self.em.push_class(owner);
                self.em.push_string(name);
                self.emit_arg_array(args)?;
                self.em.invoke(InvokeKind::Static, DYNAMIC, "invokeStatic", &invoke_static_desc());
            }
            (Callee::Inner { id, captures }, CallPlan::Inner(_)) => self.call_inner(*id, captures, args, span)?,
            _ => {
                return Err(CodeGenError::Unsupported {
                    what: "call form".into(),
                    span,
                });
            }
        }
        Ok(ret)
    }

    fn call_inner(&mut self, id: InnerId, captures: &[Expr], args: &[Expr], span: Span) -> Result<()> {
        let sig = self.shared.inner_fns.get(&id).cloned().ok_or_else(|| CodeGenError::Unsupported {
            what: "call to an inner function before its definition".into(),
            span,
        })?;
        if sig.params.len() != args.len() {
            return Err(CodeGenError::NoApplicableMethod {
                owner: self.shared.class.dotted(),
                name: sig.method.clone(),
                span,
            });
        }
        if sig.takes_self {
            self.load_this(span)?;
        }
        self.emit_args(captures, &sig.captures)?;
        self.emit_args(args, &sig.params)?;
        let owner = self.shared.internal.clone();
        self.em.invoke(InvokeKind::Static, &owner, &sig.method, &sig.descriptor);
        Ok(())
    }

    /// `new C(args)`
    pub(crate) fn new_object(&mut self, class: &QualifiedName, args: &[Expr], span: Span) -> Result<JvmType> {
        let entry = self.registry().get(class).ok_or_else(|| CodeGenError::UnknownMember {
            owner: class.dotted(),
            name: "<init>".into(),
            span,
        })?;
        if entry.is_interface() || entry.is_abstract() {
            return Err(CodeGenError::Unsupported {
                what: format!("instantiating abstract type '{}'", class.dotted()),
                span,
            });
        }
        let desc = self.plan_constructor(class, args, span)?;
        let internal = class.internal_name();
        self.em.type_insn(Opcode::New, &internal);
        self.em.op(Opcode::Dup);
        self.emit_args(args, &desc.params)?;
        self.em.invoke(InvokeKind::Special, &internal, "<init>", &desc);
        Ok(JvmType::reference(class))
    }
}

enum Selected<'m> {
    One(&'m MethodEntry),
    None,
    Ambiguous,
}

#[cfg(test)]
mod tests {
    use crate::bytecode::Opcode;
    use crate::codegen::tests::compile_one;

    #[test]
    fn static_calls_bind_to_the_best_overload() {
        let class = compile_one("class A\n  static\n    def f(x:long):long = Math.abs(x)\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        let call = code.invocations().next().unwrap();
        assert_eq!(call.member(), Some(("java/lang/Math", "abs", "(J)J")));
    }

    #[test]
    fn interface_receivers_use_invokeinterface() {
        let class = compile_one("import java::util::_\nclass A\n  def f(l:List):int = l.size()\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(code.count(Opcode::Invokeinterface), 1);
    }

    #[test]
    fn unknown_receivers_call_through_the_runtime() {
        let class = compile_one("class A\n  def f(o) = o.frobnicate(1, \"x\")\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        let call = code.invocations().last().unwrap();
        assert_eq!(
            call.member(),
            Some((
                "lt/runtime/Dynamic",
                "invoke",
                "(Ljava/lang/Object;Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/Object;"
            ))
        );
        assert_eq!(code.count(Opcode::Aastore), 2);
    }

    #[test]
    fn inner_function_calls_keep_their_return_type() {
        let class = compile_one("class A\n  def f():long\n    def g():long = 3\n    return g() + 1\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(code.count(Opcode::Ladd), 1);
        assert_eq!(code.invocations().count(), 1);
    }

    #[test]
    fn constructors_pick_an_overload() {
        let class = compile_one("class A\n  def f():Object = RuntimeException(\"boom\")\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(code.count(Opcode::New), 1);
        let call = code.invocations().next().unwrap();
        assert_eq!(
            call.member(),
            Some(("java/lang/RuntimeException", "<init>", "(Ljava/lang/String;)V"))
        );
    }
}
