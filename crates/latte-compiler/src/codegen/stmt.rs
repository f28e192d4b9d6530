//! Statement compilation.

use latte_core::{CodeGenError, JvmType, MethodDescriptor, PrimitiveKind, Span};
use latte_parser::BinaryOp;

use super::expr::{FieldAccess, get_field_desc, put_field_desc};
use super::function::FnGen;
use super::{DYNAMIC, InnerSig, LT_ITERATOR, LT_RUNTIME, PendingInner, Result, THROWABLE};
use crate::bytecode::Opcode;
use crate::emit::{InvokeKind, Label};
use crate::hir::{Expr, InnerFnDef, LocalId, Place, Stmt};

const ITERATOR: &str = "java/util/Iterator";

impl FnGen<'_, '_> {
    /// Compile statements in order. Nothing is emitted after a statement
    /// that cannot complete normally.
    pub(crate) fn block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            if !self.em.is_reachable() {
                break;
            }
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Expr(expr) => self.discard(expr),
            Stmt::Let { local, value, span } => self.let_stmt(*local, value.as_ref(), *span),
            Stmt::Assign { target, op, value, span } => self.assign(target, *op, value, *span),
            Stmt::Return { value, span } => self.return_stmt(value.as_ref(), *span),
            Stmt::If {
                branches, else_body, ..
            } => self.if_stmt(branches, else_body.as_deref()),
            Stmt::While { cond, body, .. } => self.while_stmt(cond, body),
            Stmt::For {
                local,
                iterable,
                body,
                span,
            } => self.for_stmt(*local, iterable, body, *span),
            Stmt::Try {
                body,
                catch,
                finally,
                span,
            } => self.try_stmt(
                body,
                catch.as_ref().map(|(local, handler)| (*local, handler.as_slice())),
                finally.as_deref(),
                *span,
            ),
            Stmt::Synchronized { locks, body, span } => self.synchronized(locks, body, *span),
            Stmt::Throw { value, span } => self.throw(value, *span),
            Stmt::InnerFn(def) => {
                self.declare_inner(def);
                Ok(())
            }
            Stmt::Break(span) => self.loop_jump(true, *span),
            Stmt::Continue(span) => self.loop_jump(false, *span),
        }
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    /// An undeclared local takes the type of its first value.
    fn let_stmt(&mut self, local: LocalId, value: Option<&Expr>, span: Span) -> Result<()> {
        let declared = self.body.local(local).declared.clone();
        let ty = match (declared, value) {
            (Some(ty), _) => ty,
            (None, Some(value)) => {
                let ty = self.type_of(value)?;
                if ty.is_void() {
                    return Err(CodeGenError::VoidValue { span });
                }
                ty
            }
            (None, None) => JvmType::object(),
        };
        match value {
            Some(value) => self.expr_as(value, &ty)?,
            None => self.push_default(&ty),
        }
        let slot = self.define_local(local, ty.clone());
        self.em.store(&ty, slot.slot);
        Ok(())
    }

    fn assign(&mut self, target: &Place, op: Option<BinaryOp>, value: &Expr, span: Span) -> Result<()> {
        match target {
            Place::Local(id) => {
                let slot = self.local_slot(*id, span)?;
                match op {
                    None => self.expr_as(value, &slot.ty)?,
                    Some(op) => {
                        self.em.load(&slot.ty, slot.slot);
                        let result = self.binary_tail(op, &slot.ty, value, span)?;
                        self.convert(&result, &slot.ty, span)?;
                    }
                }
                self.em.store(&slot.ty, slot.slot);
            }
            Place::Field { target, name } => {
                let target_ty = self.expr(target)?;
                match self.field_access(&target_ty, name) {
                    FieldAccess::Bound { owner, ty } => {
                        match op {
                            None => self.expr_as(value, &ty)?,
                            Some(op) => {
                                self.em.op(Opcode::Dup);
                                self.em.get_field(&owner, name, &ty);
                                let result = self.binary_tail(op, &ty, value, span)?;
                                self.convert(&result, &ty, span)?;
                            }
                        }
                        self.em.put_field(&owner, name, &ty);
                    }
                    FieldAccess::Dynamic => {
                        self.box_value(&target_ty, span)?;
                        match op {
                            None => {
                                self.em.push_string(name);
                                self.expr_as(value, &JvmType::object())?;
                            }
                            Some(op) => {
                                // target, name, target.name op value
                                self.em.op(Opcode::Dup);
                                self.em.push_string(name);
                                self.em.invoke(InvokeKind::Static, DYNAMIC, "getField", &get_field_desc());
                                let result = self.binary_tail(op, &JvmType::object(), value, span)?;
                                self.box_value(&result, span)?;
                                self.em.push_string(name);
                                self.em.op(Opcode::Swap);
                            }
                        }
                        self.em.invoke(InvokeKind::Static, DYNAMIC, "putField", &put_field_desc());
                    }
                }
            }
            Place::StaticField { owner, name } => {
                let (owner, ty) = self.static_field(owner, name, span)?;
                match op {
                    None => self.expr_as(value, &ty)?,
                    Some(op) => {
                        self.em.get_static(&owner, name, &ty);
                        let result = self.binary_tail(op, &ty, value, span)?;
                        self.convert(&result, &ty, span)?;
                    }
                }
                self.em.put_static(&owner, name, &ty);
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Control flow
    // ==========================================================================

    /// A value returned from a `void` function is evaluated and dropped; a
    /// `void` value returned from a function with a result returns the
    /// default value.
    fn return_stmt(&mut self, value: Option<&Expr>, span: Span) -> Result<()> {
        let ret = self.ret.clone();
        match value {
            Some(value) if ret.is_void() || self.type_of(value)?.is_void() => {
                self.discard(value)?;
                self.push_default(&ret);
            }
            Some(value) => self.expr_as(value, &ret)?,
            None => self.push_default(&ret),
        }
        tracing::trace!(?span, guards = self.guards.len(), "return");
        self.emit_return(&ret)
    }

    /// Return the value on the stack, unwinding every guard first.
    fn emit_return(&mut self, ret: &JvmType) -> Result<()> {
        if self.guards.is_empty() {
            self.em.return_value(ret);
            return Ok(());
        }
        let temp = (!ret.is_void()).then(|| {
            let slot = self.alloc_temp(ret);
            self.em.store(ret, slot);
            slot
        });
        self.release_from(0)?;
        if self.em.is_reachable() {
            if let Some(slot) = temp {
                self.em.load(ret, slot);
            }
            self.em.return_value(ret);
        }
        self.reopen_from(0);
        Ok(())
    }

    fn if_stmt(&mut self, branches: &[(Expr, Vec<Stmt>)], else_body: Option<&[Stmt]>) -> Result<()> {
        let end = self.em.new_label();
        for (cond, body) in branches {
            let next = self.em.new_label();
            self.emit_branch(cond, next, false)?;
            self.block(body)?;
            if self.em.is_reachable() {
                self.em.jump(Opcode::Goto, end);
            }
            self.em.place(next);
        }
        if let Some(body) = else_body {
            self.block(body)?;
        }
        self.em.place(end);
        Ok(())
    }

    fn while_stmt(&mut self, cond: &Expr, body: &[Stmt]) -> Result<()> {
        let head = self.em.new_label();
        let exit = self.em.new_label();
        self.em.place(head);
        self.emit_branch(cond, exit, false)?;
        self.loop_body(body, head, exit)?;
        if self.em.is_reachable() {
            self.em.jump(Opcode::Goto, head);
        }
        self.em.place(exit);
        Ok(())
    }

    /// Arrays are walked by index and the variable takes the element type.
    /// Anything else goes through `LtIterator.getIterator` and the variable
    /// is an `Object`.
    fn for_stmt(&mut self, local: LocalId, iterable: &Expr, body: &[Stmt], span: Span) -> Result<()> {
        let ty = self.expr(iterable)?;
        if ty.is_void() {
            return Err(CodeGenError::VoidValue { span });
        }
        if let Some(p) = ty.primitive() {
            return Err(CodeGenError::Unsupported {
                what: format!("cannot iterate over {p}"),
                span: iterable.span(),
            });
        }
        tracing::trace!(?span, iterable = %ty, "for loop");

        let int = JvmType::int();
        let head = self.em.new_label();
        let exit = self.em.new_label();
        match &ty {
            JvmType::Array(element) => {
                let next = self.em.new_label();
                let array = self.alloc_temp(&ty);
                self.em.store(&ty, array);
                let index = self.alloc_temp(&int);
                self.em.push_int(0);
                self.em.store(&int, index);

                self.em.place(head);
                self.em.load(&int, index);
                self.em.load(&ty, array);
                self.em.op(Opcode::Arraylength);
                self.em.jump(Opcode::IfIcmpge, exit);
                self.em.load(&ty, array);
                self.em.load(&int, index);
                self.em.array_load(element);
                let slot = self.define_local(local, element.as_ref().clone());
                self.convert(element, &slot.ty, span)?;
                self.em.store(&slot.ty, slot.slot);

                self.loop_body(body, next, exit)?;
                self.em.place(next);
                if self.em.is_reachable() {
                    self.em.iinc(index, 1);
                    self.em.jump(Opcode::Goto, head);
                }
            }
            _ => {
                let iterator = JvmType::Reference(ITERATOR.into());
                let object = JvmType::object();
                let get = MethodDescriptor::new(vec![object.clone()], iterator.clone());
                self.em.invoke(InvokeKind::Static, LT_ITERATOR, "getIterator", &get);
                let it = self.alloc_temp(&iterator);
                self.em.store(&iterator, it);

                self.em.place(head);
                self.em.load(&iterator, it);
                let has_next = MethodDescriptor::new(Vec::new(), JvmType::Primitive(PrimitiveKind::Boolean));
                self.em.invoke(InvokeKind::Interface, ITERATOR, "hasNext", &has_next);
                self.em.jump(Opcode::Ifeq, exit);
                self.em.load(&iterator, it);
                let next = MethodDescriptor::new(Vec::new(), object.clone());
                self.em.invoke(InvokeKind::Interface, ITERATOR, "next", &next);
                let slot = self.define_local(local, object.clone());
                self.convert(&object, &slot.ty, span)?;
                self.em.store(&slot.ty, slot.slot);

                self.loop_body(body, head, exit)?;
                if self.em.is_reachable() {
                    self.em.jump(Opcode::Goto, head);
                }
            }
        }
        self.em.place(exit);
        Ok(())
    }

    /// Compile a loop body with `continue` going to `next` and `break` to
    /// `exit`.
    fn loop_body(&mut self, body: &[Stmt], next: Label, exit: Label) -> Result<()> {
        let depth = self.guards.len();
        self.em.jumps().enter_loop(next, exit, depth);
        let result = self.block(body);
        self.em.jumps().exit_loop();
        result
    }

    /// `break` or `continue`: unwind the guards opened inside the loop,
    /// then jump.
    fn loop_jump(&mut self, is_break: bool, span: Span) -> Result<()> {
        let keyword = if is_break { "break" } else { "continue" };
        let context = self
            .em
            .jumps()
            .current()
            .ok_or(CodeGenError::NotInLoop { keyword, span })?;
        self.release_from(context.guard_depth)?;
        let target = if is_break {
            context.break_label
        } else {
            context.continue_label
        };
        if self.em.is_reachable() {
            self.em.jump(Opcode::Goto, target);
        }
        self.reopen_from(context.guard_depth);
        Ok(())
    }

    /// `Throwable`s are thrown as they are; `Object` goes through
    /// `LtRuntime.castToThrowable`.
    fn throw(&mut self, value: &Expr, span: Span) -> Result<()> {
        let ty = self.expr(value)?;
        let throwable = JvmType::Reference(THROWABLE.into());
        if ty.is_object() {
            let desc = MethodDescriptor::new(vec![JvmType::object()], throwable);
            self.em.invoke(InvokeKind::Static, LT_RUNTIME, "castToThrowable", &desc);
        } else {
            self.convert(&ty, &throwable, span)?;
        }
        self.em.op(Opcode::Athrow);
        Ok(())
    }

    // ==========================================================================
    // Inner functions
    // ==========================================================================

    /// Register the static method an inner function compiles to; its body
    /// is emitted after the enclosing method.
    fn declare_inner(&mut self, def: &InnerFnDef) {
        let captures: Vec<JvmType> = def
            .captures
            .iter()
            .map(|capture| self.expected_local_type(capture.outer))
            .collect();
        let params: Vec<JvmType> = def
            .body
            .params
            .iter()
            .map(|id| def.body.local(*id).declared.clone().unwrap_or_else(JvmType::object))
            .collect();
        let descriptor_params = def
            .takes_self
            .then(|| self.shared.self_ty.clone())
            .into_iter()
            .chain(captures.iter().cloned())
            .chain(params.iter().cloned())
            .collect();
        let sig = InnerSig {
            method: self.shared.next_inner_name(&def.name),
            takes_self: def.takes_self,
            captures,
            params,
            ret: def.ret.clone(),
            descriptor: MethodDescriptor::new(descriptor_params, def.ret.clone()),
        };
        tracing::trace!(name = %def.name, method = %sig.method, "declared inner function");
        self.shared.inner_fns.insert(def.id, sig.clone());
        self.shared.pending.push(PendingInner { def: def.clone(), sig });
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::{Opcode, Operand};
    use crate::codegen::tests::{compile, compile_one};

    #[test]
    fn locals_take_the_type_of_their_first_value() {
        let class = compile_one("class A\n  def f():long\n    x = 1\n    y = 2L\n    return x + y\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(code.count(Opcode::Istore1), 1);
        assert_eq!(code.count(Opcode::Lstore2), 1);
        assert_eq!(code.invocations().count(), 0);
    }

    #[test]
    fn while_loops_jump_back_to_the_condition() {
        let class = compile_one(
            "class A\n  def f(n:int):int\n    i = 0\n    while i < n\n      i += 1\n      if i == 5\n        break\n    return i\n",
        );
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(code.count(Opcode::Goto), 2);
        assert_eq!(code.count(Opcode::IfIcmpge), 1);
        assert_eq!(code.count(Opcode::IfIcmpne), 1);
    }

    #[test]
    fn for_over_an_array_walks_it_by_index() {
        let class = compile_one("class A\n  def f(xs:[]int):int\n    sum = 0\n    for x in xs\n      sum += x\n    return sum\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(code.count(Opcode::Arraylength), 1);
        assert_eq!(code.count(Opcode::Iaload), 1);
        assert_eq!(code.count(Opcode::Iinc), 1);
        assert_eq!(code.count(Opcode::IfIcmpge), 1);
        assert_eq!(code.invocations().count(), 0);
    }

    #[test]
    fn for_over_anything_else_uses_an_iterator() {
        let class = compile_one("class A\n  def f(xs)\n    for x in xs\n      System.out.println(x)\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        let names: Vec<&str> = code.invocations().filter_map(|i| i.member()).map(|m| m.1).collect();
        assert_eq!(names, vec!["getIterator", "hasNext", "next", "println"]);
        assert_eq!(code.count(Opcode::Invokeinterface), 2);
        assert_eq!(code.count(Opcode::Ifeq), 1);
    }

    #[test]
    fn continue_in_an_array_loop_steps_the_index() {
        let class = compile_one(
            "class A\n  def f(xs:[]long):long\n    total = 0L\n    for x in xs\n      if x < 0L\n        continue\n      total += x\n    return total\n",
        );
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(code.count(Opcode::Laload), 1);
        assert_eq!(code.count(Opcode::Iinc), 1);
        // The `continue` and the end of the body both reach the step.
        let step = code.instructions.iter().find(|i| i.opcode == Opcode::Iinc).unwrap().offset;
        assert!(
            code.instructions
                .iter()
                .any(|i| i.opcode == Opcode::Goto && i.operand == Operand::Jump(step))
        );
    }

    #[test]
    fn iterating_a_primitive_is_an_error() {
        let errors = crate::codegen::tests::compile_errors("class A\n  def f(n:int)\n    for x in n\n      ...\n");
        assert!(errors[0].to_string().contains("cannot iterate over int"));
    }

    #[test]
    fn throwing_an_object_casts_it_first() {
        let class = compile_one("class A\n  def f(o)\n    throw o\n  def g()\n    throw RuntimeException()\n");
        let f = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(f.invocations().next().and_then(|i| i.member()).map(|m| m.1), Some("castToThrowable"));
        let g = class.method("g").unwrap().code.as_ref().unwrap();
        assert_eq!(g.count(Opcode::Athrow), 1);
        assert!(g.invocations().all(|i| i.member().is_some_and(|m| m.1 == "<init>")));
    }

    #[test]
    fn inner_functions_become_static_methods() {
        let classes = compile(
            "class A\n  def f(k:int):int\n    def g(x:int):int = x + k\n    return g(1) + g(2)\n",
        );
        let class = &classes[0];
        let inner = class.method("g$Latte$Inner$0").unwrap();
        assert!(inner.is_static());
        assert_eq!(inner.descriptor, "(LA;II)I");
        let f = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(f.count(Opcode::Invokestatic), 2);
    }

    #[test]
    fn break_outside_a_loop_is_an_error() {
        let errors = crate::codegen::tests::compile_errors("class A\n  def f()\n    break\n");
        assert!(errors[0].to_string().contains("break"));
    }
}
