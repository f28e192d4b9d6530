//! Per-function emission state.
//!
//! A [`FnGen`] compiles one method, constructor, lambda body or inner
//! function. It owns the [`MethodEmitter`] and maps every [`LocalId`] of the
//! body to a JVM local slot. Statement, expression, call and operator
//! emission live in sibling modules as further `impl FnGen` blocks.

use latte_core::{CodeGenError, JvmType, PrimitiveKind, Span};
use latte_registry::ClassRegistry;

use super::guard::Guard;
use super::{ClassShared, Result};
use crate::bytecode::{CodeAttribute, ConstantPool};
use crate::emit::MethodEmitter;
use crate::hir::{Body, LocalId};

/// What kind of function is being compiled; decides where `this` lives.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FnMode {
    Method { is_static: bool },
    Constructor,
    /// Method of a lambda class: the enclosing instance, if any, is the
    /// class's `self` field.
    Lambda { class: String, self_ty: Option<JvmType> },
    /// Static synthetic method; the enclosing instance, if any, is the
    /// first argument.
    Inner { takes_self: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocalSlot {
    pub slot: u16,
    pub ty: JvmType,
}

pub(crate) struct FnGen<'a, 'r> {
    pub(super) shared: &'a mut ClassShared<'r>,
    pub(super) em: MethodEmitter<'a>,
    pub(super) body: &'a Body,
    pub(super) mode: FnMode,
    /// Declared return type.
    pub(super) ret: JvmType,
    /// Open `synchronized` blocks and `try` bodies, outermost first.
    pub(super) guards: Vec<Guard>,
    slots: Vec<Option<LocalSlot>>,
    next_slot: u16,
}

impl<'a, 'r> FnGen<'a, 'r> {
    pub fn new(
        shared: &'a mut ClassShared<'r>,
        pool: &'a mut ConstantPool,
        name: &str,
        mode: FnMode,
        body: &'a Body,
        ret: JvmType,
    ) -> Self {
        let receiver = match mode {
            FnMode::Method { is_static } => u16::from(!is_static),
            FnMode::Constructor | FnMode::Lambda { .. } => 1,
            FnMode::Inner { .. } => 0,
        };
        Self {
            shared,
            em: MethodEmitter::new(pool, name, receiver),
            body,
            mode,
            ret,
            guards: Vec::new(),
            slots: vec![None; body.locals.len()],
            next_slot: receiver,
        }
    }

    pub fn registry(&self) -> &'r ClassRegistry {
        self.shared.registry
    }

    /// Finish the method, returning a default value if the end of the body
    /// is reachable.
    pub fn finish(mut self) -> Result<CodeAttribute> {
        if self.em.is_reachable() {
            let ret = self.ret.clone();
            if !ret.is_void() {
                self.push_default(&ret);
            }
            self.em.return_value(&ret);
        }
        self.em.finish()
    }

    // ==========================================================================
    // Locals
    // ==========================================================================

    /// Slot 0 of an inner function holds the enclosing instance.
    pub fn reserve_self(&mut self) {
        self.alloc_temp(&JvmType::object());
    }

    /// Bind the next argument slot to `id`.
    pub fn bind_param(&mut self, id: LocalId, ty: JvmType) {
        let slot = self.alloc_temp(&ty);
        self.set_slot(id, LocalSlot { slot, ty });
    }

    /// A fresh slot no local is bound to.
    pub fn alloc_temp(&mut self, ty: &JvmType) -> u16 {
        let slot = self.next_slot;
        self.next_slot += ty.slots().max(1);
        self.em.reserve_locals(self.next_slot);
        slot
    }

    /// The slot of `id`, allocated the first time it is defined.
    pub fn define_local(&mut self, id: LocalId, ty: JvmType) -> LocalSlot {
        if let Some(Some(existing)) = self.slots.get(id.0 as usize) {
            return existing.clone();
        }
        let slot = LocalSlot {
            slot: self.alloc_temp(&ty),
            ty,
        };
        self.set_slot(id, slot.clone());
        slot
    }

    /// Bind `id` to an existing slot.
    pub fn set_slot(&mut self, id: LocalId, slot: LocalSlot) {
        let index = id.0 as usize;
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(slot);
    }

    pub fn local_slot(&self, id: LocalId, span: Span) -> Result<LocalSlot> {
        self.slots
            .get(id.0 as usize)
            .cloned()
            .flatten()
            .ok_or_else(|| CodeGenError::Unsupported {
                what: format!("use of '{}' before it has a value", self.local_name(id)),
                span,
            })
    }

    pub fn local_type(&self, id: LocalId, span: Span) -> Result<JvmType> {
        self.local_slot(id, span).map(|slot| slot.ty)
    }

    /// Type a local has or will have: its slot type once defined, else
    /// the declared type, else `Object`.
    pub fn expected_local_type(&self, id: LocalId) -> JvmType {
        if let Some(Some(slot)) = self.slots.get(id.0 as usize) {
            return slot.ty.clone();
        }
        self.body
            .locals
            .get(id.0 as usize)
            .and_then(|local| local.declared.clone())
            .unwrap_or_else(JvmType::object)
    }

    pub fn load_local(&mut self, id: LocalId, span: Span) -> Result<JvmType> {
        let LocalSlot { slot, ty } = self.local_slot(id, span)?;
        self.em.load(&ty, slot);
        Ok(ty)
    }

    pub fn local_name(&self, id: LocalId) -> &str {
        self.body.locals.get(id.0 as usize).map_or("?", |local| local.name.as_str())
    }

    // ==========================================================================
    // The enclosing instance
    // ==========================================================================

    /// Type of `this`, if the function has one.
    pub fn this_type(&self) -> Option<JvmType> {
        match &self.mode {
            FnMode::Method { is_static: false } | FnMode::Constructor | FnMode::Inner { takes_self: true } => {
                Some(self.shared.self_ty.clone())
            }
            FnMode::Lambda { self_ty, .. } => self_ty.clone(),
            FnMode::Method { is_static: true } | FnMode::Inner { takes_self: false } => None,
        }
    }

    pub fn load_this(&mut self, span: Span) -> Result<JvmType> {
        let ty = self.this_type().ok_or_else(|| CodeGenError::Unsupported {
            what: "'this' in a static context".to_string(),
            span,
        })?;
        self.em.load(&JvmType::object(), 0);
        if let FnMode::Lambda { class, .. } = &self.mode {
            let class = class.clone();
            self.em.get_field(&class, "self", &ty);
        }
        Ok(ty)
    }

    /// Zero, `false` or `null`.
    pub fn push_default(&mut self, ty: &JvmType) {
        match ty.primitive() {
            Some(PrimitiveKind::Long) => self.em.push_long(0),
            Some(PrimitiveKind::Float) => self.em.push_float(0.0),
            Some(PrimitiveKind::Double) => self.em.push_double(0.0),
            Some(_) => self.em.push_int(0),
            None if ty.is_void() => {}
            None => self.em.push_null(),
        }
    }
}
