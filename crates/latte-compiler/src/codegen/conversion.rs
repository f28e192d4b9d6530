//! Value conversions.
//!
//! [`find_conversion`] decides whether a value of one JVM type can be used
//! where another is expected and at what cost; the cost ranks overload
//! candidates. [`FnGen::apply_conversion`] emits the instructions.
//!
//! ## Conversion costs
//!
//! | conversion                        | cost | implicit |
//! |-----------------------------------|------|----------|
//! | identity                          | 0    | yes      |
//! | primitive widening, upcast        | 1    | yes      |
//! | unboxing from the exact box       | 2    | yes      |
//! | boxing to the box class           | 3    | yes      |
//! | boxing to a supertype of the box  | 4    | yes      |
//! | primitive narrowing               | 6    | no       |
//! | `Object` → reference (checkcast)  | 8    | yes      |
//! | other checkcasts                  | 9    | no       |
//! | reference → primitive via runtime | 10   | yes      |
//!
//! `boolean` never converts to or from a numeric kind.

use latte_core::{CodeGenError, JvmType, MethodDescriptor, OBJECT, PrimitiveKind, QualifiedName, Span};
use latte_registry::ClassRegistry;

use super::function::FnGen;
use super::{LT_RUNTIME, Result};
use crate::bytecode::Opcode;
use crate::emit::InvokeKind;

/// Supertypes every box class has.
const BOX_SUPERTYPES: [&str; 3] = [OBJECT, "java/lang/Comparable", "java/io/Serializable"];
const NUMBER: &str = "java/lang/Number";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub kind: ConversionKind,
    pub cost: u32,
    /// Whether the conversion may be chosen by overload resolution. Every
    /// conversion may be used for assignments, returns and casts.
    pub is_implicit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionKind {
    Identity,
    Primitive { from: PrimitiveKind, to: PrimitiveKind },
    Box(PrimitiveKind),
    /// `xxxValue()` on the exact box class.
    Unbox(PrimitiveKind),
    /// `LtRuntime.castToX(Object)`.
    RuntimeCast(PrimitiveKind),
    /// Reference to a supertype; nothing to emit.
    Upcast,
    /// `checkcast` to the given class operand.
    Checkcast(String),
}

impl Conversion {
    fn new(kind: ConversionKind, cost: u32) -> Self {
        Self {
            kind,
            cost,
            is_implicit: true,
        }
    }

    fn explicit(kind: ConversionKind, cost: u32) -> Self {
        Self {
            kind,
            cost,
            is_implicit: false,
        }
    }

    pub fn identity() -> Self {
        Self::new(ConversionKind::Identity, 0)
    }

    pub fn is_exact(&self) -> bool {
        self.kind == ConversionKind::Identity
    }
}

/// How a value of type `from` becomes a `to`, if it can.
pub fn find_conversion(from: &JvmType, to: &JvmType, registry: &ClassRegistry) -> Option<Conversion> {
    if from == to {
        return Some(Conversion::identity());
    }
    match (from, to) {
        (JvmType::Void, _) | (_, JvmType::Void) => None,
        (JvmType::Primitive(from), JvmType::Primitive(to)) => primitive_conversion(*from, *to),
        (JvmType::Primitive(p), JvmType::Reference(target)) => boxing_conversion(*p, target),
        (JvmType::Primitive(_), JvmType::Array(_)) | (JvmType::Array(_), JvmType::Primitive(_)) => None,
        (JvmType::Reference(source), JvmType::Primitive(p)) => unboxing_conversion(source, *p),
        (_, to) if to.is_object() => Some(Conversion::new(ConversionKind::Upcast, 1)),
        (JvmType::Reference(source), JvmType::Reference(target)) => reference_conversion(source, target, registry),
        (from, to) if from.is_object() => Some(Conversion::new(ConversionKind::Checkcast(to.class_operand()), 8)),
        (_, to) => Some(Conversion::explicit(ConversionKind::Checkcast(to.class_operand()), 9)),
    }
}

fn primitive_conversion(from: PrimitiveKind, to: PrimitiveKind) -> Option<Conversion> {
    if from.is_numeric() != to.is_numeric() {
        return None;
    }
    let kind = ConversionKind::Primitive { from, to };
    if from.widens_to(to) {
        Some(Conversion::new(kind, 1))
    } else {
        Some(Conversion::explicit(kind, 6))
    }
}

fn boxing_conversion(p: PrimitiveKind, target: &str) -> Option<Conversion> {
    if target == p.box_class() {
        Some(Conversion::new(ConversionKind::Box(p), 3))
    } else if BOX_SUPERTYPES.contains(&target) || (p.is_numeric() && target == NUMBER) {
        Some(Conversion::new(ConversionKind::Box(p), 4))
    } else {
        None
    }
}

fn unboxing_conversion(source: &str, p: PrimitiveKind) -> Option<Conversion> {
    if source == p.box_class() {
        return Some(Conversion::new(ConversionKind::Unbox(p), 2));
    }
    let related = match PrimitiveKind::from_box_class(source) {
        Some(boxed) => boxed.is_numeric() && p.is_numeric(),
        None => BOX_SUPERTYPES.contains(&source) || (p.is_numeric() && source == NUMBER),
    };
    related.then(|| Conversion::new(ConversionKind::RuntimeCast(p), 10))
}

fn reference_conversion(source: &str, target: &str, registry: &ClassRegistry) -> Option<Conversion> {
    let source_name = QualifiedName::parse(source);
    let target_name = QualifiedName::parse(target);
    if registry.is_subclass(&source_name, &target_name) {
        return Some(Conversion::new(ConversionKind::Upcast, 1));
    }
    let checkcast = ConversionKind::Checkcast(target.to_string());
    if source == OBJECT {
        return Some(Conversion::new(checkcast, 8));
    }

    // A cast can only succeed when one side may hold the other.
    let (Some(source_entry), Some(target_entry)) = (registry.get(&source_name), registry.get(&target_name)) else {
        return Some(Conversion::explicit(checkcast, 9));
    };
    let may_hold = registry.is_subclass(&target_name, &source_name)
        || source_entry.is_interface()
        || target_entry.is_interface();
    may_hold.then(|| Conversion::explicit(checkcast, 9))
}

// ============================================================================
// Emission
// ============================================================================

impl FnGen<'_, '_> {
    /// Convert the value on top of the stack from `from` to `to`.
    pub(crate) fn convert(&mut self, from: &JvmType, to: &JvmType, span: Span) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if to.is_void() {
            self.em.pop_value(from);
            return Ok(());
        }
        if from.is_void() {
            return Err(CodeGenError::VoidValue { span });
        }
        let conversion =
            find_conversion(from, to, self.registry()).ok_or_else(|| CodeGenError::conversion(from, to, span))?;
        self.apply_conversion(&conversion);
        Ok(())
    }

    pub(crate) fn apply_conversion(&mut self, conversion: &Conversion) {
        match &conversion.kind {
            ConversionKind::Identity | ConversionKind::Upcast => {}
            ConversionKind::Primitive { from, to } => self.primitive_cast(*from, *to),
            ConversionKind::Box(p) => {
                let boxed = JvmType::Reference(p.box_class().to_string());
                let desc = MethodDescriptor::new(vec![JvmType::Primitive(*p)], boxed);
                self.em.invoke(InvokeKind::Static, p.box_class(), "valueOf", &desc);
            }
            ConversionKind::Unbox(p) => {
                let desc = MethodDescriptor::new(vec![], JvmType::Primitive(*p));
                self.em.invoke(InvokeKind::Virtual, p.box_class(), p.unbox_method(), &desc);
            }
            ConversionKind::RuntimeCast(p) => {
                let desc = MethodDescriptor::new(vec![JvmType::object()], JvmType::Primitive(*p));
                self.em.invoke(InvokeKind::Static, LT_RUNTIME, p.runtime_cast(), &desc);
            }
            ConversionKind::Checkcast(operand) => self.em.type_insn(Opcode::Checkcast, operand),
        }
    }

    /// Box a primitive to its wrapper; references are left alone.
    pub(crate) fn box_value(&mut self, ty: &JvmType, span: Span) -> Result<()> {
        match ty {
            JvmType::Primitive(_) => self.convert(ty, &JvmType::object(), span),
            JvmType::Void => Err(CodeGenError::VoidValue { span }),
            _ => Ok(()),
        }
    }

    pub(crate) fn primitive_cast(&mut self, from: PrimitiveKind, to: PrimitiveKind) {
        use PrimitiveKind::*;
        if from == to {
            return;
        }
        let int_like = |p: PrimitiveKind| matches!(p, Boolean | Byte | Char | Short | Int);
        let widen = match (from, to) {
            (f, Long) if int_like(f) => Some(Opcode::I2l),
            (f, Float) if int_like(f) => Some(Opcode::I2f),
            (f, Double) if int_like(f) => Some(Opcode::I2d),
            (Long, Float) => Some(Opcode::L2f),
            (Long, Double) => Some(Opcode::L2d),
            (Float, Long) => Some(Opcode::F2l),
            (Float, Double) => Some(Opcode::F2d),
            (Double, Long) => Some(Opcode::D2l),
            (Double, Float) => Some(Opcode::D2f),
            (Long, _) => Some(Opcode::L2i),
            (Float, _) => Some(Opcode::F2i),
            (Double, _) => Some(Opcode::D2i),
            _ => None,
        };
        if let Some(op) = widen {
            self.em.op(op);
        }
        if !int_like(to) {
            return;
        }
        // The value is an int now; narrow it further if needed.
        let narrow = match to {
            Byte if from != Byte => Some(Opcode::I2b),
            Char if from != Char => Some(Opcode::I2c),
            Short if !matches!(from, Byte | Short) => Some(Opcode::I2s),
            _ => None,
        };
        if let Some(op) = narrow {
            self.em.op(op);
        }
    }
}
