//! Operators and conditions.
//!
//! Operands whose kinds are known numeric (primitives or their boxes) are
//! promoted to a common kind and use the matching JVM instruction; `+` with
//! a `String` side concatenates; everything else is evaluated by
//! `LtRuntime.binary`/`LtRuntime.unary` on boxed operands.
//!
//! Comparisons and `&&`/`||` are compiled as jumps by
//! [`FnGen::emit_branch`]; in value position they produce `0`/`1`.

use latte_core::{CodeGenError, JvmType, MethodDescriptor, PrimitiveKind, Span};
use latte_parser::{BinaryOp, Literal, UnaryOp};

use super::function::FnGen;
use super::{LT_RUNTIME, Result};
use crate::bytecode::Opcode;
use crate::emit::{InvokeKind, Label};
use crate::hir::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryPlan {
    /// Arithmetic or bitwise in the given kind (`Boolean` for `&`, `|`, `^`
    /// on booleans).
    Arithmetic(PrimitiveKind),
    /// Left operand in the given kind, shift distance as `int`.
    Shift(PrimitiveKind),
    Compare(PrimitiveKind),
    /// `x == null`; the flag tells which side is the literal.
    NullCheck { null_left: bool },
    /// Reference identity.
    Identity,
    Logical,
    Concat,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryPlan {
    Numeric(PrimitiveKind),
    Not,
    Dynamic,
}

/// Numeric kind of a primitive or box.
fn numeric_kind(ty: &JvmType) -> Option<PrimitiveKind> {
    let kind = match ty {
        JvmType::Primitive(p) => *p,
        JvmType::Reference(name) => PrimitiveKind::from_box_class(name)?,
        _ => return None,
    };
    kind.is_numeric().then_some(kind)
}

fn is_boolean(ty: &JvmType) -> bool {
    match ty {
        JvmType::Primitive(p) => *p == PrimitiveKind::Boolean,
        JvmType::Reference(name) => name == PrimitiveKind::Boolean.box_class(),
        _ => false,
    }
}

/// Binary numeric promotion.
fn promote(a: PrimitiveKind, b: PrimitiveKind) -> PrimitiveKind {
    match a.promotion_rank().max(b.promotion_rank()) {
        2 => PrimitiveKind::Long,
        3 => PrimitiveKind::Float,
        4 => PrimitiveKind::Double,
        _ => PrimitiveKind::Int,
    }
}

fn is_null(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(Literal::Null, _))
}

pub(crate) fn is_condition(op: BinaryOp) -> bool {
    use BinaryOp::*;
    matches!(op, Or | And | Eq | Ne | RefEq | RefNe | Lt | Le | Gt | Ge)
}

pub(crate) fn plan_binary(op: BinaryOp, left: &JvmType, right: &JvmType, null_left: bool, null_right: bool) -> BinaryPlan {
    use BinaryOp::*;
    let numeric = numeric_kind(left).zip(numeric_kind(right)).map(|(a, b)| promote(a, b));
    let has_primitive = left.primitive().is_some() || right.primitive().is_some();
    match op {
        Or | And => BinaryPlan::Logical,
        Eq | Ne | RefEq | RefNe if null_left || null_right => BinaryPlan::NullCheck { null_left },
        Eq | Ne | RefEq | RefNe if is_boolean(left) && is_boolean(right) && has_primitive => {
            BinaryPlan::Compare(PrimitiveKind::Boolean)
        }
        Eq | Ne | RefEq | RefNe if numeric.is_some() && has_primitive => numeric.map_or(BinaryPlan::Dynamic, BinaryPlan::Compare),
        RefEq | RefNe => BinaryPlan::Identity,
        Lt | Le | Gt | Ge => numeric.map_or(BinaryPlan::Dynamic, BinaryPlan::Compare),
        Add if *left == JvmType::string() || *right == JvmType::string() => BinaryPlan::Concat,
        Add | Sub | Mul | Div | Rem => numeric.map_or(BinaryPlan::Dynamic, BinaryPlan::Arithmetic),
        BitAnd | BitOr | BitXor if is_boolean(left) && is_boolean(right) => {
            BinaryPlan::Arithmetic(PrimitiveKind::Boolean)
        }
        BitAnd | BitOr | BitXor => match numeric {
            Some(kind @ (PrimitiveKind::Int | PrimitiveKind::Long))
                if numeric_kind(left).is_some_and(PrimitiveKind::is_integral)
                    && numeric_kind(right).is_some_and(PrimitiveKind::is_integral) =>
            {
                BinaryPlan::Arithmetic(kind)
            }
            _ => BinaryPlan::Dynamic,
        },
        Shl | Shr | UShr => match (numeric_kind(left), numeric_kind(right)) {
            (Some(l), Some(r)) if l.is_integral() && r.is_integral() => {
                BinaryPlan::Shift(if l == PrimitiveKind::Long { l } else { PrimitiveKind::Int })
            }
            _ => BinaryPlan::Dynamic,
        },
        Eq | Ne => BinaryPlan::Dynamic,
    }
}

pub(crate) fn plan_unary(op: UnaryOp, operand: &JvmType) -> UnaryPlan {
    let numeric = numeric_kind(operand).map(|k| promote(k, PrimitiveKind::Int));
    match op {
        UnaryOp::Neg | UnaryOp::Plus => numeric.map_or(UnaryPlan::Dynamic, UnaryPlan::Numeric),
        UnaryOp::BitNot => match numeric {
            Some(kind @ (PrimitiveKind::Int | PrimitiveKind::Long)) if numeric_kind(operand).is_some_and(PrimitiveKind::is_integral) => {
                UnaryPlan::Numeric(kind)
            }
            _ => UnaryPlan::Dynamic,
        },
        UnaryOp::Not if is_boolean(operand) => UnaryPlan::Not,
        UnaryOp::Not => UnaryPlan::Dynamic,
    }
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Plus => "+",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
    }
}

/// Instruction for an arithmetic or bitwise operator in `kind`.
fn arithmetic_opcode(op: BinaryOp, kind: PrimitiveKind) -> Option<Opcode> {
    use BinaryOp::*;
    use Opcode::*;
    let [int, long, float, double] = match op {
        Add => [Iadd, Ladd, Fadd, Dadd],
        Sub => [Isub, Lsub, Fsub, Dsub],
        Mul => [Imul, Lmul, Fmul, Dmul],
        Div => [Idiv, Ldiv, Fdiv, Ddiv],
        Rem => [Irem, Lrem, Frem, Drem],
        BitAnd => [Iand, Land, Nop, Nop],
        BitOr => [Ior, Lor, Nop, Nop],
        BitXor => [Ixor, Lxor, Nop, Nop],
        Shl => [Ishl, Lshl, Nop, Nop],
        Shr => [Ishr, Lshr, Nop, Nop],
        UShr => [Iushr, Lushr, Nop, Nop],
        _ => return None,
    };
    let op = match kind {
        PrimitiveKind::Long => long,
        PrimitiveKind::Float => float,
        PrimitiveKind::Double => double,
        _ => int,
    };
    (op != Nop).then_some(op)
}

/// `(single-operand branch, two-int-operand branch)` taken when `op` holds.
fn condition_opcodes(op: BinaryOp) -> (Opcode, Opcode) {
    use BinaryOp::*;
    match op {
        Eq | RefEq => (Opcode::Ifeq, Opcode::IfIcmpeq),
        Ne | RefNe => (Opcode::Ifne, Opcode::IfIcmpne),
        Lt => (Opcode::Iflt, Opcode::IfIcmplt),
        Le => (Opcode::Ifle, Opcode::IfIcmple),
        Gt => (Opcode::Ifgt, Opcode::IfIcmpgt),
        _ => (Opcode::Ifge, Opcode::IfIcmpge),
    }
}

/// The comparison that holds exactly when `op` does not.
fn negate(op: BinaryOp) -> BinaryOp {
    use BinaryOp::*;
    match op {
        Eq => Ne,
        Ne => Eq,
        RefEq => RefNe,
        RefNe => RefEq,
        Lt => Ge,
        Ge => Lt,
        Le => Gt,
        Gt => Le,
        other => other,
    }
}

fn binary_desc() -> MethodDescriptor {
    MethodDescriptor::new(
        vec![JvmType::string(), JvmType::object(), JvmType::object()],
        JvmType::object(),
    )
}

fn unary_desc() -> MethodDescriptor {
    MethodDescriptor::new(vec![JvmType::string(), JvmType::object()], JvmType::object())
}

impl FnGen<'_, '_> {
    // ==========================================================================
    // Typing
    // ==========================================================================

    pub(crate) fn binary_plan(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<BinaryPlan> {
        let lt = if is_null(left) { JvmType::object() } else { self.type_of(left)? };
        let rt = if is_null(right) { JvmType::object() } else { self.type_of(right)? };
        Ok(plan_binary(op, &lt, &rt, is_null(left), is_null(right)))
    }

    pub(crate) fn binary_type(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<JvmType> {
        if is_condition(op) {
            return Ok(PrimitiveKind::Boolean.into());
        }
        Ok(match self.binary_plan(op, left, right)? {
            BinaryPlan::Arithmetic(kind) | BinaryPlan::Shift(kind) => kind.into(),
            BinaryPlan::Concat => JvmType::string(),
            _ => JvmType::object(),
        })
    }

    pub(crate) fn unary_type(&self, op: UnaryOp, operand: &Expr) -> Result<JvmType> {
        let ty = self.type_of(operand)?;
        Ok(match plan_unary(op, &ty) {
            UnaryPlan::Numeric(kind) => kind.into(),
            UnaryPlan::Not => PrimitiveKind::Boolean.into(),
            UnaryPlan::Dynamic => JvmType::object(),
        })
    }

    // ==========================================================================
    // Values
    // ==========================================================================

    pub(crate) fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> Result<JvmType> {
        if is_condition(op) {
            return self.condition_value(op, left, right, span);
        }
        let lt = self.expr(left)?;
        self.binary_tail(op, &lt, right, span)
    }

    /// Apply `op` to the left operand already on the stack and `right`.
    /// Compound assignments share this with plain binary expressions.
    pub(crate) fn binary_tail(&mut self, op: BinaryOp, lt: &JvmType, right: &Expr, span: Span) -> Result<JvmType> {
        let rt = if is_null(right) { JvmType::object() } else { self.type_of(right)? };
        match plan_binary(op, lt, &rt, false, is_null(right)) {
            BinaryPlan::Arithmetic(kind) => {
                let kind_ty = JvmType::Primitive(kind);
                self.convert(lt, &kind_ty, span)?;
                self.expr_as(right, &kind_ty)?;
                let opcode = arithmetic_opcode(op, kind).ok_or_else(|| CodeGenError::Unsupported {
                    what: format!("operator '{}' on {kind}", op.symbol()),
                    span,
                })?;
                self.em.op(opcode);
                Ok(kind_ty)
            }
            BinaryPlan::Shift(kind) => {
                let kind_ty = JvmType::Primitive(kind);
                self.convert(lt, &kind_ty, span)?;
                self.expr_as(right, &JvmType::int())?;
                let opcode = arithmetic_opcode(op, kind).ok_or_else(|| CodeGenError::Unsupported {
                    what: format!("operator '{}' on {kind}", op.symbol()),
                    span,
                })?;
                self.em.op(opcode);
                Ok(kind_ty)
            }
            BinaryPlan::Concat => {
                self.string_value_of(lt);
                let rt = self.expr(right)?;
                self.string_value_of(&rt);
                let desc = MethodDescriptor::new(vec![JvmType::string()], JvmType::string());
                self.em.invoke(InvokeKind::Virtual, latte_core::STRING, "concat", &desc);
                Ok(JvmType::string())
            }
            _ => {
                self.dynamic_binary_tail(op, lt, right, span)?;
                if is_condition(op) {
                    self.convert(&JvmType::object(), &PrimitiveKind::Boolean.into(), span)?;
                    return Ok(PrimitiveKind::Boolean.into());
                }
                Ok(JvmType::object())
            }
        }
    }

    /// `LtRuntime.binary(symbol, left, right)` with `left` on the stack.
    fn dynamic_binary_tail(&mut self, op: BinaryOp, lt: &JvmType, right: &Expr, span: Span) -> Result<()> {
        self.box_value(lt, span)?;
        self.em.push_string(op.symbol());
        self.em.op(Opcode::Swap);
        self.expr_as(right, &JvmType::object())?;
        self.em.invoke(InvokeKind::Static, LT_RUNTIME, "binary", &binary_desc());
        Ok(())
    }

    /// `String.valueOf(value)` for the value on the stack.
    fn string_value_of(&mut self, ty: &JvmType) {
        let param = match ty.primitive() {
            Some(PrimitiveKind::Byte | PrimitiveKind::Short) => JvmType::int(),
            Some(p) => JvmType::Primitive(p),
            None => JvmType::object(),
        };
        let desc = MethodDescriptor::new(vec![param], JvmType::string());
        self.em.invoke(InvokeKind::Static, latte_core::STRING, "valueOf", &desc);
    }

    pub(crate) fn unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> Result<JvmType> {
        let ty = self.expr(operand)?;
        match plan_unary(op, &ty) {
            UnaryPlan::Numeric(kind) => {
                let kind_ty = JvmType::Primitive(kind);
                self.convert(&ty, &kind_ty, span)?;
                match (op, kind) {
                    (UnaryOp::Neg, PrimitiveKind::Long) => self.em.op(Opcode::Lneg),
                    (UnaryOp::Neg, PrimitiveKind::Float) => self.em.op(Opcode::Fneg),
                    (UnaryOp::Neg, PrimitiveKind::Double) => self.em.op(Opcode::Dneg),
                    (UnaryOp::Neg, _) => self.em.op(Opcode::Ineg),
                    (UnaryOp::BitNot, PrimitiveKind::Long) => {
                        self.em.push_long(-1);
                        self.em.op(Opcode::Lxor);
                    }
                    (UnaryOp::BitNot, _) => {
                        self.em.push_int(-1);
                        self.em.op(Opcode::Ixor);
                    }
                    _ => {}
                }
                Ok(kind_ty)
            }
            UnaryPlan::Not => {
                let boolean = JvmType::Primitive(PrimitiveKind::Boolean);
                self.convert(&ty, &boolean, span)?;
                self.em.push_int(1);
                self.em.op(Opcode::Ixor);
                Ok(boolean)
            }
            UnaryPlan::Dynamic => {
                self.box_value(&ty, span)?;
                self.em.push_string(unary_symbol(op));
                self.em.op(Opcode::Swap);
                self.em.invoke(InvokeKind::Static, LT_RUNTIME, "unary", &unary_desc());
                Ok(JvmType::object())
            }
        }
    }

    /// A condition in value position: `1` if it holds, else `0`.
    fn condition_value(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> Result<JvmType> {
        let holds = self.em.new_label();
        let end = self.em.new_label();
        self.binary_branch(op, left, right, holds, true, span)?;
        self.em.push_int(0);
        self.em.jump(Opcode::Goto, end);
        self.em.place(holds);
        self.em.push_int(1);
        self.em.place(end);
        Ok(PrimitiveKind::Boolean.into())
    }

    // ==========================================================================
    // Branches
    // ==========================================================================

    /// Jump to `target` when `cond` evaluates to `when`; fall through
    /// otherwise.
    pub(crate) fn emit_branch(&mut self, cond: &Expr, target: Label, when: bool) -> Result<()> {
        match cond {
            Expr::Literal(Literal::Bool(value), _) => {
                if *value == when {
                    self.em.jump(Opcode::Goto, target);
                }
                Ok(())
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
                ..
            } => self.emit_branch(operand, target, !when),
            Expr::Binary { op, left, right, span } if is_condition(*op) => {
                self.binary_branch(*op, left, right, target, when, *span)
            }
            other => {
                let ty = self.expr(other)?;
                self.convert(&ty, &PrimitiveKind::Boolean.into(), other.span())?;
                self.em.jump(if when { Opcode::Ifne } else { Opcode::Ifeq }, target);
                Ok(())
            }
        }
    }

    fn binary_branch(&mut self, op: BinaryOp, left: &Expr, right: &Expr, target: Label, when: bool, span: Span) -> Result<()> {
        match (op, when) {
            (BinaryOp::And, true) | (BinaryOp::Or, false) => {
                let skip = self.em.new_label();
                self.emit_branch(left, skip, !when)?;
                self.emit_branch(right, target, when)?;
                self.em.place(skip);
                return Ok(());
            }
            (BinaryOp::And, false) | (BinaryOp::Or, true) => {
                self.emit_branch(left, target, when)?;
                return self.emit_branch(right, target, when);
            }
            _ => {}
        }

        // Jump when `test` holds.
        let test = if when { op } else { negate(op) };
        match self.binary_plan(op, left, right)? {
            BinaryPlan::Compare(kind) => {
                let kind_ty = JvmType::Primitive(kind);
                self.expr_as(left, &kind_ty)?;
                self.expr_as(right, &kind_ty)?;
                let (single, double) = condition_opcodes(test);
                match kind {
                    PrimitiveKind::Long => {
                        self.em.op(Opcode::Lcmp);
                        self.em.jump(single, target);
                    }
                    PrimitiveKind::Float | PrimitiveKind::Double => {
                        // `fcmpg`/`dcmpg` push 1 on NaN, `fcmpl`/`dcmpl` push -1.
                        let nan_fails_less = matches!(op, BinaryOp::Lt | BinaryOp::Le);
                        let compare = match (kind, nan_fails_less) {
                            (PrimitiveKind::Float, true) => Opcode::Fcmpg,
                            (PrimitiveKind::Float, false) => Opcode::Fcmpl,
                            (_, true) => Opcode::Dcmpg,
                            (_, false) => Opcode::Dcmpl,
                        };
                        self.em.op(compare);
                        self.em.jump(single, target);
                    }
                    _ => self.em.jump(double, target),
                }
            }
            BinaryPlan::NullCheck { null_left } => {
                let value = if null_left { right } else { left };
                let ty = self.expr(value)?;
                self.box_value(&ty, span)?;
                let is_eq = matches!(test, BinaryOp::Eq | BinaryOp::RefEq);
                self.em.jump(if is_eq { Opcode::Ifnull } else { Opcode::Ifnonnull }, target);
            }
            BinaryPlan::Identity => {
                let lt = self.expr(left)?;
                self.box_value(&lt, span)?;
                let rt = self.expr(right)?;
                self.box_value(&rt, span)?;
                let is_eq = matches!(test, BinaryOp::Eq | BinaryOp::RefEq);
                self.em.jump(if is_eq { Opcode::IfAcmpeq } else { Opcode::IfAcmpne }, target);
            }
            _ => {
                let lt = self.expr(left)?;
                self.dynamic_binary_tail(op, &lt, right, span)?;
                self.convert(&JvmType::object(), &PrimitiveKind::Boolean.into(), span)?;
                self.em.jump(if when { Opcode::Ifne } else { Opcode::Ifeq }, target);
            }
        }
        Ok(())
    }
}
