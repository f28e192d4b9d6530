//! Method body emitter.
//!
//! [`MethodEmitter`] writes the instructions of one method into a
//! [`CodeBuffer`], interning every constant it references in the class's
//! shared [`ConstantPool`]. While it emits it tracks the operand stack depth
//! and the highest local slot, so `max_stack` and `max_locals` come out of
//! [`MethodEmitter::finish`] without a separate analysis pass.
//!
//! Jumps go to [`Label`]s, which may be placed before or after the jump;
//! offsets are patched when the method is finished.
//!
//! # Example
//!
//! ```
//! use latte_compiler::bytecode::{ConstantPool, Opcode};
//! use latte_compiler::emit::MethodEmitter;
//! use latte_core::JvmType;
//!
//! let mut pool = ConstantPool::new();
//! let mut emitter = MethodEmitter::new(&mut pool, "inc", 1);
//! emitter.load(&JvmType::int(), 0);
//! emitter.push_int(1);
//! emitter.op(Opcode::Iadd);
//! emitter.return_value(&JvmType::int());
//!
//! let code = emitter.finish().unwrap();
//! assert_eq!(code.max_stack, 2);
//! assert_eq!(code.max_locals, 1);
//! ```

mod jumps;

use latte_core::{CodeGenError, JvmType, MethodDescriptor, PrimitiveKind, Span};

use crate::bytecode::{CodeAttribute, CodeBuffer, ConstantPool, ExceptionEntry, Opcode};
pub use jumps::{JumpManager, LoopContext};

/// A position in the instruction stream, possibly not placed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Static,
    Virtual,
    Special,
    Interface,
}

impl InvokeKind {
    fn opcode(self) -> Opcode {
        match self {
            InvokeKind::Static => Opcode::Invokestatic,
            InvokeKind::Virtual => Opcode::Invokevirtual,
            InvokeKind::Special => Opcode::Invokespecial,
            InvokeKind::Interface => Opcode::Invokeinterface,
        }
    }
}

/// How a value occupies a local slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Int,
    Long,
    Float,
    Double,
    Ref,
}

impl SlotKind {
    fn of(ty: &JvmType) -> Self {
        match ty.primitive() {
            Some(PrimitiveKind::Long) => SlotKind::Long,
            Some(PrimitiveKind::Float) => SlotKind::Float,
            Some(PrimitiveKind::Double) => SlotKind::Double,
            Some(_) => SlotKind::Int,
            None => SlotKind::Ref,
        }
    }

    fn size(self) -> u16 {
        match self {
            SlotKind::Long | SlotKind::Double => 2,
            _ => 1,
        }
    }

    /// Long form plus the `_0` .. `_3` short forms.
    fn loads(self) -> (Opcode, [Opcode; 4]) {
        use Opcode::*;
        match self {
            SlotKind::Int => (Iload, [Iload0, Iload1, Iload2, Iload3]),
            SlotKind::Long => (Lload, [Lload0, Lload1, Lload2, Lload3]),
            SlotKind::Float => (Fload, [Fload0, Fload1, Fload2, Fload3]),
            SlotKind::Double => (Dload, [Dload0, Dload1, Dload2, Dload3]),
            SlotKind::Ref => (Aload, [Aload0, Aload1, Aload2, Aload3]),
        }
    }

    fn stores(self) -> (Opcode, [Opcode; 4]) {
        use Opcode::*;
        match self {
            SlotKind::Int => (Istore, [Istore0, Istore1, Istore2, Istore3]),
            SlotKind::Long => (Lstore, [Lstore0, Lstore1, Lstore2, Lstore3]),
            SlotKind::Float => (Fstore, [Fstore0, Fstore1, Fstore2, Fstore3]),
            SlotKind::Double => (Dstore, [Dstore0, Dstore1, Dstore2, Dstore3]),
            SlotKind::Ref => (Astore, [Astore0, Astore1, Astore2, Astore3]),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LabelState {
    position: Option<usize>,
    /// Stack depth on arrival, recorded by the first jump or placement.
    depth: Option<u16>,
}

#[derive(Debug, Clone, Copy)]
struct Fixup {
    instruction: usize,
    operand: usize,
    label: Label,
}

#[derive(Debug, Clone, Copy)]
struct PendingHandler {
    start: Label,
    end: Label,
    handler: Label,
    catch_type: u16,
}

/// Emits the body of a single method.
pub struct MethodEmitter<'pool> {
    method: String,
    code: CodeBuffer,
    pool: &'pool mut ConstantPool,
    depth: u16,
    max_stack: u16,
    max_locals: u16,
    labels: Vec<LabelState>,
    fixups: Vec<Fixup>,
    handlers: Vec<PendingHandler>,
    reachable: bool,
    jumps: JumpManager,
}

impl<'pool> MethodEmitter<'pool> {
    /// `arg_slots` counts `this` for instance methods.
    pub fn new(pool: &'pool mut ConstantPool, method: &str, arg_slots: u16) -> Self {
        Self {
            method: method.to_string(),
            code: CodeBuffer::new(),
            pool,
            depth: 0,
            max_stack: 0,
            max_locals: arg_slots,
            labels: Vec::new(),
            fixups: Vec::new(),
            handlers: Vec::new(),
            reachable: true,
            jumps: JumpManager::new(),
        }
    }

    pub fn pool(&mut self) -> &mut ConstantPool {
        self.pool
    }

    pub fn jumps(&mut self) -> &mut JumpManager {
        &mut self.jumps
    }

    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Whether the next instruction can be reached by falling through.
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn stack_depth(&self) -> u16 {
        self.depth
    }

    pub fn method_name(&self) -> &str {
        &self.method
    }

    fn adjust(&mut self, delta: i32) {
        let depth = (self.depth as i32 + delta).max(0);
        self.depth = depth as u16;
        self.max_stack = self.max_stack.max(self.depth);
    }

    fn after(&mut self, op: Opcode) {
        if op.ends_flow() {
            self.reachable = false;
        }
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    /// Emit an instruction without operands, or whose stack effect does not
    /// depend on its operands.
    pub fn op(&mut self, op: Opcode) {
        debug_assert!(op.stack_effect().is_some(), "{op:?} needs a dedicated emitter");
        self.code.write_op(op);
        self.adjust(op.stack_effect().unwrap_or(0) as i32);
        self.after(op);
    }

    /// Pop a value of the given type, if it has one.
    pub fn pop_value(&mut self, ty: &JvmType) {
        match ty.slots() {
            0 => {}
            1 => self.op(Opcode::Pop),
            _ => self.op(Opcode::Pop2),
        }
    }

    pub fn dup_value(&mut self, ty: &JvmType) {
        match ty.slots() {
            0 => {}
            1 => self.op(Opcode::Dup),
            _ => self.op(Opcode::Dup2),
        }
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    pub fn push_int(&mut self, value: i32) {
        match value {
            -1 => self.op(Opcode::IconstM1),
            0 => self.op(Opcode::Iconst0),
            1 => self.op(Opcode::Iconst1),
            2 => self.op(Opcode::Iconst2),
            3 => self.op(Opcode::Iconst3),
            4 => self.op(Opcode::Iconst4),
            5 => self.op(Opcode::Iconst5),
            v if i8::try_from(v).is_ok() => {
                self.code.write_op(Opcode::Bipush);
                self.code.write_u8(v as i8 as u8);
                self.adjust(1);
            }
            v if i16::try_from(v).is_ok() => {
                self.code.write_op(Opcode::Sipush);
                self.code.write_i16(v as i16);
                self.adjust(1);
            }
            v => {
                let index = self.pool.integer(v);
                self.ldc(index);
            }
        }
    }

    pub fn push_bool(&mut self, value: bool) {
        self.push_int(value as i32);
    }

    pub fn push_long(&mut self, value: i64) {
        match value {
            0 => self.op(Opcode::Lconst0),
            1 => self.op(Opcode::Lconst1),
            v => {
                let index = self.pool.long(v);
                self.ldc2(index);
            }
        }
    }

    pub fn push_float(&mut self, value: f32) {
        if value.to_bits() == 0 {
            self.op(Opcode::Fconst0);
        } else if value == 1.0 {
            self.op(Opcode::Fconst1);
        } else if value == 2.0 {
            self.op(Opcode::Fconst2);
        } else {
            let index = self.pool.float(value);
            self.ldc(index);
        }
    }

    pub fn push_double(&mut self, value: f64) {
        if value.to_bits() == 0 {
            self.op(Opcode::Dconst0);
        } else if value == 1.0 {
            self.op(Opcode::Dconst1);
        } else {
            let index = self.pool.double(value);
            self.ldc2(index);
        }
    }

    pub fn push_string(&mut self, value: &str) {
        let index = self.pool.string(value);
        self.ldc(index);
    }

    /// Push a `java.lang.Class` constant.
    pub fn push_class(&mut self, internal_name: &str) {
        let index = self.pool.class(internal_name);
        self.ldc(index);
    }

    pub fn push_null(&mut self) {
        self.op(Opcode::AconstNull);
    }

    fn ldc(&mut self, index: u16) {
        if index < 256 {
            self.code.write_op(Opcode::Ldc);
            self.code.write_u8(index as u8);
        } else {
            self.code.write_op(Opcode::LdcW);
            self.code.write_u16(index);
        }
        self.adjust(1);
    }

    fn ldc2(&mut self, index: u16) {
        self.code.write_op(Opcode::Ldc2W);
        self.code.write_u16(index);
        self.adjust(2);
    }

    // ==========================================================================
    // Local Variables
    // ==========================================================================

    pub fn load(&mut self, ty: &JvmType, slot: u16) {
        let kind = SlotKind::of(ty);
        let (long, short) = kind.loads();
        self.local_insn(long, short, kind.size(), slot);
        self.adjust(kind.size() as i32);
    }

    pub fn store(&mut self, ty: &JvmType, slot: u16) {
        let kind = SlotKind::of(ty);
        let (long, short) = kind.stores();
        self.local_insn(long, short, kind.size(), slot);
        self.adjust(-(kind.size() as i32));
    }

    /// Add a constant to an `int` local.
    pub fn iinc(&mut self, slot: u16, delta: i16) {
        if let (Ok(slot), Ok(delta)) = (u8::try_from(slot), i8::try_from(delta)) {
            self.code.write_op(Opcode::Iinc);
            self.code.write_u8(slot);
            self.code.write_u8(delta as u8);
        } else {
            self.code.write_op(Opcode::Wide);
            self.code.write_op(Opcode::Iinc);
            self.code.write_u16(slot);
            self.code.write_i16(delta);
        }
        self.max_locals = self.max_locals.max(slot.saturating_add(1));
    }

    /// Load an element of an array of `element`s; array and index are on
    /// the stack.
    pub fn array_load(&mut self, element: &JvmType) {
        let op = match element.primitive() {
            Some(PrimitiveKind::Boolean | PrimitiveKind::Byte) => Opcode::Baload,
            Some(PrimitiveKind::Char) => Opcode::Caload,
            Some(PrimitiveKind::Short) => Opcode::Saload,
            Some(PrimitiveKind::Int) => Opcode::Iaload,
            Some(PrimitiveKind::Long) => Opcode::Laload,
            Some(PrimitiveKind::Float) => Opcode::Faload,
            Some(PrimitiveKind::Double) => Opcode::Daload,
            None => Opcode::Aaload,
        };
        self.op(op);
    }

    /// Make `max_locals` cover the first `slots` locals, used or not.
    pub fn reserve_locals(&mut self, slots: u16) {
        self.max_locals = self.max_locals.max(slots);
    }

    fn local_insn(&mut self, long: Opcode, short: [Opcode; 4], size: u16, slot: u16) {
        if let Some(op) = short.get(slot as usize) {
            self.code.write_op(*op);
        } else if slot < 256 {
            self.code.write_op(long);
            self.code.write_u8(slot as u8);
        } else {
            self.code.write_op(Opcode::Wide);
            self.code.write_op(long);
            self.code.write_u16(slot);
        }
        self.max_locals = self.max_locals.max(slot.saturating_add(size));
    }

    // ==========================================================================
    // Members
    // ==========================================================================

    pub fn invoke(&mut self, kind: InvokeKind, owner: &str, name: &str, descriptor: &MethodDescriptor) {
        let desc = descriptor.to_string();
        let index = match kind {
            InvokeKind::Interface => self.pool.interface_method_ref(owner, name, &desc),
            _ => self.pool.method_ref(owner, name, &desc),
        };
        self.code.write_op(kind.opcode());
        self.code.write_u16(index);
        let receiver = if kind == InvokeKind::Static { 0 } else { 1 };
        if kind == InvokeKind::Interface {
            self.code.write_u8((descriptor.arg_slots() + receiver) as u8);
            self.code.write_u8(0);
        }
        let popped = (descriptor.arg_slots() + receiver) as i32;
        self.adjust(descriptor.ret.slots() as i32 - popped);
    }

    pub fn get_field(&mut self, owner: &str, name: &str, ty: &JvmType) {
        self.field_insn(Opcode::Getfield, owner, name, ty, ty.slots() as i32 - 1);
    }

    pub fn put_field(&mut self, owner: &str, name: &str, ty: &JvmType) {
        self.field_insn(Opcode::Putfield, owner, name, ty, -(ty.slots() as i32) - 1);
    }

    pub fn get_static(&mut self, owner: &str, name: &str, ty: &JvmType) {
        self.field_insn(Opcode::Getstatic, owner, name, ty, ty.slots() as i32);
    }

    pub fn put_static(&mut self, owner: &str, name: &str, ty: &JvmType) {
        self.field_insn(Opcode::Putstatic, owner, name, ty, -(ty.slots() as i32));
    }

    fn field_insn(&mut self, op: Opcode, owner: &str, name: &str, ty: &JvmType, delta: i32) {
        let index = self.pool.field_ref(owner, name, &ty.descriptor());
        self.code.write_op(op);
        self.code.write_u16(index);
        self.adjust(delta);
    }

    /// `new`, `checkcast`, `instanceof` or `anewarray`.
    pub fn type_insn(&mut self, op: Opcode, class_operand: &str) {
        debug_assert!(matches!(
            op,
            Opcode::New | Opcode::Checkcast | Opcode::Instanceof | Opcode::Anewarray
        ));
        let index = self.pool.class(class_operand);
        self.code.write_op(op);
        self.code.write_u16(index);
        self.adjust(op.stack_effect().unwrap_or(0) as i32);
    }

    pub fn return_value(&mut self, ty: &JvmType) {
        let op = match SlotKind::of(ty) {
            _ if ty.is_void() => Opcode::Return,
            SlotKind::Int => Opcode::Ireturn,
            SlotKind::Long => Opcode::Lreturn,
            SlotKind::Float => Opcode::Freturn,
            SlotKind::Double => Opcode::Dreturn,
            SlotKind::Ref => Opcode::Areturn,
        };
        self.op(op);
    }

    // ==========================================================================
    // Control Flow
    // ==========================================================================

    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelState::default());
        Label(self.labels.len() as u32 - 1)
    }

    /// Bind `label` to the next instruction. Code after an unconditional
    /// jump becomes reachable again only if something jumps to `label`.
    pub fn place(&mut self, label: Label) {
        let offset = self.code.len();
        let state = &mut self.labels[label.0 as usize];
        state.position = Some(offset);
        if self.reachable {
            state.depth.get_or_insert(self.depth);
        } else if let Some(depth) = state.depth {
            self.depth = depth;
            self.reachable = true;
        }
    }

    /// Bind an exception handler entry; the thrown value is on the stack.
    pub fn place_handler(&mut self, label: Label) {
        self.reachable = false;
        self.labels[label.0 as usize].depth = Some(1);
        self.place(label);
        self.max_stack = self.max_stack.max(1);
    }

    pub fn jump(&mut self, op: Opcode, label: Label) {
        debug_assert!(op.is_branch(), "{op:?} is not a branch");
        let instruction = self.code.len();
        self.code.write_op(op);
        let operand = self.code.len();
        self.code.write_i16(0);
        self.adjust(op.stack_effect().unwrap_or(0) as i32);
        self.labels[label.0 as usize].depth.get_or_insert(self.depth);
        self.fixups.push(Fixup {
            instruction,
            operand,
            label,
        });
        self.after(op);
    }

    /// Protect `[start, end)` with a handler. Empty ranges are dropped when
    /// the method is finished.
    pub fn add_handler(&mut self, start: Label, end: Label, handler: Label, catch_type: Option<&str>) {
        let catch_type = catch_type.map_or(0, |name| self.pool.class(name));
        self.handlers.push(PendingHandler {
            start,
            end,
            handler,
            catch_type,
        });
    }

    fn position(&self, label: Label) -> Result<usize, CodeGenError> {
        self.labels[label.0 as usize]
            .position
            .ok_or_else(|| CodeGenError::Unsupported {
                what: format!("jump to an unplaced label in '{}'", self.method),
                span: Span::default(),
            })
    }

    /// Patch jumps and build the `Code` attribute.
    pub fn finish(mut self) -> Result<CodeAttribute, CodeGenError> {
        let too_large = || CodeGenError::CodeTooLarge {
            method: self.method.clone(),
        };
        if self.code.len() > u16::MAX as usize {
            return Err(too_large());
        }

        for fixup in std::mem::take(&mut self.fixups) {
            let target = self.position(fixup.label)?;
            let delta = target as i64 - fixup.instruction as i64;
            let delta = i16::try_from(delta).map_err(|_| too_large())?;
            self.code.patch_i16(fixup.operand, delta);
        }

        let mut exception_table = Vec::with_capacity(self.handlers.len());
        for pending in &self.handlers {
            let start = self.position(pending.start)? as u16;
            let end = self.position(pending.end)? as u16;
            if start >= end {
                continue;
            }
            exception_table.push(ExceptionEntry {
                start_pc: start,
                end_pc: end,
                handler_pc: self.position(pending.handler)? as u16,
                catch_type: pending.catch_type,
            });
        }

        Ok(CodeAttribute {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code: self.code.into_bytes(),
            exception_table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Constant, Opcode};

    fn emit(arg_slots: u16, f: impl FnOnce(&mut MethodEmitter<'_>)) -> (CodeAttribute, ConstantPool) {
        let mut pool = ConstantPool::new();
        let mut emitter = MethodEmitter::new(&mut pool, "m", arg_slots);
        f(&mut emitter);
        let code = emitter.finish().unwrap();
        (code, pool)
    }

    #[test]
    fn small_ints_use_short_forms() {
        let (code, pool) = emit(0, |e| {
            e.push_int(-1);
            e.push_int(5);
            e.push_int(100);
            e.push_int(1000);
            e.push_int(100_000);
        });
        assert_eq!(&code.code[..2], &[0x02, 0x08]);
        assert_eq!(&code.code[2..4], &[0x10, 100]);
        assert_eq!(&code.code[4..7], &[0x11, 0x03, 0xe8]);
        assert_eq!(code.code[7], 0x12);
        assert_eq!(pool.get(code.code[8] as u16), Some(&Constant::Integer(100_000)));
        assert_eq!(code.max_stack, 5);
    }

    #[test]
    fn wide_constants_take_two_stack_slots() {
        let (code, _) = emit(0, |e| {
            e.push_long(7);
            e.push_double(0.5);
        });
        assert_eq!(code.code[0], 0x14);
        assert_eq!(code.max_stack, 4);
    }

    #[test]
    fn negative_zero_is_not_a_short_constant() {
        let (code, _) = emit(0, |e| e.push_double(-0.0));
        assert_eq!(code.code[0], 0x14);
    }

    #[test]
    fn locals_pick_the_right_form() {
        let (code, _) = emit(0, |e| {
            e.push_long(0);
            e.store(&JvmType::Primitive(PrimitiveKind::Long), 2);
            e.push_null();
            e.store(&JvmType::object(), 7);
            e.push_int(0);
            e.store(&JvmType::int(), 300);
        });
        assert_eq!(code.code[1], 0x41); // lstore_2
        assert_eq!(&code.code[3..5], &[0x3a, 7]); // astore 7
        assert_eq!(&code.code[6..10], &[0xc4, 0x36, 0x01, 0x2c]); // wide istore 300
        assert_eq!(code.max_locals, 301);
    }

    #[test]
    fn iinc_widens_for_far_slots_and_large_steps() {
        let (code, _) = emit(0, |e| {
            e.iinc(1, 1);
            e.iinc(300, -200);
        });
        assert_eq!(&code.code[..3], &[0x84, 1, 1]);
        assert_eq!(&code.code[3..], &[0xc4, 0x84, 0x01, 0x2c, 0xff, 0x38]);
        assert_eq!(code.max_locals, 301);
        assert_eq!(code.max_stack, 0);
    }

    #[test]
    fn forward_and_backward_jumps() {
        let (code, _) = emit(1, |e| {
            let top = e.new_label();
            let end = e.new_label();
            e.place(top);
            e.load(&JvmType::int(), 0);
            e.jump(Opcode::Ifeq, end);
            e.jump(Opcode::Goto, top);
            e.place(end);
            e.return_value(&JvmType::Void);
        });
        // 0: iload_0, 1: ifeq +6 -> 7, 4: goto -4 -> 0, 7: return
        assert_eq!(code.code, vec![0x1a, 0x99, 0x00, 0x06, 0xa7, 0xff, 0xfc, 0xb1]);
        assert_eq!(code.max_stack, 1);
    }

    #[test]
    fn unreachable_code_restores_label_depth() {
        let mut pool = ConstantPool::new();
        let mut e = MethodEmitter::new(&mut pool, "m", 0);
        let end = e.new_label();
        e.push_int(1);
        e.jump(Opcode::Goto, end);
        assert!(!e.is_reachable());
        e.place(end);
        assert!(e.is_reachable());
        assert_eq!(e.stack_depth(), 1);
    }

    #[test]
    fn labels_nobody_jumps_to_stay_unreachable() {
        let mut pool = ConstantPool::new();
        let mut e = MethodEmitter::new(&mut pool, "m", 0);
        let dead = e.new_label();
        e.return_value(&JvmType::Void);
        e.place(dead);
        assert!(!e.is_reachable());
    }

    #[test]
    fn invocations_track_the_stack() {
        let (code, pool) = emit(1, |e| {
            e.load(&JvmType::object(), 0);
            e.push_string("x");
            e.invoke(
                InvokeKind::Interface,
                "java/util/List",
                "add",
                &MethodDescriptor::new(
                    vec![JvmType::object()],
                    JvmType::Primitive(PrimitiveKind::Boolean),
                ),
            );
            e.op(Opcode::Pop);
        });
        assert_eq!(code.code[3], 0xb9);
        assert_eq!(&code.code[6..8], &[2, 0]);
        assert_eq!(code.max_stack, 2);
        let index = u16::from_be_bytes([code.code[4], code.code[5]]);
        assert_eq!(pool.member_at(index), Some(("java/util/List", "add", "(Ljava/lang/Object;)Z")));
    }

    #[test]
    fn empty_handler_ranges_are_dropped() {
        let (code, _) = emit(0, |e| {
            let start = e.new_label();
            let end = e.new_label();
            let handler = e.new_label();
            let empty = e.new_label();
            e.place(start);
            e.place(empty);
            e.op(Opcode::Nop);
            e.place(end);
            e.add_handler(start, end, handler, None);
            e.add_handler(empty, start, handler, None);
            e.return_value(&JvmType::Void);
            e.place_handler(handler);
            e.op(Opcode::Athrow);
        });
        assert_eq!(code.exception_table.len(), 1);
        assert_eq!(code.exception_table[0].start_pc, 0);
        assert_eq!(code.exception_table[0].end_pc, 1);
        assert_eq!(code.exception_table[0].handler_pc, 2);
    }

    #[test]
    fn unplaced_labels_are_reported() {
        let mut pool = ConstantPool::new();
        let mut e = MethodEmitter::new(&mut pool, "m", 0);
        let nowhere = e.new_label();
        e.jump(Opcode::Goto, nowhere);
        assert!(e.finish().is_err());
    }
}
