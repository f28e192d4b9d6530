//! Class file disassembler.
//!
//! Reads back what [`ClassWriter`](super::ClassWriter) produced, down to
//! individual instructions, so generated code can be inspected without a
//! JVM: which methods exist, which instructions they use, which monitors
//! they enter and which ranges their exception tables protect.

use std::fmt;

use latte_registry::AccessFlags;
use thiserror::Error;

use super::constant::decode_modified_utf8;
use super::{Constant, ConstantPool, ExceptionEntry, Opcode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisasmError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {0}")]
    UnsupportedConstant(u8),
    #[error("invalid constant pool index {0}")]
    InvalidConstantIndex(u16),
    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("unsupported instruction {0:?}")]
    UnsupportedInstruction(Opcode),
}

/// Constant loaded by `ldc`, `ldc_w` or `ldc2_w`.
#[derive(Debug, Clone, PartialEq)]
pub enum LdcValue {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    /// `bipush`, `sipush`, `newarray`
    Int(i32),
    Local(u16),
    Iinc { local: u16, delta: i16 },
    /// Absolute offset of a branch target.
    Jump(u16),
    Class(String),
    Member {
        owner: String,
        name: String,
        descriptor: String,
    },
    Ldc(LdcValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: u16,
    pub opcode: Opcode,
    pub operand: Operand,
}

impl Instruction {
    /// Owner, name and descriptor of a field access or invocation.
    pub fn member(&self) -> Option<(&str, &str, &str)> {
        match &self.operand {
            Operand::Member { owner, name, descriptor } => Some((owner, name, descriptor)),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}: {}", self.offset, self.opcode.mnemonic())?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Int(v) => write!(f, " {v}"),
            Operand::Local(slot) => write!(f, " {slot}"),
            Operand::Iinc { local, delta } => write!(f, " {local}, {delta}"),
            Operand::Jump(target) => write!(f, " {target}"),
            Operand::Class(name) => write!(f, " {name}"),
            Operand::Member { owner, name, descriptor } => write!(f, " {owner}.{name}:{descriptor}"),
            Operand::Ldc(value) => write!(f, " {value:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeDump {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionEntry>,
}

impl CodeDump {
    pub fn opcodes(&self) -> impl Iterator<Item = Opcode> + '_ {
        self.instructions.iter().map(|i| i.opcode)
    }

    pub fn count(&self, opcode: Opcode) -> usize {
        self.opcodes().filter(|&op| op == opcode).count()
    }

    /// Every `invoke*` instruction.
    pub fn invocations(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().filter(|i| i.opcode.is_invoke())
    }

    /// The instruction starting at `offset`.
    pub fn at(&self, offset: u16) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.offset == offset)
    }
}

impl fmt::Display for CodeDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  stack={}, locals={}", self.max_stack, self.max_locals)?;
        for instruction in &self.instructions {
            writeln!(f, "  {instruction}")?;
        }
        for entry in &self.exception_table {
            writeln!(
                f,
                "  [{}, {}) -> {} ({})",
                entry.start_pc,
                entry.end_pc,
                entry.handler_pc,
                if entry.catch_type == 0 { "any".to_string() } else { entry.catch_type.to_string() }
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDump {
    pub name: String,
    pub descriptor: String,
    pub access: AccessFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDump {
    pub name: String,
    pub descriptor: String,
    pub access: AccessFlags,
    pub code: Option<CodeDump>,
}

impl MethodDump {
    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDump {
    pub major_version: u16,
    pub access: AccessFlags,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDump>,
    pub methods: Vec<MethodDump>,
    pub source_file: Option<String>,
}

impl ClassDump {
    pub fn field(&self, name: &str) -> Option<&FieldDump> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First method named `name`.
    pub fn method(&self, name: &str) -> Option<&MethodDump> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn methods_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a MethodDump> + use<'a, 'n> {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

impl fmt::Display for ClassDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name)?;
        if let Some(super_name) = &self.super_name {
            write!(f, " extends {super_name}")?;
        }
        if !self.interfaces.is_empty() {
            write!(f, " implements {}", self.interfaces.join(", "))?;
        }
        writeln!(f)?;
        for field in &self.fields {
            writeln!(f, " field {}:{}", field.name, field.descriptor)?;
        }
        for method in &self.methods {
            writeln!(f, " method {}{}", method.name, method.descriptor)?;
            if let Some(code) = &method.code {
                write!(f, "{code}")?;
            }
        }
        Ok(())
    }
}

/// Disassemble a class file.
pub fn disassemble(bytes: &[u8]) -> Result<ClassDump, DisasmError> {
    let mut reader = Reader { data: bytes, pos: 0 };
    if reader.u4()? != super::class_writer::MAGIC {
        return Err(DisasmError::InvalidMagic);
    }
    let _minor = reader.u2()?;
    let major_version = reader.u2()?;
    let pool = read_pool(&mut reader)?;

    let access = AccessFlags::from_bits_retain(reader.u2()?);
    let name = class_name(&pool, reader.u2()?)?;
    let super_name = match reader.u2()? {
        0 => None,
        index => Some(class_name(&pool, index)?),
    };
    let mut interfaces = Vec::new();
    for _ in 0..reader.u2()? {
        interfaces.push(class_name(&pool, reader.u2()?)?);
    }

    let mut fields = Vec::new();
    for _ in 0..reader.u2()? {
        let access = AccessFlags::from_bits_retain(reader.u2()?);
        let name = utf8(&pool, reader.u2()?)?;
        let descriptor = utf8(&pool, reader.u2()?)?;
        for _ in 0..reader.u2()? {
            reader.u2()?;
            let len = reader.u4()? as usize;
            reader.bytes(len)?;
        }
        fields.push(FieldDump { name, descriptor, access });
    }

    let mut methods = Vec::new();
    for _ in 0..reader.u2()? {
        let access = AccessFlags::from_bits_retain(reader.u2()?);
        let name = utf8(&pool, reader.u2()?)?;
        let descriptor = utf8(&pool, reader.u2()?)?;
        let mut code = None;
        for _ in 0..reader.u2()? {
            let attr_name = utf8(&pool, reader.u2()?)?;
            let len = reader.u4()? as usize;
            let body = reader.bytes(len)?;
            if attr_name == "Code" {
                code = Some(read_code(body, &pool)?);
            }
        }
        methods.push(MethodDump {
            name,
            descriptor,
            access,
            code,
        });
    }

    let mut source_file = None;
    for _ in 0..reader.u2()? {
        let attr_name = utf8(&pool, reader.u2()?)?;
        let len = reader.u4()? as usize;
        let body = reader.bytes(len)?;
        if attr_name == "SourceFile" && body.len() == 2 {
            source_file = Some(utf8(&pool, u16::from_be_bytes([body[0], body[1]]))?);
        }
    }

    Ok(ClassDump {
        major_version,
        access,
        name,
        super_name,
        interfaces,
        fields,
        methods,
        source_file,
    })
}

// ============================================================================
// Internals
// ============================================================================

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, len: usize) -> Result<&'a [u8], DisasmError> {
        let end = self.pos.checked_add(len).ok_or(DisasmError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(DisasmError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn u1(&mut self) -> Result<u8, DisasmError> {
        Ok(self.bytes(1)?[0])
    }

    fn u2(&mut self) -> Result<u16, DisasmError> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32, DisasmError> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }
}

fn read_pool(reader: &mut Reader<'_>) -> Result<ConstantPool, DisasmError> {
    let count = reader.u2()? as usize;
    let mut entries: Vec<Option<Constant>> = Vec::with_capacity(count);
    entries.push(None);
    while entries.len() < count {
        let tag = reader.u1()?;
        let constant = match tag {
            1 => {
                let len = reader.u2()? as usize;
                let index = entries.len() as u16;
                let text = decode_modified_utf8(reader.bytes(len)?).ok_or(DisasmError::InvalidConstantIndex(index))?;
                Constant::Utf8(text)
            }
            3 => Constant::Integer(reader.u4()? as i32),
            4 => Constant::Float(f32::from_bits(reader.u4()?)),
            5 => Constant::Long(((reader.u4()? as u64) << 32 | reader.u4()? as u64) as i64),
            6 => Constant::Double(f64::from_bits((reader.u4()? as u64) << 32 | reader.u4()? as u64)),
            7 => Constant::Class { name: reader.u2()? },
            8 => Constant::String { utf8: reader.u2()? },
            9 => Constant::Fieldref {
                class: reader.u2()?,
                name_and_type: reader.u2()?,
            },
            10 => Constant::Methodref {
                class: reader.u2()?,
                name_and_type: reader.u2()?,
            },
            11 => Constant::InterfaceMethodref {
                class: reader.u2()?,
                name_and_type: reader.u2()?,
            },
            12 => Constant::NameAndType {
                name: reader.u2()?,
                descriptor: reader.u2()?,
            },
            other => return Err(DisasmError::UnsupportedConstant(other)),
        };
        let wide = constant.is_wide();
        entries.push(Some(constant));
        if wide {
            entries.push(None);
        }
    }
    Ok(ConstantPool::from_entries(entries))
}

fn utf8(pool: &ConstantPool, index: u16) -> Result<String, DisasmError> {
    pool.utf8_at(index)
        .map(str::to_string)
        .ok_or(DisasmError::InvalidConstantIndex(index))
}

fn class_name(pool: &ConstantPool, index: u16) -> Result<String, DisasmError> {
    pool.class_name_at(index)
        .map(str::to_string)
        .ok_or(DisasmError::InvalidConstantIndex(index))
}

fn read_code(body: &[u8], pool: &ConstantPool) -> Result<CodeDump, DisasmError> {
    let mut reader = Reader { data: body, pos: 0 };
    let max_stack = reader.u2()?;
    let max_locals = reader.u2()?;
    let len = reader.u4()? as usize;
    let code = reader.bytes(len)?;
    let instructions = read_instructions(code, pool)?;

    let mut exception_table = Vec::new();
    for _ in 0..reader.u2()? {
        exception_table.push(ExceptionEntry {
            start_pc: reader.u2()?,
            end_pc: reader.u2()?,
            handler_pc: reader.u2()?,
            catch_type: reader.u2()?,
        });
    }
    Ok(CodeDump {
        max_stack,
        max_locals,
        instructions,
        exception_table,
    })
}

fn read_instructions(code: &[u8], pool: &ConstantPool) -> Result<Vec<Instruction>, DisasmError> {
    use Opcode::*;

    let mut reader = Reader { data: code, pos: 0 };
    let mut out = Vec::new();
    while !reader.at_end() {
        let offset = reader.pos;
        let byte = reader.u1()?;
        let opcode = Opcode::try_from(byte).map_err(|_| DisasmError::UnknownOpcode { opcode: byte, offset })?;

        let operand = match opcode {
            Bipush => Operand::Int(reader.u1()? as i8 as i32),
            Sipush => Operand::Int(reader.u2()? as i16 as i32),
            Newarray => Operand::Int(reader.u1()? as i32),
            Iload | Lload | Fload | Dload | Aload | Istore | Lstore | Fstore | Dstore | Astore | Ret => {
                Operand::Local(reader.u1()? as u16)
            }
            Iinc => Operand::Iinc {
                local: reader.u1()? as u16,
                delta: reader.u1()? as i8 as i16,
            },
            Wide => {
                let inner_byte = reader.u1()?;
                let inner = Opcode::try_from(inner_byte).map_err(|_| DisasmError::UnknownOpcode {
                    opcode: inner_byte,
                    offset: offset + 1,
                })?;
                let local = reader.u2()?;
                let operand = if inner == Iinc {
                    Operand::Iinc {
                        local,
                        delta: reader.u2()? as i16,
                    }
                } else {
                    Operand::Local(local)
                };
                out.push(Instruction {
                    offset: offset as u16,
                    opcode: inner,
                    operand,
                });
                continue;
            }
            Ldc => ldc(pool, reader.u1()? as u16)?,
            LdcW | Ldc2W => ldc(pool, reader.u2()?)?,
            Getstatic | Putstatic | Getfield | Putfield | Invokevirtual | Invokespecial | Invokestatic => {
                member(pool, reader.u2()?)?
            }
            Invokeinterface => {
                let operand = member(pool, reader.u2()?)?;
                reader.u2()?; // count, zero
                operand
            }
            New | Anewarray | Checkcast | Instanceof => Operand::Class(class_name(pool, reader.u2()?)?),
            Multianewarray => {
                let operand = Operand::Class(class_name(pool, reader.u2()?)?);
                reader.u1()?;
                operand
            }
            op if op.is_branch() => {
                let delta = reader.u2()? as i16;
                Operand::Jump((offset as i32 + delta as i32) as u16)
            }
            GotoW | JsrW => {
                let delta = reader.u4()? as i32;
                Operand::Jump((offset as i32 + delta) as u16)
            }
            Jsr => {
                let delta = reader.u2()? as i16;
                Operand::Jump((offset as i32 + delta as i32) as u16)
            }
            Tableswitch | Lookupswitch => return Err(DisasmError::UnsupportedInstruction(opcode)),
            _ => Operand::None,
        };
        out.push(Instruction {
            offset: offset as u16,
            opcode,
            operand,
        });
    }
    Ok(out)
}

fn ldc(pool: &ConstantPool, index: u16) -> Result<Operand, DisasmError> {
    let value = match pool.get(index).ok_or(DisasmError::InvalidConstantIndex(index))? {
        Constant::Integer(v) => LdcValue::Int(*v),
        Constant::Float(v) => LdcValue::Float(*v),
        Constant::Long(v) => LdcValue::Long(*v),
        Constant::Double(v) => LdcValue::Double(*v),
        Constant::String { utf8: text } => LdcValue::String(utf8(pool, *text)?),
        Constant::Class { name } => LdcValue::Class(utf8(pool, *name)?),
        _ => return Err(DisasmError::InvalidConstantIndex(index)),
    };
    Ok(Operand::Ldc(value))
}

fn member(pool: &ConstantPool, index: u16) -> Result<Operand, DisasmError> {
    let (owner, name, descriptor) = pool.member_at(index).ok_or(DisasmError::InvalidConstantIndex(index))?;
    Ok(Operand::Member {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{ClassWriter, CodeAttribute};

    #[test]
    fn reads_back_a_written_class() {
        let mut writer = ClassWriter::new("p/A", "java/lang/Object", AccessFlags::PUBLIC | AccessFlags::SUPER);
        writer.add_field(AccessFlags::PUBLIC, "x", "I");
        let init = writer.pool_mut().method_ref("java/lang/Object", "<init>", "()V");
        let [hi, lo] = init.to_be_bytes();
        writer.add_method(
            AccessFlags::PUBLIC,
            "<init>",
            "()V",
            Some(CodeAttribute {
                max_stack: 1,
                max_locals: 1,
                code: vec![0x2a, 0xb7, hi, lo, 0xb1],
                exception_table: vec![],
            }),
        );
        writer.set_source_file("a.lt");

        let dump = disassemble(&writer.into_bytes().unwrap()).unwrap();
        assert_eq!(dump.name, "p/A");
        assert_eq!(dump.super_name.as_deref(), Some("java/lang/Object"));
        assert_eq!(dump.major_version, 49);
        assert_eq!(dump.field("x").map(|f| f.descriptor.as_str()), Some("I"));
        assert_eq!(dump.source_file.as_deref(), Some("a.lt"));

        let code = dump.method("<init>").and_then(|m| m.code.as_ref()).unwrap();
        let ops: Vec<Opcode> = code.opcodes().collect();
        assert_eq!(ops, vec![Opcode::Aload0, Opcode::Invokespecial, Opcode::Return]);
        assert_eq!(
            code.instructions[1].member(),
            Some(("java/lang/Object", "<init>", "()V"))
        );
    }

    #[test]
    fn branch_targets_are_absolute() {
        let pool = ConstantPool::new();
        // 0: iconst_0, 1: ifeq +4 -> 5, 4: nop, 5: return
        let code = [0x03, 0x99, 0x00, 0x04, 0x00, 0xb1];
        let instructions = read_instructions(&code, &pool).unwrap();
        assert_eq!(instructions[1].operand, Operand::Jump(5));
        assert_eq!(instructions.len(), 4);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(disassemble(&[1, 2, 3, 4]), Err(DisasmError::InvalidMagic));
        assert_eq!(disassemble(&[0xCA, 0xFE]), Err(DisasmError::UnexpectedEof));
    }
}
