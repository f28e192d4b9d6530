//! Class-file reader.
//!
//! Reads the header of a compiled class (name, super class, interfaces,
//! field and method signatures) so library classes can be registered
//! without a JDK at hand. Code and most attributes are skipped.

use latte_core::{JvmType, MethodDescriptor, QualifiedName};
use thiserror::Error;

use crate::{AccessFlags, ClassEntry, ClassKind, FieldEntry, MethodEntry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("constant pool entry {index} is not valid UTF-8")]
    InvalidUtf8 { index: u16 },
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Read the class header in `bytes`.
pub fn read_class(bytes: &[u8]) -> Result<ClassEntry, ClassFileError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let pool = ConstantPool::parse(&mut reader)?;

    let access = AccessFlags::from_bits_retain(reader.read_u2()?);
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;

    let name = QualifiedName::parse(pool.class_name(this_class)?);
    let super_class = match super_class {
        0 => None,
        index => Some(QualifiedName::parse(pool.class_name(index)?)),
    };

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(QualifiedName::parse(pool.class_name(reader.read_u2()?)?));
    }

    let mut fields = Vec::new();
    let fields_count = reader.read_u2()?;
    for _ in 0..fields_count {
        let (flags, name, descriptor) = read_member(&mut reader, &pool)?;
        // Private members are never visible to Latte code.
        if flags.contains(AccessFlags::PRIVATE) {
            continue;
        }
        let ty = JvmType::parse_field(descriptor).map_err(|e| ClassFileError::InvalidDescriptor(e.0))?;
        fields.push(FieldEntry::new(name, ty, flags));
    }

    let mut methods = Vec::new();
    let methods_count = reader.read_u2()?;
    for _ in 0..methods_count {
        let (flags, name, descriptor) = read_member(&mut reader, &pool)?;
        if flags.contains(AccessFlags::PRIVATE) || name == "<clinit>" {
            continue;
        }
        let descriptor = MethodDescriptor::parse(descriptor).map_err(|e| ClassFileError::InvalidDescriptor(e.0))?;
        methods.push(MethodEntry::new(name, descriptor, flags));
    }

    let attributes_count = reader.read_u2()?;
    skip_attributes(&mut reader, attributes_count)?;

    let kind = if access.contains(AccessFlags::INTERFACE) {
        ClassKind::Interface
    } else {
        ClassKind::Class
    };
    Ok(ClassEntry {
        name,
        kind,
        access,
        super_class,
        interfaces,
        fields,
        methods,
    })
}

/// `access_flags name_index descriptor_index attributes`
fn read_member<'p>(
    reader: &mut ClassReader<'_>,
    pool: &'p ConstantPool,
) -> Result<(AccessFlags, &'p str, &'p str), ClassFileError> {
    let flags = AccessFlags::from_bits_retain(reader.read_u2()?);
    let name = pool.utf8(reader.read_u2()?)?;
    let descriptor = pool.utf8(reader.read_u2()?)?;
    let attributes_count = reader.read_u2()?;
    skip_attributes(reader, attributes_count)?;
    Ok((flags, name, descriptor))
}

fn skip_attributes(reader: &mut ClassReader<'_>, count: u16) -> Result<(), ClassFileError> {
    for _ in 0..count {
        let _name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        while entries.len() < count {
            let index = entries.len() as u16;
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    let text = String::from_utf8(bytes.to_vec()).map_err(|_| ClassFileError::InvalidUtf8 { index })?;
                    Constant::Utf8(text)
                }
                // Integer, Float
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                // Long and Double take two slots.
                5 | 6 => {
                    reader.skip(8)?;
                    entries.push(Constant::Other);
                    Constant::Unusable
                }
                7 => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                // String, MethodType, Module, Package
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                // Fieldref, Methodref, InterfaceMethodref, NameAndType, Dynamic, InvokeDynamic
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                // MethodHandle
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(ClassFileError::UnsupportedConstant { tag: other }),
            };
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassFileError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassFileError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassFileError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassFileError::InvalidConstantIndex { index }),
        }
    }
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassFileError> {
        if self.read_u4()? != 0xCAFE_BABE {
            return Err(ClassFileError::InvalidMagic);
        }
        Ok(())
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self.pos.checked_add(len).ok_or(ClassFileError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(ClassFileError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassFileError> {
        self.read_slice(len).map(|_| ())
    }

    fn read_u1(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.read_slice(1)?[0])
    }

    fn read_u2(&mut self) -> Result<u16, ClassFileError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassFileError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-assembled `public interface p/Shape extends java/lang/Runnable`
    /// with `int area()` abstract and a `static final int SIDES`.
    fn shape_class() -> Vec<u8> {
        let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 49];
        let utf8 = |s: &str| {
            let mut v = vec![1u8];
            v.extend((s.len() as u16).to_be_bytes());
            v.extend(s.as_bytes());
            v
        };
        let pool: Vec<Vec<u8>> = vec![
            utf8("p/Shape"),            // 1
            vec![7, 0, 1],              // 2 class p/Shape
            utf8("java/lang/Object"),   // 3
            vec![7, 0, 3],              // 4
            utf8("java/lang/Runnable"), // 5
            vec![7, 0, 5],              // 6
            utf8("area"),               // 7
            utf8("()I"),                // 8
            utf8("SIDES"),              // 9
            utf8("I"),                  // 10
            vec![5, 0, 0, 0, 0, 0, 0, 0, 4], // 11-12 long constant
            utf8("ConstantValue"),      // 13
        ];
        out.extend(14u16.to_be_bytes());
        for entry in pool {
            out.extend(entry);
        }
        out.extend(0x0601u16.to_be_bytes()); // public interface abstract
        out.extend(2u16.to_be_bytes());
        out.extend(4u16.to_be_bytes());
        out.extend(1u16.to_be_bytes());
        out.extend(6u16.to_be_bytes());
        // fields: SIDES with one ConstantValue attribute
        out.extend(1u16.to_be_bytes());
        out.extend(0x0019u16.to_be_bytes());
        out.extend(9u16.to_be_bytes());
        out.extend(10u16.to_be_bytes());
        out.extend(1u16.to_be_bytes());
        out.extend(13u16.to_be_bytes());
        out.extend(2u32.to_be_bytes());
        out.extend(11u16.to_be_bytes());
        // methods: area
        out.extend(1u16.to_be_bytes());
        out.extend(0x0401u16.to_be_bytes());
        out.extend(7u16.to_be_bytes());
        out.extend(8u16.to_be_bytes());
        out.extend(0u16.to_be_bytes());
        // class attributes
        out.extend(0u16.to_be_bytes());
        out
    }

    #[test]
    fn reads_interface_header() {
        let entry = read_class(&shape_class()).unwrap();
        assert_eq!(entry.name.dotted(), "p.Shape");
        assert!(entry.is_interface());
        assert_eq!(entry.interfaces, vec![QualifiedName::parse("java.lang.Runnable")]);
        assert!(entry.field("SIDES").is_some_and(FieldEntry::is_static));
        let area = entry.methods_named("area").next().unwrap();
        assert!(area.is_abstract());
        assert_eq!(area.descriptor.to_string(), "()I");
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(read_class(&[0, 1, 2, 3]), Err(ClassFileError::InvalidMagic));
        let truncated = &shape_class()[..20];
        assert_eq!(read_class(truncated), Err(ClassFileError::UnexpectedEof));
    }
}
