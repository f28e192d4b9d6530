//! Class file serialization.
//!
//! Classes are written as version 49.0, the last format that does not
//! require a `StackMapTable`, so the emitter only has to track stack depth
//! and never frame types.

use latte_core::CodeGenError;
use latte_registry::AccessFlags;

use super::{CodeAttribute, ConstantPool};

pub const MAGIC: u32 = 0xCAFE_BABE;
pub const MAJOR_VERSION: u16 = 49;
pub const MINOR_VERSION: u16 = 0;

#[derive(Debug, Clone)]
struct FieldInfo {
    access: AccessFlags,
    name: u16,
    descriptor: u16,
}

#[derive(Debug, Clone)]
struct MethodInfo {
    access: AccessFlags,
    name: u16,
    descriptor: u16,
    name_text: String,
    descriptor_text: String,
    code: Option<CodeAttribute>,
}

/// Builds one class file.
///
/// The writer owns the class's [`ConstantPool`]; method bodies borrow it
/// through [`ClassWriter::pool_mut`] while they are emitted.
#[derive(Debug, Clone)]
pub struct ClassWriter {
    name: String,
    pool: ConstantPool,
    access: AccessFlags,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
    source_file: Option<u16>,
}

impl ClassWriter {
    /// Start a class by internal name.
    pub fn new(name: &str, super_name: &str, access: AccessFlags) -> Self {
        let mut pool = ConstantPool::new();
        let this_class = pool.class(name);
        let super_class = pool.class(super_name);
        Self {
            name: name.to_string(),
            pool,
            access,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            source_file: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool_mut(&mut self) -> &mut ConstantPool {
        &mut self.pool
    }

    pub fn add_interface(&mut self, internal_name: &str) {
        let index = self.pool.class(internal_name);
        if !self.interfaces.contains(&index) {
            self.interfaces.push(index);
        }
    }

    pub fn add_field(&mut self, access: AccessFlags, name: &str, descriptor: &str) {
        let name = self.pool.utf8(name);
        let descriptor = self.pool.utf8(descriptor);
        self.fields.push(FieldInfo {
            access,
            name,
            descriptor,
        });
    }

    /// Add a method; abstract methods have no code.
    pub fn add_method(&mut self, access: AccessFlags, name: &str, descriptor: &str, code: Option<CodeAttribute>) {
        if code.is_some() {
            self.pool.utf8("Code");
        }
        let name_index = self.pool.utf8(name);
        let descriptor_index = self.pool.utf8(descriptor);
        self.methods.push(MethodInfo {
            access,
            name: name_index,
            descriptor: descriptor_index,
            name_text: name.to_string(),
            descriptor_text: descriptor.to_string(),
            code,
        });
    }

    pub fn has_method(&self, name: &str, descriptor: &str) -> bool {
        self.methods
            .iter()
            .any(|m| m.name_text == name && m.descriptor_text == descriptor)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn set_source_file(&mut self, file: &str) {
        self.pool.utf8("SourceFile");
        self.source_file = Some(self.pool.utf8(file));
    }

    /// Serialize the class.
    pub fn into_bytes(self) -> Result<Vec<u8>, CodeGenError> {
        if let Some(len) = self.pool.oversized() {
            return Err(CodeGenError::ConstantTooLong {
                class: self.name.replace('/', "."),
                len,
            });
        }
        if self.pool.overflowed() {
            return Err(CodeGenError::CodeTooLarge {
                method: format!("{} (constant pool)", self.name.replace('/', ".")),
            });
        }

        let mut out = Vec::with_capacity(1024);
        out.extend(MAGIC.to_be_bytes());
        out.extend(MINOR_VERSION.to_be_bytes());
        out.extend(MAJOR_VERSION.to_be_bytes());
        out.extend(self.pool.count().to_be_bytes());
        self.pool.write(&mut out);

        out.extend(self.access.bits().to_be_bytes());
        out.extend(self.this_class.to_be_bytes());
        out.extend(self.super_class.to_be_bytes());
        out.extend((self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            out.extend(interface.to_be_bytes());
        }

        out.extend((self.fields.len() as u16).to_be_bytes());
        for field in &self.fields {
            out.extend(field.access.bits().to_be_bytes());
            out.extend(field.name.to_be_bytes());
            out.extend(field.descriptor.to_be_bytes());
            out.extend(0u16.to_be_bytes());
        }

        let code_name = self.lookup_utf8("Code");
        out.extend((self.methods.len() as u16).to_be_bytes());
        for method in &self.methods {
            out.extend(method.access.bits().to_be_bytes());
            out.extend(method.name.to_be_bytes());
            out.extend(method.descriptor.to_be_bytes());
            match (&method.code, code_name) {
                (Some(code), Some(code_name)) => {
                    if code.code.len() > u16::MAX as usize {
                        return Err(CodeGenError::CodeTooLarge {
                            method: method.name_text.clone(),
                        });
                    }
                    out.extend(1u16.to_be_bytes());
                    let mut body = Vec::with_capacity(code.code.len() + 32);
                    code.write(&mut body);
                    out.extend(code_name.to_be_bytes());
                    out.extend((body.len() as u32).to_be_bytes());
                    out.extend(body);
                }
                _ => out.extend(0u16.to_be_bytes()),
            }
        }

        match (self.source_file, self.lookup_utf8("SourceFile")) {
            (Some(file), Some(attr_name)) => {
                out.extend(1u16.to_be_bytes());
                out.extend(attr_name.to_be_bytes());
                out.extend(2u32.to_be_bytes());
                out.extend(file.to_be_bytes());
            }
            _ => out.extend(0u16.to_be_bytes()),
        }
        Ok(out)
    }

    /// Index of a `Utf8` entry added earlier, without adding it.
    fn lookup_utf8(&self, text: &str) -> Option<u16> {
        (1..self.pool.count()).find(|&i| self.pool.utf8_at(i) == Some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_interface_layout() {
        let writer = ClassWriter::new(
            "p/I",
            "java/lang/Object",
            AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT,
        );
        let bytes = writer.into_bytes().unwrap();
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(u16::from_be_bytes([bytes[6], bytes[7]]), MAJOR_VERSION);
        // four pool entries plus the reserved slot
        assert_eq!(u16::from_be_bytes([bytes[8], bytes[9]]), 5);
        // access, this, super, no interfaces, fields, methods or attributes
        assert_eq!(&bytes[bytes.len() - 14..bytes.len() - 10], &[0x06, 0x01, 0, 2]);
        assert_eq!(&bytes[bytes.len() - 8..], &[0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn methods_are_tracked() {
        let mut writer = ClassWriter::new("A", "java/lang/Object", AccessFlags::PUBLIC | AccessFlags::SUPER);
        writer.add_method(AccessFlags::PUBLIC | AccessFlags::ABSTRACT, "f", "()V", None);
        assert!(writer.has_method("f", "()V"));
        assert!(!writer.has_method("f", "()I"));
        assert_eq!(writer.method_count(), 1);
    }

    #[test]
    fn oversized_string_constants_fail_the_class() {
        let mut writer = ClassWriter::new("p/Big", "java/lang/Object", AccessFlags::PUBLIC);
        writer.pool_mut().string(&"a".repeat(70_000));
        assert_eq!(
            writer.into_bytes(),
            Err(CodeGenError::ConstantTooLong {
                class: "p.Big".into(),
                len: 70_000
            })
        );
    }

    #[test]
    fn interfaces_are_deduplicated() {
        let mut writer = ClassWriter::new("A", "java/lang/Object", AccessFlags::PUBLIC);
        writer.add_interface("java/lang/Runnable");
        writer.add_interface("java/lang/Runnable");
        let bytes = writer.into_bytes().unwrap();
        let read = latte_registry::read_class(&bytes).unwrap();
        assert_eq!(read.interfaces.len(), 1);
    }
}
