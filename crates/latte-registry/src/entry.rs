//! Class, field and method entries.

use bitflags::bitflags;
use latte_core::{ClassHash, JvmType, MethodDescriptor, QualifiedName};

bitflags! {
    /// JVM access flags, shared by classes, fields and methods.
    ///
    /// Some bits mean different things depending on what they are attached
    /// to (`0x20` is `ACC_SUPER` on a class and `ACC_SYNCHRONIZED` on a
    /// method); both spellings are provided.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const BRIDGE = 0x0040;
        const TRANSIENT = 0x0080;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub name: String,
    pub ty: JvmType,
    pub access: AccessFlags,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, ty: JvmType, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            ty,
            access,
        }
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodEntry {
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub access: AccessFlags,
}

impl MethodEntry {
    pub fn new(name: impl Into<String>, descriptor: MethodDescriptor, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            descriptor,
            access,
        }
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.access.contains(AccessFlags::ABSTRACT)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// Same name and descriptor; access is not compared.
    pub fn same_signature(&self, other: &MethodEntry) -> bool {
        self.name == other.name && self.descriptor == other.descriptor
    }
}

/// A class or interface header: everything except code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub name: QualifiedName,
    pub kind: ClassKind,
    pub access: AccessFlags,
    /// `None` only for `java.lang.Object`.
    pub super_class: Option<QualifiedName>,
    pub interfaces: Vec<QualifiedName>,
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<MethodEntry>,
}

impl ClassEntry {
    /// A public class extending `java.lang.Object`.
    pub fn class(name: QualifiedName) -> Self {
        Self {
            name,
            kind: ClassKind::Class,
            access: AccessFlags::PUBLIC | AccessFlags::SUPER,
            super_class: Some(QualifiedName::parse("java.lang.Object")),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A public interface. Interfaces record `java.lang.Object` as their
    /// super class, like the class file format does.
    pub fn interface(name: QualifiedName) -> Self {
        Self {
            kind: ClassKind::Interface,
            access: AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT,
            ..Self::class(name)
        }
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_super(mut self, super_class: Option<QualifiedName>) -> Self {
        self.super_class = super_class;
        self
    }

    pub fn with_interface(mut self, interface: QualifiedName) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_field(mut self, field: FieldEntry) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodEntry) -> Self {
        self.methods.push(method);
        self
    }

    pub fn hash(&self) -> ClassHash {
        self.name.class_hash()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_abstract(&self) -> bool {
        self.access.contains(AccessFlags::ABSTRACT)
    }

    pub fn internal_name(&self) -> String {
        self.name.internal_name()
    }

    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared methods with this name, in declaration order.
    pub fn methods_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a MethodEntry> + use<'a, 'n> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodEntry> {
        self.methods.iter().filter(|m| m.is_constructor())
    }

    /// Whether a constructor taking no arguments is declared.
    pub fn has_default_constructor(&self) -> bool {
        self.constructors().any(|c| c.descriptor.params.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders() {
        let entry = ClassEntry::interface(QualifiedName::parse("a.I"))
            .with_method(MethodEntry::new(
                "f",
                MethodDescriptor::new(vec![JvmType::int()], JvmType::int()),
                AccessFlags::PUBLIC | AccessFlags::ABSTRACT,
            ))
            .with_field(FieldEntry::new("X", JvmType::int(), AccessFlags::PUBLIC | AccessFlags::STATIC));

        assert!(entry.is_interface());
        assert!(entry.is_abstract());
        assert_eq!(entry.methods_named("f").count(), 1);
        assert!(entry.field("X").is_some_and(FieldEntry::is_static));
        assert!(!entry.has_default_constructor());
        assert_eq!(entry.internal_name(), "a/I");
    }

    #[test]
    fn signatures_ignore_access() {
        let desc = MethodDescriptor::void(vec![]);
        let a = MethodEntry::new("run", desc.clone(), AccessFlags::PUBLIC | AccessFlags::ABSTRACT);
        let b = MethodEntry::new("run", desc, AccessFlags::PUBLIC);
        assert!(a.same_signature(&b));
        assert!(a.is_abstract() && !b.is_abstract());
    }
}
