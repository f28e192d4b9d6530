//! Class-file constant pool.
//!
//! Every class being written owns one pool. Entries are deduplicated, so
//! asking twice for the same method reference yields the same index.

use rustc_hash::FxHashMap;

/// An entry in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name: u16 },
    String { utf8: u16 },
    Fieldref { class: u16, name_and_type: u16 },
    Methodref { class: u16, name_and_type: u16 },
    InterfaceMethodref { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
}

impl Constant {
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => 1,
            Constant::Integer(_) => 3,
            Constant::Float(_) => 4,
            Constant::Long(_) => 5,
            Constant::Double(_) => 6,
            Constant::Class { .. } => 7,
            Constant::String { .. } => 8,
            Constant::Fieldref { .. } => 9,
            Constant::Methodref { .. } => 10,
            Constant::InterfaceMethodref { .. } => 11,
            Constant::NameAndType { .. } => 12,
        }
    }

    /// `long` and `double` entries take two pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// Key for constant deduplication (hashable version of Constant).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Utf8(String),
    Integer(i32),
    Float(u32), // Bit pattern for hashing
    Long(i64),
    Double(u64), // Bit pattern for hashing
    Class(u16),
    String(u16),
    Fieldref(u16, u16),
    Methodref(u16, u16),
    InterfaceMethodref(u16, u16),
    NameAndType(u16, u16),
}

/// Constant pool with deduplication.
///
/// Index 0 is reserved by the format; the first entry gets index 1.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    /// Entries in index order; the unusable second slot of a wide entry is
    /// `None`.
    entries: Vec<Option<Constant>>,
    index: FxHashMap<ConstantKey, u16>,
    /// Set once more entries were requested than an index can address.
    overflowed: bool,
    /// Encoded length of the first string too long for a `u16` length prefix.
    oversized: Option<usize>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            entries: vec![None],
            index: FxHashMap::default(),
            overflowed: false,
            oversized: None,
        }
    }

    /// A pool read back from a class file, entries in index order.
    pub(crate) fn from_entries(entries: Vec<Option<Constant>>) -> Self {
        Self {
            entries,
            index: FxHashMap::default(),
            overflowed: false,
            oversized: None,
        }
    }

    /// Add or get existing constant, returns index.
    pub fn add(&mut self, constant: Constant) -> u16 {
        let key = Self::to_key(&constant);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }

        if let Constant::Utf8(text) = &constant {
            let len = modified_utf8_len(text);
            if len > u16::MAX as usize {
                self.oversized.get_or_insert(len);
                return 0;
            }
        }

        let slots = if constant.is_wide() { 2 } else { 1 };
        if self.entries.len() + slots > u16::MAX as usize {
            self.overflowed = true;
            return 0;
        }
        let idx = self.entries.len() as u16;
        self.entries.push(Some(constant));
        if slots == 2 {
            self.entries.push(None);
        }
        self.index.insert(key, idx);
        idx
    }

    pub fn utf8(&mut self, text: &str) -> u16 {
        self.add(Constant::Utf8(text.to_string()))
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.add(Constant::Integer(value))
    }

    pub fn float(&mut self, value: f32) -> u16 {
        self.add(Constant::Float(value))
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.add(Constant::Long(value))
    }

    pub fn double(&mut self, value: f64) -> u16 {
        self.add(Constant::Double(value))
    }

    /// A class by internal name (`java/lang/Object`), or an array type by
    /// descriptor.
    pub fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.add(Constant::Class { name })
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let utf8 = self.utf8(value);
        self.add(Constant::String { utf8 })
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.add(Constant::NameAndType { name, descriptor })
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        self.add(Constant::Fieldref { class, name_and_type })
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        self.add(Constant::Methodref { class, name_and_type })
    }

    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        self.add(Constant::InterfaceMethodref { class, name_and_type })
    }

    /// Get constant by index.
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize).and_then(Option::as_ref)
    }

    /// The text of a `Utf8` entry.
    pub fn utf8_at(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Utf8(text) => Some(text),
            _ => None,
        }
    }

    /// The internal name behind a `Class` entry.
    pub fn class_name_at(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Class { name } => self.utf8_at(*name),
            _ => None,
        }
    }

    /// `(owner, name, descriptor)` of a field or method reference.
    pub fn member_at(&self, index: u16) -> Option<(&str, &str, &str)> {
        let (class, name_and_type) = match self.get(index)? {
            Constant::Fieldref { class, name_and_type }
            | Constant::Methodref { class, name_and_type }
            | Constant::InterfaceMethodref { class, name_and_type } => (*class, *name_and_type),
            _ => return None,
        };
        let Constant::NameAndType { name, descriptor } = self.get(name_and_type)? else {
            return None;
        };
        Some((self.class_name_at(class)?, self.utf8_at(*name)?, self.utf8_at(*descriptor)?))
    }

    /// The `constant_pool_count` written to the class file.
    pub fn count(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Number of entries, not counting the reserved slot.
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Encoded length of the first string rejected for exceeding 65535 bytes.
    pub fn oversized(&self) -> Option<usize> {
        self.oversized
    }

    /// Serialize every entry in index order.
    pub fn write(&self, out: &mut Vec<u8>) {
        for constant in self.entries.iter().flatten() {
            out.push(constant.tag());
            match constant {
                Constant::Utf8(text) => {
                    let bytes = modified_utf8(text);
                    out.extend((bytes.len() as u16).to_be_bytes());
                    out.extend(bytes);
                }
                Constant::Integer(v) => out.extend(v.to_be_bytes()),
                Constant::Float(v) => out.extend(v.to_bits().to_be_bytes()),
                Constant::Long(v) => out.extend(v.to_be_bytes()),
                Constant::Double(v) => out.extend(v.to_bits().to_be_bytes()),
                Constant::Class { name } => out.extend(name.to_be_bytes()),
                Constant::String { utf8 } => out.extend(utf8.to_be_bytes()),
                Constant::Fieldref { class, name_and_type }
                | Constant::Methodref { class, name_and_type }
                | Constant::InterfaceMethodref { class, name_and_type } => {
                    out.extend(class.to_be_bytes());
                    out.extend(name_and_type.to_be_bytes());
                }
                Constant::NameAndType { name, descriptor } => {
                    out.extend(name.to_be_bytes());
                    out.extend(descriptor.to_be_bytes());
                }
            }
        }
    }

    /// Convert a Constant to its hashable key representation.
    fn to_key(constant: &Constant) -> ConstantKey {
        match constant {
            Constant::Utf8(s) => ConstantKey::Utf8(s.clone()),
            Constant::Integer(v) => ConstantKey::Integer(*v),
            Constant::Float(v) => ConstantKey::Float(v.to_bits()),
            Constant::Long(v) => ConstantKey::Long(*v),
            Constant::Double(v) => ConstantKey::Double(v.to_bits()),
            Constant::Class { name } => ConstantKey::Class(*name),
            Constant::String { utf8 } => ConstantKey::String(*utf8),
            Constant::Fieldref { class, name_and_type } => ConstantKey::Fieldref(*class, *name_and_type),
            Constant::Methodref { class, name_and_type } => ConstantKey::Methodref(*class, *name_and_type),
            Constant::InterfaceMethodref { class, name_and_type } => {
                ConstantKey::InterfaceMethodref(*class, *name_and_type)
            }
            Constant::NameAndType { name, descriptor } => ConstantKey::NameAndType(*name, *descriptor),
        }
    }
}

/// The class file's "modified UTF-8": NUL takes two bytes and characters
/// outside the BMP are written as two encoded surrogates.
fn modified_utf8_len(text: &str) -> usize {
    text.encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007f => 1,
            0x0000 | 0x0080..=0x07ff => 2,
            _ => 3,
        })
        .sum()
}

pub(crate) fn modified_utf8(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

/// Inverse of [`modified_utf8`].
pub(crate) fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i] as u16;
        if b & 0x80 == 0 {
            units.push(b);
            i += 1;
        } else if b & 0xe0 == 0xc0 {
            let b2 = *bytes.get(i + 1)? as u16;
            units.push(((b & 0x1f) << 6) | (b2 & 0x3f));
            i += 2;
        } else if b & 0xf0 == 0xe0 {
            let b2 = *bytes.get(i + 1)? as u16;
            let b3 = *bytes.get(i + 2)? as u16;
            units.push(((b & 0x0f) << 12) | ((b2 & 0x3f) << 6) | (b3 & 0x3f));
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_index_is_one() {
        let mut pool = ConstantPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.utf8("Code"), 1);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn deduplicates_member_refs() {
        let mut pool = ConstantPool::new();
        let a = pool.method_ref("java/lang/Object", "<init>", "()V");
        let len = pool.len();
        let b = pool.method_ref("java/lang/Object", "<init>", "()V");
        assert_eq!(a, b);
        assert_eq!(pool.len(), len);
        assert_eq!(pool.member_at(a), Some(("java/lang/Object", "<init>", "()V")));
    }

    #[test]
    fn field_and_method_refs_differ() {
        let mut pool = ConstantPool::new();
        let f = pool.field_ref("A", "x", "I");
        let m = pool.method_ref("A", "x", "I");
        let i = pool.interface_method_ref("A", "x", "I");
        assert_ne!(f, m);
        assert_ne!(m, i);
    }

    #[test]
    fn wide_entries_take_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.long(1 << 40);
        let next = pool.integer(7);
        assert_eq!(next, long + 2);
        assert_eq!(pool.get(long + 1), None);
        assert_eq!(pool.count(), 4);
    }

    #[test]
    fn floats_dedup_by_bits() {
        let mut pool = ConstantPool::new();
        let a = pool.double(0.0);
        let b = pool.double(-0.0);
        assert_ne!(a, b);
        assert_eq!(pool.double(0.0), a);
    }

    #[test]
    fn oversized_strings_are_rejected() {
        let mut pool = ConstantPool::new();
        let fits = "a".repeat(u16::MAX as usize);
        assert_ne!(pool.utf8(&fits), 0);
        assert_eq!(pool.oversized(), None);
        // Each NUL takes two bytes in modified UTF-8.
        let nuls = "\0".repeat(40_000);
        assert_eq!(pool.utf8(&nuls), 0);
        assert_eq!(pool.oversized(), Some(80_000));
        assert_eq!(modified_utf8(&nuls).len(), 80_000);
    }

    #[test]
    fn modified_utf8_encoding() {
        assert_eq!(modified_utf8("a\0"), vec![b'a', 0xc0, 0x80]);
        let emoji = "\u{1F600}";
        let encoded = modified_utf8(emoji);
        assert_eq!(encoded.len(), 6);
        assert_eq!(decode_modified_utf8(&encoded).as_deref(), Some(emoji));
        assert_eq!(decode_modified_utf8(&modified_utf8("héllo")).as_deref(), Some("héllo"));
    }

    #[test]
    fn serializes_in_order() {
        let mut pool = ConstantPool::new();
        pool.class("A");
        let mut out = Vec::new();
        pool.write(&mut out);
        assert_eq!(out, vec![1, 0, 1, b'A', 7, 0, 1]);
    }
}
