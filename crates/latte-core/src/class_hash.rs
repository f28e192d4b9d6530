//! Deterministic 64-bit identity for classes and members.
//!
//! The registry indexes every class by [`ClassHash`], so a lookup through
//! any spelling of a qualified name is a single map lookup. Hashes are
//! XXHash64 over the segments, mixed with a domain constant so that a class
//! and a member with the same text never collide.

use std::fmt;
use xxhash_rust::xxh64::xxh64;

use crate::QualifiedName;

/// Domain mixing constants.
pub mod hash_constants {
    /// Separator between path segments.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;
    /// Domain marker for classes.
    pub const CLASS: u64 = 0x2fac10b63a6cc57c;
    /// Domain marker for fields.
    pub const FIELD: u64 = 0x1a095090689d4647;
    /// Domain marker for methods (name plus descriptor).
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClassHash(pub u64);

impl ClassHash {
    /// Hash of a qualified class name, independent of how it was spelled.
    pub fn of(name: &QualifiedName) -> Self {
        let mut hash = hash_constants::CLASS;
        for segment in name.segments() {
            hash = hash
                .rotate_left(5)
                .wrapping_mul(hash_constants::SEP)
                ^ xxh64(segment.as_bytes(), 0);
        }
        ClassHash(hash)
    }

    /// Hash of a field owned by a class.
    pub fn field(owner: ClassHash, name: &str) -> Self {
        ClassHash(owner.0 ^ hash_constants::FIELD ^ xxh64(name.as_bytes(), hash_constants::SEP))
    }

    /// Hash of a method owned by a class, distinguished by descriptor.
    pub fn method(owner: ClassHash, name: &str, descriptor: &str) -> Self {
        let name_hash = xxh64(name.as_bytes(), hash_constants::SEP);
        let desc_hash = xxh64(descriptor.as_bytes(), hash_constants::METHOD);
        ClassHash(owner.0 ^ hash_constants::METHOD ^ name_hash.rotate_left(17) ^ desc_hash)
    }
}

impl fmt::Debug for ClassHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassHash({:#018x})", self.0)
    }
}

impl fmt::Display for ClassHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelling_does_not_matter() {
        let a = ClassHash::of(&QualifiedName::parse("java.lang.Object"));
        let b = ClassHash::of(&QualifiedName::parse("java::lang::Object"));
        assert_eq!(a, b);
    }

    #[test]
    fn segment_boundaries_matter() {
        let a = ClassHash::of(&QualifiedName::parse("ab.c"));
        let b = ClassHash::of(&QualifiedName::parse("a.bc"));
        assert_ne!(a, b);
    }

    #[test]
    fn members_are_distinct_from_classes() {
        let owner = ClassHash::of(&QualifiedName::parse("a.X"));
        let field = ClassHash::field(owner, "a");
        let getter = ClassHash::method(owner, "a", "()I");
        assert_ne!(field, getter);
        assert_ne!(field, owner);
        assert_ne!(
            ClassHash::method(owner, "f", "(I)I"),
            ClassHash::method(owner, "f", "(J)J")
        );
    }
}
