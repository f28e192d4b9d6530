//! The eight JVM primitive kinds and everything the generator needs to
//! know about each of them.

use std::fmt;

/// Primitive value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

/// How a primitive is represented on the operand stack.
///
/// `boolean`, `byte`, `char` and `short` all travel as `int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Look up a primitive by its Latte spelling. `bool` is accepted as an
    /// alias of `boolean`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" | "boolean" => PrimitiveKind::Boolean,
            "byte" => PrimitiveKind::Byte,
            "char" => PrimitiveKind::Char,
            "short" => PrimitiveKind::Short,
            "int" => PrimitiveKind::Int,
            "long" => PrimitiveKind::Long,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            _ => return None,
        })
    }

    pub fn from_descriptor(c: char) -> Option<Self> {
        Some(match c {
            'Z' => PrimitiveKind::Boolean,
            'B' => PrimitiveKind::Byte,
            'C' => PrimitiveKind::Char,
            'S' => PrimitiveKind::Short,
            'I' => PrimitiveKind::Int,
            'J' => PrimitiveKind::Long,
            'F' => PrimitiveKind::Float,
            'D' => PrimitiveKind::Double,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub const fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    /// Local-variable and operand-stack slots taken by one value.
    pub const fn slots(self) -> u16 {
        match self {
            PrimitiveKind::Long | PrimitiveKind::Double => 2,
            _ => 1,
        }
    }

    pub const fn stack_kind(self) -> StackKind {
        match self {
            PrimitiveKind::Long => StackKind::Long,
            PrimitiveKind::Float => StackKind::Float,
            PrimitiveKind::Double => StackKind::Double,
            _ => StackKind::Int,
        }
    }

    pub const fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveKind::Boolean)
    }

    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Char
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
        )
    }

    /// Wrapper class used when the value is boxed.
    pub const fn box_class(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "java/lang/Boolean",
            PrimitiveKind::Byte => "java/lang/Byte",
            PrimitiveKind::Char => "java/lang/Character",
            PrimitiveKind::Short => "java/lang/Short",
            PrimitiveKind::Int => "java/lang/Integer",
            PrimitiveKind::Long => "java/lang/Long",
            PrimitiveKind::Float => "java/lang/Float",
            PrimitiveKind::Double => "java/lang/Double",
        }
    }

    /// The wrapper's `xxxValue()` accessor.
    pub const fn unbox_method(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "booleanValue",
            PrimitiveKind::Byte => "byteValue",
            PrimitiveKind::Char => "charValue",
            PrimitiveKind::Short => "shortValue",
            PrimitiveKind::Int => "intValue",
            PrimitiveKind::Long => "longValue",
            PrimitiveKind::Float => "floatValue",
            PrimitiveKind::Double => "doubleValue",
        }
    }

    /// Runtime helper that converts an arbitrary object to this kind.
    pub const fn runtime_cast(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "castToBool",
            PrimitiveKind::Byte => "castToByte",
            PrimitiveKind::Char => "castToChar",
            PrimitiveKind::Short => "castToShort",
            PrimitiveKind::Int => "castToInt",
            PrimitiveKind::Long => "castToLong",
            PrimitiveKind::Float => "castToFloat",
            PrimitiveKind::Double => "castToDouble",
        }
    }

    /// Primitive kind unboxed from a wrapper class, if it is one.
    pub fn from_box_class(internal_name: &str) -> Option<Self> {
        PrimitiveKind::ALL
            .into_iter()
            .find(|p| p.box_class() == internal_name)
    }

    /// Rank used for binary numeric promotion. Sub-int kinds promote to int.
    pub const fn promotion_rank(self) -> u8 {
        match self {
            PrimitiveKind::Long => 2,
            PrimitiveKind::Float => 3,
            PrimitiveKind::Double => 4,
            _ => 1,
        }
    }

    /// Whether a value of `self` converts to `target` without loss.
    pub fn widens_to(self, target: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        if self == target {
            return true;
        }
        match self {
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short | Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => matches!(target, Double),
            Boolean | Double => false,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_descriptors() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
            assert_eq!(PrimitiveKind::from_descriptor(kind.descriptor()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_name("bool"), Some(PrimitiveKind::Boolean));
        assert_eq!(PrimitiveKind::from_name("Integer"), None);
    }

    #[test]
    fn wide_kinds_take_two_slots() {
        assert_eq!(PrimitiveKind::Long.slots(), 2);
        assert_eq!(PrimitiveKind::Double.slots(), 2);
        assert_eq!(PrimitiveKind::Short.slots(), 1);
    }

    #[test]
    fn sub_int_kinds_travel_as_int() {
        for kind in [PrimitiveKind::Boolean, PrimitiveKind::Byte, PrimitiveKind::Char, PrimitiveKind::Short] {
            assert_eq!(kind.stack_kind(), StackKind::Int);
        }
    }

    #[test]
    fn boxes() {
        assert_eq!(PrimitiveKind::Char.box_class(), "java/lang/Character");
        assert_eq!(PrimitiveKind::from_box_class("java/lang/Short"), Some(PrimitiveKind::Short));
        assert_eq!(PrimitiveKind::from_box_class("java/lang/String"), None);
    }

    #[test]
    fn widening() {
        assert!(PrimitiveKind::Int.widens_to(PrimitiveKind::Long));
        assert!(PrimitiveKind::Char.widens_to(PrimitiveKind::Int));
        assert!(!PrimitiveKind::Char.widens_to(PrimitiveKind::Short));
        assert!(!PrimitiveKind::Boolean.widens_to(PrimitiveKind::Int));
        assert!(!PrimitiveKind::Double.widens_to(PrimitiveKind::Float));
    }
}
