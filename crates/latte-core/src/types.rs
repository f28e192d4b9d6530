//! JVM value types and method descriptors.
//!
//! A [`MethodDescriptor`] is the kind-level shape of a method: each
//! parameter and the return value is either one of the eight primitives or
//! a reference. It drives overload selection, lambda adapter synthesis and
//! whether boxing has to be inserted at a call site.

use std::fmt;

use thiserror::Error;

use crate::{PrimitiveKind, QualifiedName};

pub const OBJECT: &str = "java/lang/Object";
pub const STRING: &str = "java/lang/String";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed descriptor `{0}`")]
pub struct DescriptorError(pub String);

/// Type of a value as the JVM sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JvmType {
    /// Only valid as a return type.
    Void,
    Primitive(PrimitiveKind),
    /// Class or interface, by internal name (`java/lang/Object`).
    Reference(String),
    Array(Box<JvmType>),
}

impl JvmType {
    pub fn object() -> Self {
        JvmType::Reference(OBJECT.to_string())
    }

    pub fn string() -> Self {
        JvmType::Reference(STRING.to_string())
    }

    pub fn reference(name: &QualifiedName) -> Self {
        JvmType::Reference(name.internal_name())
    }

    pub fn int() -> Self {
        JvmType::Primitive(PrimitiveKind::Int)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, JvmType::Void)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, JvmType::Reference(_) | JvmType::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JvmType::Reference(name) if name == OBJECT)
    }

    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            JvmType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Internal class name of a reference type.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            JvmType::Reference(name) => Some(name),
            _ => None,
        }
    }

    /// Local-variable and operand-stack slots taken by one value.
    pub fn slots(&self) -> u16 {
        match self {
            JvmType::Void => 0,
            JvmType::Primitive(p) => p.slots(),
            _ => 1,
        }
    }

    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            JvmType::Void => out.push('V'),
            JvmType::Primitive(p) => out.push(p.descriptor()),
            JvmType::Reference(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            JvmType::Array(component) => {
                out.push('[');
                component.write_descriptor(out);
            }
        }
    }

    /// The class-file operand for `checkcast`/`anewarray` style instructions.
    pub fn class_operand(&self) -> String {
        match self {
            JvmType::Reference(name) => name.clone(),
            other => other.descriptor(),
        }
    }

    pub fn parse_field(desc: &str) -> Result<Self, DescriptorError> {
        let (ty, rest) = parse_field_type(desc)?;
        if !rest.is_empty() {
            return Err(DescriptorError(desc.to_string()));
        }
        Ok(ty)
    }
}

impl fmt::Display for JvmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JvmType::Void => f.write_str("Unit"),
            JvmType::Primitive(p) => write!(f, "{p}"),
            JvmType::Reference(name) => f.write_str(&name.replace('/', ".")),
            JvmType::Array(component) => write!(f, "[]{component}"),
        }
    }
}

impl From<PrimitiveKind> for JvmType {
    fn from(p: PrimitiveKind) -> Self {
        JvmType::Primitive(p)
    }
}

/// Parameter kinds plus return kind of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodDescriptor {
    pub params: Vec<JvmType>,
    pub ret: JvmType,
}

impl MethodDescriptor {
    pub fn new(params: Vec<JvmType>, ret: JvmType) -> Self {
        Self { params, ret }
    }

    pub fn void(params: Vec<JvmType>) -> Self {
        Self {
            params,
            ret: JvmType::Void,
        }
    }

    /// Slots taken by the arguments, not counting `this`.
    pub fn arg_slots(&self) -> u16 {
        self.params.iter().map(JvmType::slots).sum()
    }

    pub fn parse(desc: &str) -> Result<Self, DescriptorError> {
        let inner = desc
            .strip_prefix('(')
            .ok_or_else(|| DescriptorError(desc.to_string()))?;
        let mut rest = inner;
        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                return Err(DescriptorError(desc.to_string()));
            }
            let (param, tail) = parse_field_type(rest)?;
            params.push(param);
            rest = tail;
        }

        let ret = if rest == "V" {
            JvmType::Void
        } else {
            JvmType::parse_field(rest).map_err(|_| DescriptorError(desc.to_string()))?
        };
        Ok(Self { params, ret })
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("(");
        for param in &self.params {
            param.write_descriptor(&mut out);
        }
        out.push(')');
        self.ret.write_descriptor(&mut out);
        f.write_str(&out)
    }
}

fn parse_field_type(input: &str) -> Result<(JvmType, &str), DescriptorError> {
    let mut chars = input.chars();
    let first = chars.next().ok_or_else(|| DescriptorError(input.to_string()))?;
    if let Some(p) = PrimitiveKind::from_descriptor(first) {
        return Ok((JvmType::Primitive(p), &input[1..]));
    }
    match first {
        'L' => {
            let end = input
                .find(';')
                .ok_or_else(|| DescriptorError(input.to_string()))?;
            Ok((JvmType::Reference(input[1..end].to_string()), &input[end + 1..]))
        }
        '[' => {
            let (component, rest) = parse_field_type(&input[1..])?;
            Ok((JvmType::Array(Box::new(component)), rest))
        }
        _ => Err(DescriptorError(input.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_descriptors() {
        let desc = MethodDescriptor::new(
            vec![JvmType::int(), JvmType::Primitive(PrimitiveKind::Long), JvmType::string()],
            JvmType::object(),
        );
        assert_eq!(desc.to_string(), "(IJLjava/lang/String;)Ljava/lang/Object;");
        assert_eq!(desc.arg_slots(), 4);
    }

    #[test]
    fn parses_descriptors() {
        let desc = MethodDescriptor::parse("(S[Ljava/lang/Object;)V").unwrap();
        assert_eq!(desc.params[0], JvmType::Primitive(PrimitiveKind::Short));
        assert_eq!(desc.params[1], JvmType::Array(Box::new(JvmType::object())));
        assert!(desc.ret.is_void());
        assert_eq!(desc.to_string(), "(S[Ljava/lang/Object;)V");
    }

    #[test]
    fn rejects_malformed() {
        assert!(MethodDescriptor::parse("I)V").is_err());
        assert!(MethodDescriptor::parse("(Ljava/lang/Object").is_err());
        assert!(MethodDescriptor::parse("(I)").is_err());
        assert!(JvmType::parse_field("IZ").is_err());
    }

    #[test]
    fn display_uses_source_names() {
        assert_eq!(JvmType::string().to_string(), "java.lang.String");
        assert_eq!(JvmType::Void.to_string(), "Unit");
    }
}
