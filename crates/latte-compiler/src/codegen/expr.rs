//! Expression typing and emission.
//!
//! [`FnGen::type_of`] computes the type an expression will leave on the
//! stack without emitting anything; overload selection and operator
//! planning need it before the operands are emitted. [`FnGen::expr`] emits
//! and returns the same type.

use latte_core::{CodeGenError, JvmType, MethodDescriptor, PrimitiveKind, QualifiedName, Span};
use latte_parser::Literal;

use super::function::FnGen;
use super::{DYNAMIC, Result};
use crate::bytecode::Opcode;
use crate::emit::InvokeKind;
use crate::hir::Expr;

const ARRAY_LIST: &str = "java/util/ArrayList";
const LINKED_HASH_MAP: &str = "java/util/LinkedHashMap";
const CLASS: &str = "java/lang/Class";

/// How a field is read or written.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldAccess {
    Bound { owner: String, ty: JvmType },
    /// `Dynamic.getField`/`Dynamic.putField`.
    Dynamic,
}

pub(crate) fn literal_type(literal: &Literal) -> JvmType {
    match literal {
        Literal::Int(_) => JvmType::int(),
        Literal::Long(_) => PrimitiveKind::Long.into(),
        Literal::Float(_) => PrimitiveKind::Float.into(),
        Literal::Double(_) => PrimitiveKind::Double.into(),
        Literal::Bool(_) => PrimitiveKind::Boolean.into(),
        Literal::Str(_) => JvmType::string(),
        Literal::Null => JvmType::object(),
    }
}

pub(crate) fn get_field_desc() -> MethodDescriptor {
    MethodDescriptor::new(vec![JvmType::object(), JvmType::string()], JvmType::object())
}

pub(crate) fn put_field_desc() -> MethodDescriptor {
    MethodDescriptor::void(vec![JvmType::object(), JvmType::string(), JvmType::object()])
}

impl FnGen<'_, '_> {
    // ==========================================================================
    // Typing
    // ==========================================================================

    pub(crate) fn type_of(&self, expr: &Expr) -> Result<JvmType> {
        match expr {
            Expr::Literal(literal, _) => Ok(literal_type(literal)),
            Expr::Local(id, _) => Ok(self.expected_local_type(*id)),
            Expr::This(span) => self.this_type().ok_or_else(|| CodeGenError::Unsupported {
                what: "'this' in a static context".into(),
                span: *span,
            }),
            Expr::Field { target, name, .. } => {
                let target_ty = self.type_of(target)?;
                Ok(match self.field_access(&target_ty, name) {
                    FieldAccess::Bound { ty, .. } => ty,
                    FieldAccess::Dynamic => JvmType::object(),
                })
            }
            Expr::StaticField { owner, name, span } => Ok(self.static_field(owner, name, *span)?.1),
            Expr::Type(..) => Ok(JvmType::Reference(CLASS.into())),
            Expr::Call { callee, args, span } => Ok(self.plan_call(callee, args, *span)?.ret(self)),
            Expr::New { class, .. } => Ok(JvmType::reference(class)),
            Expr::Unary { op, operand, .. } => self.unary_type(*op, operand),
            Expr::Binary { op, left, right, .. } => self.binary_type(*op, left, right),
            Expr::Cast { ty, .. } => Ok(ty.clone()),
            Expr::Lambda(lambda) => self.lambda_type(lambda, None),
            Expr::List(..) => Ok(JvmType::Reference(ARRAY_LIST.into())),
            Expr::Map(..) => Ok(JvmType::Reference(LINKED_HASH_MAP.into())),
        }
    }

    /// Instance field `name` of a value of type `target`.
    pub(crate) fn field_access(&self, target: &JvmType, name: &str) -> FieldAccess {
        let JvmType::Reference(owner) = target else {
            return FieldAccess::Dynamic;
        };
        match self.registry().find_field(&QualifiedName::parse(owner), name) {
            Some((_, field)) if !field.is_static() => FieldAccess::Bound {
                owner: owner.clone(),
                ty: field.ty.clone(),
            },
            _ => FieldAccess::Dynamic,
        }
    }

    /// Owner (internal name) and type of a static field.
    pub(crate) fn static_field(&self, owner: &QualifiedName, name: &str, span: Span) -> Result<(String, JvmType)> {
        match self.registry().find_field(owner, name) {
            Some((_, field)) if field.is_static() => Ok((owner.internal_name(), field.ty.clone())),
            _ => Err(CodeGenError::UnknownMember {
                owner: owner.dotted(),
                name: name.to_string(),
                span,
            }),
        }
    }

    // ==========================================================================
    // Emission
    // ==========================================================================

    /// Emit `expr` and return the type it left on the stack.
    pub(crate) fn expr(&mut self, expr: &Expr) -> Result<JvmType> {
        match expr {
            Expr::Literal(literal, _) => {
                self.literal(literal);
                Ok(literal_type(literal))
            }
            Expr::Local(id, span) => self.load_local(*id, *span),
            Expr::This(span) => self.load_this(*span),
            Expr::Field { target, name, span } => {
                let target_ty = self.expr(target)?;
                match self.field_access(&target_ty, name) {
                    FieldAccess::Bound { owner, ty } => {
                        self.em.get_field(&owner, name, &ty);
                        Ok(ty)
                    }
                    FieldAccess::Dynamic => {
                        self.box_value(&target_ty, *span)?;
                        self.em.push_string(name);
                        self.em.invoke(InvokeKind::Static, DYNAMIC, "getField", &get_field_desc());
                        Ok(JvmType::object())
                    }
                }
            }
            Expr::StaticField { owner, name, span } => {
                let (owner, ty) = self.static_field(owner, name, *span)?;
                self.em.get_static(&owner, name, &ty);
                Ok(ty)
            }
            Expr::Type(class, _) => {
                self.em.push_class(&class.internal_name());
                Ok(JvmType::Reference(CLASS.into()))
            }
            Expr::Call { callee, args, span } => self.call(callee, args, *span),
            Expr::New { class, args, span } => self.new_object(class, args, *span),
            Expr::Unary { op, operand, span } => self.unary(*op, operand, *span),
            Expr::Binary { op, left, right, span } => self.binary(*op, left, right, *span),
            Expr::Cast { expr, ty, .. } => {
                self.expr_as(expr, ty)?;
                Ok(ty.clone())
            }
            Expr::Lambda(lambda) => self.lambda(lambda, None),
            Expr::List(items, _) => {
                self.new_empty(ARRAY_LIST);
                let add = MethodDescriptor::new(vec![JvmType::object()], PrimitiveKind::Boolean.into());
                for item in items {
                    self.em.op(Opcode::Dup);
                    self.expr_as(item, &JvmType::object())?;
                    self.em.invoke(InvokeKind::Virtual, ARRAY_LIST, "add", &add);
                    self.em.op(Opcode::Pop);
                }
                Ok(JvmType::Reference(ARRAY_LIST.into()))
            }
            Expr::Map(entries, _) => {
                self.new_empty(LINKED_HASH_MAP);
                let put = MethodDescriptor::new(vec![JvmType::object(), JvmType::object()], JvmType::object());
                for (key, value) in entries {
                    self.em.op(Opcode::Dup);
                    self.expr_as(key, &JvmType::object())?;
                    self.expr_as(value, &JvmType::object())?;
                    self.em.invoke(InvokeKind::Virtual, LINKED_HASH_MAP, "put", &put);
                    self.em.op(Opcode::Pop);
                }
                Ok(JvmType::Reference(LINKED_HASH_MAP.into()))
            }
        }
    }

    /// Emit `expr` converted to `target`. Lambdas are built for `target`
    /// and `null` fits any reference.
    pub(crate) fn expr_as(&mut self, expr: &Expr, target: &JvmType) -> Result<()> {
        match expr {
            Expr::Lambda(lambda) => {
                let ty = self.lambda(lambda, Some(target))?;
                self.convert(&ty, target, lambda.span)
            }
            Expr::Literal(Literal::Null, span) => match target {
                JvmType::Reference(_) | JvmType::Array(_) => {
                    self.em.push_null();
                    Ok(())
                }
                _ => Err(CodeGenError::conversion("null", target, *span)),
            },
            other => {
                let ty = self.expr(other)?;
                self.convert(&ty, target, other.span())
            }
        }
    }

    /// Evaluate `expr` for its effects only.
    pub(crate) fn discard(&mut self, expr: &Expr) -> Result<()> {
        let ty = self.expr(expr)?;
        self.em.pop_value(&ty);
        Ok(())
    }

    fn literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Int(value) => self.em.push_int(*value),
            Literal::Long(value) => self.em.push_long(*value),
            Literal::Float(value) => self.em.push_float(value.into_inner() as f32),
            Literal::Double(value) => self.em.push_double(value.into_inner()),
            Literal::Bool(value) => self.em.push_bool(*value),
            Literal::Str(value) => self.em.push_string(value),
            Literal::Null => self.em.push_null(),
        }
    }

    /// `new C()` with the no-argument constructor.
    fn new_empty(&mut self, internal: &str) {
        self.em.type_insn(Opcode::New, internal);
        self.em.op(Opcode::Dup);
        self.em
            .invoke(InvokeKind::Special, internal, "<init>", &MethodDescriptor::void(vec![]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::tests::compile_one;

    #[test]
    fn literals_have_their_kinds() {
        assert_eq!(literal_type(&Literal::Long(1)), PrimitiveKind::Long.into());
        assert_eq!(literal_type(&Literal::Str("s".into())), JvmType::string());
        assert_eq!(literal_type(&Literal::Null), JvmType::object());
    }

    #[test]
    fn static_fields_and_their_members() {
        let class = compile_one("class A\n  static\n    def f() = System.out.println(\"hi\")\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(code.count(Opcode::Getstatic), 1);
        let call = code.invocations().next().unwrap();
        assert_eq!(call.member(), Some(("java/io/PrintStream", "println", "(Ljava/lang/String;)V")));
    }

    #[test]
    fn list_and_map_literals() {
        let class = compile_one("class A\n  def f() = [1, 2]\n  def g() = [\"a\": 1]\n");
        let list = class.method("f").unwrap().code.as_ref().unwrap();
        assert_eq!(list.count(Opcode::New), 1);
        assert_eq!(
            list.invocations().filter(|i| i.member().is_some_and(|m| m.1 == "add")).count(),
            2
        );
        let map = class.method("g").unwrap().code.as_ref().unwrap();
        assert!(map.invocations().any(|i| i.member() == Some((LINKED_HASH_MAP, "put", "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;"))));
    }

    #[test]
    fn unknown_fields_are_read_dynamically() {
        let class = compile_one("class A\n  def f(o) = o.name\n");
        let code = class.method("f").unwrap().code.as_ref().unwrap();
        let call = code.invocations().next().unwrap();
        assert_eq!(call.member().map(|m| m.1), Some("getField"));
    }
}
