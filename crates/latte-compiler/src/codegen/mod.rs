//! Bytecode generation.
//!
//! [`generate`] turns one [`ResolvedUnit`] into class files: one per
//! declared class or interface, plus one per lambda. Each class is built by
//! a [`ClassGen`]; method bodies are emitted by [`FnGen`], whose `impl` is
//! split by concern:
//!
//! - `stmt`: statements and control flow
//! - `expr`: expression typing and emission
//! - `calls`: call binding and argument passing
//! - `operators`: unary/binary operators and conditions
//! - `conversion`: boxing, unboxing, widening and casts
//! - `guard`: regions left early through `return`, `break` or `continue`
//! - `sync`: `synchronized` blocks
//! - `try_catch`: `try`/`catch`/`finally`
//! - `lambda`: lambda classes and their adapters

mod adapter_cache;
mod calls;
mod conversion;
mod expr;
mod function;
mod guard;
mod lambda;
mod operators;
mod overload;
mod stmt;
mod sync;
mod try_catch;

pub use adapter_cache::{AdapterCache, AdapterKey, AdapterPlan, ResultAdapter};
pub use conversion::{Conversion, ConversionKind, find_conversion};
pub use overload::{ArgTy, OverloadMatch, Selection, select_overload};

use latte_core::{CodeGenError, JvmType, LatteError, MethodDescriptor, QualifiedName};
use latte_registry::{AccessFlags, ClassRegistry};
use rustc_hash::FxHashMap;

use crate::bytecode::ClassWriter;
use crate::emit::InvokeKind;
use crate::hir::{ClassDef, ConstructorDef, InnerFnDef, InnerId, MethodDef, ResolvedUnit};
use function::{FnGen, FnMode};

pub(crate) type Result<T> = std::result::Result<T, CodeGenError>;

pub(crate) const LT_RUNTIME: &str = "lt/runtime/LtRuntime";
pub(crate) const DYNAMIC: &str = "lt/runtime/Dynamic";
pub(crate) const LT_ITERATOR: &str = "lt/runtime/LtIterator";
pub(crate) const THROWABLE: &str = "java/lang/Throwable";

/// One finished class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedClass {
    /// Dotted binary name (`a.b.C$Latte$Lambda$0`).
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct GenOptions {
    /// Value of the `SourceFile` attribute, if one is written.
    pub source_file: Option<String>,
}

/// Generate every class of `unit`. Errors are collected per method.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn generate(
    unit: &ResolvedUnit,
    registry: &ClassRegistry,
    adapters: &mut AdapterCache,
    options: &GenOptions,
) -> std::result::Result<Vec<GeneratedClass>, Vec<LatteError>> {
    let mut out = Vec::new();
    let mut errors = Vec::new();
    for class in &unit.classes {
        let mut generator = ClassGen::new(class, registry, adapters, options);
        generator.run(&mut errors);
        if errors.is_empty() {
            match generator.finish() {
                Ok(classes) => out.extend(classes),
                Err(error) => errors.push(error.into()),
            }
        }
    }
    tracing::debug!(unit = %unit.name, classes = out.len(), "generated unit");
    if errors.is_empty() { Ok(out) } else { Err(errors) }
}

// ============================================================================
// Per-class state
// ============================================================================

/// Signature of a compiled inner function.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InnerSig {
    pub method: String,
    pub takes_self: bool,
    pub captures: Vec<JvmType>,
    pub params: Vec<JvmType>,
    pub ret: JvmType,
    pub descriptor: MethodDescriptor,
}

/// An inner function whose body is emitted once the enclosing method is
/// done.
#[derive(Debug, Clone)]
pub(crate) struct PendingInner {
    pub def: InnerFnDef,
    pub sig: InnerSig,
}

/// State shared by every method of one top-level class, including the
/// bodies of its lambdas.
pub(crate) struct ClassShared<'r> {
    pub registry: &'r ClassRegistry,
    pub class: QualifiedName,
    pub internal: String,
    /// Type of `this` in the class's own methods.
    pub self_ty: JvmType,
    pub adapters: &'r mut AdapterCache,
    pub source_file: Option<String>,
    pub lambda_count: u32,
    pub inner_count: u32,
    pub inner_fns: FxHashMap<InnerId, InnerSig>,
    pub pending: Vec<PendingInner>,
    /// Lambda classes generated so far.
    pub lambdas: Vec<GeneratedClass>,
}

impl ClassShared<'_> {
    pub fn next_lambda_name(&mut self) -> String {
        let name = format!("{}$Latte$Lambda${}", self.internal, self.lambda_count);
        self.lambda_count += 1;
        name
    }

    pub fn next_inner_name(&mut self, name: &str) -> String {
        let method = format!("{name}$Latte$Inner${}", self.inner_count);
        self.inner_count += 1;
        method
    }
}

pub(crate) fn dotted(internal: &str) -> String {
    internal.replace('/', ".")
}

// ============================================================================
// Class generation
// ============================================================================

struct ClassGen<'c, 'r> {
    def: &'c ClassDef,
    writer: ClassWriter,
    shared: ClassShared<'r>,
}

impl<'c, 'r> ClassGen<'c, 'r> {
    fn new(def: &'c ClassDef, registry: &'r ClassRegistry, adapters: &'r mut AdapterCache, options: &GenOptions) -> Self {
        let entry = &def.entry;
        let internal = entry.internal_name();
        let super_name = entry
            .super_class
            .as_ref()
            .map_or_else(|| latte_core::OBJECT.to_string(), QualifiedName::internal_name);
        let mut writer = ClassWriter::new(&internal, &super_name, entry.access);
        for interface in &entry.interfaces {
            writer.add_interface(&interface.internal_name());
        }
        for field in &entry.fields {
            writer.add_field(field.access, &field.name, &field.ty.descriptor());
        }

        let shared = ClassShared {
            registry,
            class: entry.name.clone(),
            self_ty: JvmType::reference(&entry.name),
            internal,
            adapters,
            source_file: options.source_file.clone(),
            lambda_count: 0,
            inner_count: 0,
            inner_fns: FxHashMap::default(),
            pending: Vec::new(),
            lambdas: Vec::new(),
        };
        Self { def, writer, shared }
    }

    fn run(&mut self, errors: &mut Vec<LatteError>) {
        let _span = tracing::debug_span!("class", name = %self.shared.class.dotted()).entered();

        if let Some(ctor) = &self.def.constructor
            && let Err(e) = self.constructor(ctor)
        {
            errors.push(e.into());
        }
        if let Some(body) = &self.def.static_init
            && let Err(e) = self.method_body(
                "<clinit>",
                &MethodDescriptor::void(vec![]),
                AccessFlags::STATIC,
                FnMode::Method { is_static: true },
                body,
            )
        {
            errors.push(e.into());
        }
        for method in &self.def.methods {
            if let Err(e) = self.method(method) {
                errors.push(e.into());
            }
        }
        // Inner functions may declare further inner functions.
        while !self.shared.pending.is_empty() {
            for pending in std::mem::take(&mut self.shared.pending) {
                if let Err(e) = self.inner_fn(&pending) {
                    errors.push(e.into());
                }
            }
        }
    }

    fn finish(mut self) -> Result<Vec<GeneratedClass>> {
        if let Some(file) = &self.shared.source_file {
            self.writer.set_source_file(file);
        }
        let mut out = vec![GeneratedClass {
            name: self.shared.class.dotted(),
            bytes: self.writer.into_bytes()?,
        }];
        out.append(&mut self.shared.lambdas);
        Ok(out)
    }

    fn method(&mut self, method: &MethodDef) -> Result<()> {
        let Some(body) = &method.body else {
            let desc = method.descriptor.to_string();
            self.writer.add_method(method.access, &method.name, &desc, None);
            return Ok(());
        };
        let mode = FnMode::Method {
            is_static: method.is_static(),
        };
        self.method_body(&method.name, &method.descriptor, method.access, mode, body)
    }

    fn method_body(
        &mut self,
        name: &str,
        descriptor: &MethodDescriptor,
        access: AccessFlags,
        mode: FnMode,
        body: &crate::hir::Body,
    ) -> Result<()> {
        let mut generator = FnGen::new(&mut self.shared, self.writer.pool_mut(), name, mode, body, descriptor.ret.clone());
        for (id, ty) in body.params.iter().zip(&descriptor.params) {
            generator.bind_param(*id, ty.clone());
        }
        generator.block(&body.stmts)?;
        let code = generator.finish()?;
        self.writer.add_method(access, name, &descriptor.to_string(), Some(code));
        Ok(())
    }

    /// `super(args)`, then the parameter fields, then initializers.
    fn constructor(&mut self, ctor: &ConstructorDef) -> Result<()> {
        let body = &ctor.body;
        let super_class = self
            .def
            .entry
            .super_class
            .clone()
            .unwrap_or_else(|| QualifiedName::parse("java.lang.Object"));
        let mut generator = FnGen::new(
            &mut self.shared,
            self.writer.pool_mut(),
            "<init>",
            FnMode::Constructor,
            body,
            JvmType::Void,
        );
        for (id, ty) in body.params.iter().zip(&ctor.descriptor.params) {
            generator.bind_param(*id, ty.clone());
        }

        generator.em.load(&JvmType::object(), 0);
        let super_ctor = generator.plan_constructor(&super_class, &ctor.super_args, self.def.span)?;
        generator.emit_args(&ctor.super_args, &super_ctor.params)?;
        generator
            .em
            .invoke(InvokeKind::Special, &super_class.internal_name(), "<init>", &super_ctor);

        let owner = self.def.entry.internal_name();
        for (id, field) in &ctor.fields {
            let ty = generator.local_type(*id, self.def.span)?;
            generator.em.load(&JvmType::object(), 0);
            generator.load_local(*id, self.def.span)?;
            generator.em.put_field(&owner, field, &ty);
        }
        generator.block(&body.stmts)?;
        let code = generator.finish()?;
        self.writer
            .add_method(AccessFlags::PUBLIC, "<init>", &ctor.descriptor.to_string(), Some(code));
        Ok(())
    }

    /// `public static synthetic name$Latte$Inner$N([self], captures..., params...)`
    fn inner_fn(&mut self, pending: &PendingInner) -> Result<()> {
        let PendingInner { def, sig } = pending;
        let mut generator = FnGen::new(
            &mut self.shared,
            self.writer.pool_mut(),
            &sig.method,
            FnMode::Inner {
                takes_self: sig.takes_self,
            },
            &def.body,
            sig.ret.clone(),
        );
        if sig.takes_self {
            generator.reserve_self();
        }
        for (capture, ty) in def.captures.iter().zip(&sig.captures) {
            generator.bind_param(capture.inner, ty.clone());
        }
        for (id, ty) in def.body.params.iter().zip(&sig.params) {
            generator.bind_param(*id, ty.clone());
        }
        generator.block(&def.body.stmts)?;
        let code = generator.finish()?;
        tracing::trace!(method = %sig.method, "generated inner function");
        self.writer.add_method(
            AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::SYNTHETIC,
            &sig.method,
            &sig.descriptor.to_string(),
            Some(code),
        );
        Ok(())
    }
}
