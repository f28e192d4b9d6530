//! Lambda adapter cache.
//!
//! Every lambda class has the same structure; what differs is how the
//! target method's arguments reach the generic `lambda$body` and how its
//! result comes back. That conversion plan depends only on the target
//! descriptor and the shape of the captured state, so it is computed once
//! per shape and reused.

use latte_core::{JvmType, MethodDescriptor, PrimitiveKind};
use rustc_hash::FxHashMap;

/// Shape of a lambda: target method descriptor, enclosing instance type and
/// captured variable types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdapterKey {
    pub sam: MethodDescriptor,
    pub self_ty: JvmType,
    pub captures: Vec<JvmType>,
}

/// How a generic `Object` result becomes the target's return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultAdapter {
    /// `void` target: pop and return.
    Discard,
    /// `LtRuntime.castToX`.
    RuntimeCast(PrimitiveKind),
    Checkcast(String),
    /// `Object` target.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterPlan {
    /// Per target parameter: the primitive to box, or `None` for references.
    pub boxed_params: Vec<Option<PrimitiveKind>>,
    pub result: ResultAdapter,
    /// `<init>(self, captures...)V`
    pub constructor: MethodDescriptor,
    /// `lambda$body(Object...)Object`
    pub body: MethodDescriptor,
}

impl AdapterPlan {
    /// Build the plan for a shape.
    pub fn for_key(key: &AdapterKey) -> Self {
        let boxed_params = key.sam.params.iter().map(JvmType::primitive).collect();
        let result = match &key.sam.ret {
            JvmType::Void => ResultAdapter::Discard,
            JvmType::Primitive(p) => ResultAdapter::RuntimeCast(*p),
            ret if ret.is_object() => ResultAdapter::Direct,
            ret => ResultAdapter::Checkcast(ret.class_operand()),
        };
        let constructor_params = std::iter::once(key.self_ty.clone())
            .chain(key.captures.iter().cloned())
            .collect();
        Self {
            boxed_params,
            result,
            constructor: MethodDescriptor::void(constructor_params),
            body: MethodDescriptor::new(vec![JvmType::object(); key.sam.params.len()], JvmType::object()),
        }
    }
}

/// Cache of adapter plans, shared by every unit a compiler instance builds.
///
/// Maps (target descriptor, self type, capture types) → plan.
#[derive(Debug, Default, Clone)]
pub struct AdapterCache {
    plans: FxHashMap<AdapterKey, AdapterPlan>,
    hits: usize,
}

impl AdapterCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The plan for `key`, built on first use.
    pub fn plan(&mut self, key: AdapterKey) -> AdapterPlan {
        if let Some(plan) = self.plans.get(&key) {
            self.hits += 1;
            return plan.clone();
        }
        let plan = AdapterPlan::for_key(&key);
        tracing::trace!(sam = %key.sam, captures = key.captures.len(), "new lambda adapter shape");
        self.plans.insert(key, plan.clone());
        plan
    }

    /// Look up a cached plan.
    pub fn get(&self, key: &AdapterKey) -> Option<&AdapterPlan> {
        self.plans.get(key)
    }

    /// Number of distinct shapes seen.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }
}
