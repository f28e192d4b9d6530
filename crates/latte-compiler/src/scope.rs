//! Lexical scopes used while resolving bodies.
//!
//! [`LocalScope`] maps source names to [`LocalId`]s for one function and
//! handles:
//! - Variable declaration into the function's local table
//! - Nested block scopes (if/while/synchronized bodies)
//! - Variable shadowing with restoration on scope exit
//! - Capture of variables of enclosing functions by lambdas and inner
//!   functions
//! - Inner function names, visible from their declaration to the end of the
//!   enclosing block

use latte_core::{JvmType, Span};
use rustc_hash::FxHashMap;

use crate::hir::{Capture, InnerId, LocalDecl, LocalId, LocalKind};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone)]
struct ScopedVar {
    id: LocalId,
    depth: u32,
}

#[derive(Debug, Clone)]
struct ScopedFn {
    name: String,
    id: InnerId,
    /// Names the function captures, passed again at every call.
    captures: Vec<String>,
    depth: u32,
}

/// What a finished function scope hands back.
#[derive(Debug, Default)]
pub struct FunctionFrame {
    pub locals: Vec<LocalDecl>,
    pub captures: Vec<Capture>,
}

/// An inner function visible by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerFnRef {
    pub id: InnerId,
    pub captures: Vec<String>,
}

// ============================================================================
// LocalScope
// ============================================================================

/// Names visible in the function being resolved, chained to the scopes of
/// the functions around it.
#[derive(Debug, Default)]
pub struct LocalScope {
    variables: FxHashMap<String, ScopedVar>,

    /// Current block depth (0 = function scope)
    scope_depth: u32,

    /// Variables hidden by a declaration at `depth`, restored when that
    /// block is left: (depth, name, hidden)
    shadowed: Vec<(u32, String, ScopedVar)>,

    functions: Vec<ScopedFn>,

    /// Local table of this function, indexed by [`LocalId`].
    locals: Vec<LocalDecl>,

    captures: Vec<Capture>,

    /// Whether code here runs with an enclosing instance.
    has_self: bool,

    parent: Option<Box<LocalScope>>,
}

impl LocalScope {
    /// Scope of a method body.
    pub fn new(has_self: bool) -> Self {
        Self {
            has_self,
            ..Self::default()
        }
    }

    // ==========================================================================
    // Function Scopes
    // ==========================================================================

    /// Start the scope of a lambda or inner function nested in the current
    /// one. Variables of the current function become reachable only through
    /// captures.
    pub fn enter_function(&mut self) {
        let parent = std::mem::take(self);
        let has_self = parent.has_self;
        *self = Self {
            has_self,
            parent: Some(Box::new(parent)),
            ..Self::default()
        };
    }

    /// Leave a function scope entered with [`enter_function`](Self::enter_function).
    pub fn exit_function(&mut self) -> FunctionFrame {
        let parent = self.parent.take().map(|p| *p).unwrap_or_default();
        let frame = std::mem::replace(self, parent);
        FunctionFrame {
            locals: frame.locals,
            captures: frame.captures,
        }
    }

    /// Hand back the local table of the outermost function.
    pub fn finish(self) -> FunctionFrame {
        FunctionFrame {
            locals: self.locals,
            captures: self.captures,
        }
    }

    pub fn has_self(&self) -> bool {
        self.has_self
    }

    // ==========================================================================
    // Block Scopes
    // ==========================================================================

    pub fn push_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Exit the current block, forgetting what was declared in it.
    pub fn pop_scope(&mut self) {
        let depth = self.scope_depth;
        self.variables.retain(|_, var| var.depth < depth);
        self.functions.retain(|f| f.depth < depth);

        while let Some((shadow_depth, _, _)) = self.shadowed.last() {
            if *shadow_depth != depth {
                break;
            }
            if let Some((_, name, var)) = self.shadowed.pop() {
                self.variables.insert(name, var);
            }
        }

        self.scope_depth = depth.saturating_sub(1);
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    /// Declare a variable in the current block. A variable of the same name
    /// declared further out is hidden until the block is left.
    pub fn declare(&mut self, name: &str, kind: LocalKind, declared: Option<JvmType>, span: Span) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalDecl {
            name: name.to_string(),
            kind,
            declared,
            span,
        });
        let var = ScopedVar {
            id,
            depth: self.scope_depth,
        };
        if let Some(hidden) = self.variables.insert(name.to_string(), var)
            && hidden.depth < self.scope_depth
        {
            self.shadowed.push((self.scope_depth, name.to_string(), hidden));
        }
        id
    }

    pub fn declare_function(&mut self, name: &str, id: InnerId, captures: Vec<String>) {
        self.functions.push(ScopedFn {
            name: name.to_string(),
            id,
            captures,
            depth: self.scope_depth,
        });
    }

    /// Capture `name` from the enclosing function up front. Used for inner
    /// functions, whose capture list must be known before their body is
    /// resolved.
    pub fn capture(&mut self, name: &str) -> Option<LocalId> {
        self.lookup(name)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Find a variable, capturing it from enclosing functions if needed.
    pub fn lookup(&mut self, name: &str) -> Option<LocalId> {
        if let Some(var) = self.variables.get(name) {
            return Some(var.id);
        }
        let outer = self.parent.as_mut()?.lookup(name)?;

        let span = self
            .parent
            .as_ref()
            .map(|p| p.locals[outer.0 as usize].span)
            .unwrap_or_default();
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalDecl {
            name: name.to_string(),
            kind: LocalKind::Capture,
            declared: None,
            span,
        });
        // Captures live for the whole function.
        self.variables.insert(name.to_string(), ScopedVar { id, depth: 0 });
        self.captures.push(Capture { outer, inner: id });
        Some(id)
    }

    /// Whether `name` is a variable here or in an enclosing function,
    /// without capturing it.
    pub fn is_visible(&self, name: &str) -> bool {
        self.variables.contains_key(name) || self.parent.as_ref().is_some_and(|p| p.is_visible(name))
    }

    /// Find an inner function by name, innermost declaration first, looking
    /// through enclosing functions.
    pub fn lookup_function(&self, name: &str) -> Option<InnerFnRef> {
        self.functions
            .iter()
            .rev()
            .find(|f| f.name == name)
            .map(|f| InnerFnRef {
                id: f.id,
                captures: f.captures.clone(),
            })
            .or_else(|| self.parent.as_ref()?.lookup_function(name))
    }

    pub fn local(&self, id: LocalId) -> &LocalDecl {
        &self.locals[id.0 as usize]
    }
}
