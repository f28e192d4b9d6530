//! `synchronized(a, b, ...)` blocks.
//!
//! Each lock is evaluated once, in order, stored in its own local and
//! entered immediately. Lock `k` protects a region that starts right after
//! its `monitorenter`; the handler of that region releases lock `k` and
//! rethrows. Handler `k` lies inside the regions of locks `0..k`, so a
//! throw cascades outwards releasing one monitor per handler.
//!
//! Leaving the block early (`return`, `break`, `continue`) goes through
//! the guard stack in `guard.rs`: the open regions are closed, every
//! monitor taken since the target was entered is released innermost first,
//! and the regions are reopened behind the jump.
//!
//! ```text
//! eval a; dup; astore s0; monitorenter      region 0 opens
//! eval b; dup; astore s1; monitorenter      region 1 opens
//! body
//! aload s1; monitorexit; aload s0; monitorexit; goto end
//! H1: astore t; aload s1; monitorexit; aload t; athrow    (in region 0)
//! H0: astore t; aload s0; monitorexit; aload t; athrow
//! end:
//! ```

use latte_core::{CodeGenError, JvmType, Span};

use super::Result;
use super::function::FnGen;
use super::guard::{Guard, Region};
use crate::bytecode::Opcode;
use crate::emit::MethodEmitter;
use crate::hir::{Expr, Stmt};

/// One open `synchronized` statement.
#[derive(Debug, Default)]
pub(crate) struct SyncFrame {
    locks: Vec<LockRegion>,
}

/// A held monitor and the code its handler covers.
#[derive(Debug)]
struct LockRegion {
    slot: u16,
    region: Region,
}

impl SyncFrame {
    pub fn reopen(&mut self, em: &mut MethodEmitter<'_>) {
        for lock in &mut self.locks {
            lock.region.open(em);
        }
    }
}

impl FnGen<'_, '_> {
    pub(crate) fn synchronized(&mut self, locks: &[Expr], body: &[Stmt], span: Span) -> Result<()> {
        if locks.is_empty() {
            return self.block(body);
        }
        tracing::debug!(locks = locks.len(), method = self.em.method_name(), "synchronized block");

        let frame = self.guards.len();
        self.guards.push(Guard::Sync(SyncFrame::default()));
        if let Err(e) = self.enter_locks(frame, locks).and_then(|()| self.block(body)) {
            self.guards.truncate(frame);
            return Err(e);
        }

        // Normal exit.
        let end = self.em.new_label();
        let reachable = self.em.is_reachable();
        self.release_frame(frame);
        if reachable {
            self.em.jump(Opcode::Goto, end);
        }

        let Some(Guard::Sync(mut closed)) = self.guards.pop() else {
            return Err(CodeGenError::Unsupported {
                what: "unbalanced synchronized block".into(),
                span,
            });
        };

        // Handlers, innermost lock first, each inside the outer regions.
        let object = JvmType::object();
        let n = closed.locks.len();
        for lock in &mut closed.locks[..n - 1] {
            lock.region.open(&mut self.em);
        }
        let thrown = self.alloc_temp(&object);
        let mut handlers = Vec::with_capacity(n);
        for k in (0..n).rev() {
            let handler = self.em.new_label();
            self.em.place_handler(handler);
            self.em.store(&object, thrown);
            self.em.load(&object, closed.locks[k].slot);
            self.em.op(Opcode::Monitorexit);
            self.em.load(&object, thrown);
            self.em.op(Opcode::Athrow);
            if k > 0 {
                closed.locks[k - 1].region.close(&mut self.em);
            }
            handlers.push(handler);
        }

        for (lock, handler) in closed.locks.into_iter().rev().zip(handlers) {
            lock.region.finish(&mut self.em, handler, None);
        }
        self.em.place(end);
        Ok(())
    }

    /// Evaluate each lock once, keep it in a fresh local and enter it.
    fn enter_locks(&mut self, frame: usize, locks: &[Expr]) -> Result<()> {
        let object = JvmType::object();
        for lock in locks {
            let ty = self.expr(lock)?;
            if let Some(p) = ty.primitive() {
                return Err(CodeGenError::LockOnPrimitive {
                    ty: p.to_string(),
                    span: lock.span(),
                });
            }
            if ty.is_void() {
                return Err(CodeGenError::VoidValue { span: lock.span() });
            }
            self.em.op(Opcode::Dup);
            let slot = self.alloc_temp(&object);
            self.em.store(&object, slot);
            self.em.op(Opcode::Monitorenter);
            let region = Region::opened(&mut self.em);
            if let Some(Guard::Sync(sync)) = self.guards.get_mut(frame) {
                sync.locks.push(LockRegion { slot, region });
            }
        }
        Ok(())
    }

    /// Close the regions of `frame` and release its monitors, innermost
    /// first. Nothing is emitted where the code cannot be reached.
    pub(super) fn release_frame(&mut self, frame: usize) {
        let Some(Guard::Sync(sync)) = self.guards.get_mut(frame) else {
            return;
        };
        for lock in sync.locks.iter_mut().rev() {
            lock.region.close(&mut self.em);
            if self.em.is_reachable() {
                self.em.load(&JvmType::object(), lock.slot);
                self.em.op(Opcode::Monitorexit);
            }
        }
    }
}
