//! `try` / `catch` / `finally`.
//!
//! `catch e` catches every `Throwable`. The handler passes it through
//! `LtRuntime.throwableWrapperObject`, so a value thrown through
//! `castToThrowable` reaches `e` as it was thrown.
//!
//! A `finally` body is copied onto every way out of the statement: the end
//! of the `try` body, the end of the `catch` body, every early `return`,
//! `break` or `continue` (see `guard.rs`), and a catch-all handler that
//! rethrows. No copy lies inside the range of its own handler.
//!
//! ```text
//!     body                          finally and catch ranges
//!     finally body; goto end
//! C:  unwrap; store e               finally range
//!     catch body
//!     finally body; goto end
//! F:  astore t; finally body; aload t; athrow
//! end:
//! ```

use latte_core::{CodeGenError, JvmType, MethodDescriptor, Span};

use super::function::FnGen;
use super::guard::{Guard, Region};
use super::{LT_RUNTIME, Result, THROWABLE};
use crate::bytecode::Opcode;
use crate::emit::{InvokeKind, Label};
use crate::hir::{LocalId, Stmt};

impl FnGen<'_, '_> {
    pub(crate) fn try_stmt(
        &mut self,
        body: &[Stmt],
        catch: Option<(LocalId, &[Stmt])>,
        finally: Option<&[Stmt]>,
        span: Span,
    ) -> Result<()> {
        if catch.is_none() && finally.is_none() {
            return self.block(body);
        }
        tracing::debug!(
            catch = catch.is_some(),
            finally = finally.is_some(),
            method = self.em.method_name(),
            "try statement"
        );
        let depth = self.guards.len();
        let result = self.try_parts(depth, body, catch, finally, span);
        if result.is_err() {
            self.guards.truncate(depth);
        }
        result
    }

    fn try_parts(
        &mut self,
        depth: usize,
        body: &[Stmt],
        catch: Option<(LocalId, &[Stmt])>,
        finally: Option<&[Stmt]>,
        span: Span,
    ) -> Result<()> {
        if let Some(finally) = finally {
            let region = Region::opened(&mut self.em);
            self.guards.push(Guard::Finally {
                region,
                body: finally.to_vec(),
            });
        }
        if catch.is_some() {
            let region = Region::opened(&mut self.em);
            self.guards.push(Guard::Catch(region));
        }
        self.block(body)?;

        let end = self.em.new_label();
        if let Some((local, handler_body)) = catch {
            let Some(Guard::Catch(mut caught)) = self.guards.pop() else {
                return Err(unbalanced(span));
            };
            caught.close(&mut self.em);
            self.leave_try(depth, end)?;

            self.reopen_from(depth);
            let handler = self.em.new_label();
            self.em.place_handler(handler);
            let unwrap = MethodDescriptor::new(vec![JvmType::Reference(THROWABLE.into())], JvmType::object());
            self.em.invoke(InvokeKind::Static, LT_RUNTIME, "throwableWrapperObject", &unwrap);
            let slot = self.define_local(local, JvmType::object());
            self.em.store(&slot.ty, slot.slot);
            self.block(handler_body)?;
            self.leave_try(depth, end)?;
            caught.finish(&mut self.em, handler, Some(THROWABLE));
        } else {
            self.leave_try(depth, end)?;
        }

        if finally.is_some() {
            let Some(Guard::Finally { mut region, body }) = self.guards.pop() else {
                return Err(unbalanced(span));
            };
            region.close(&mut self.em);
            let object = JvmType::object();
            let handler = self.em.new_label();
            self.em.place_handler(handler);
            let thrown = self.alloc_temp(&object);
            self.em.store(&object, thrown);
            self.block(&body)?;
            if self.em.is_reachable() {
                self.em.load(&object, thrown);
                self.em.op(Opcode::Athrow);
            }
            region.finish(&mut self.em, handler, None);
        }

        self.em.place(end);
        Ok(())
    }

    /// Normal end of a `try` or `catch` body: run the `finally` body, if
    /// there is one, and jump past the statement.
    fn leave_try(&mut self, depth: usize, end: Label) -> Result<()> {
        if self.guards.len() > depth {
            self.run_finally(depth)?;
        }
        if self.em.is_reachable() {
            self.em.jump(Opcode::Goto, end);
        }
        Ok(())
    }
}

fn unbalanced(span: Span) -> CodeGenError {
    CodeGenError::Unsupported {
        what: "unbalanced try statement".into(),
        span,
    }
}
