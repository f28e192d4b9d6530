//! Code regions that need work done when control leaves them.
//!
//! Every open `synchronized` block and every `try` body is a [`Guard`],
//! kept on a stack in [`FnGen`], outermost first. A guard owns the code
//! ranges its exception handler covers.
//!
//! Leaving guards early (`return`, `break`, `continue`) unwinds them
//! innermost first: monitors are released and `finally` bodies are copied
//! in front of the jump. The copied code lies outside the ranges of the
//! guards it unwinds. Once the jump is emitted the ranges are reopened.

use super::Result;
use super::function::FnGen;
use super::sync::SyncFrame;
use crate::emit::{Label, MethodEmitter};
use crate::hir::Stmt;

/// Code ranges covered by one exception handler.
#[derive(Debug, Default)]
pub(crate) struct Region {
    ranges: Vec<(Label, Label)>,
    /// Start of the range currently being emitted.
    open: Option<Label>,
}

impl Region {
    /// A region whose first range starts here.
    pub fn opened(em: &mut MethodEmitter<'_>) -> Self {
        let mut region = Self::default();
        region.open(em);
        region
    }

    pub fn open(&mut self, em: &mut MethodEmitter<'_>) {
        if self.open.is_none() {
            let start = em.new_label();
            em.place(start);
            self.open = Some(start);
        }
    }

    pub fn close(&mut self, em: &mut MethodEmitter<'_>) {
        if let Some(start) = self.open.take() {
            let end = em.new_label();
            em.place(end);
            self.ranges.push((start, end));
        }
    }

    /// Close the region and send every range to `handler`.
    pub fn finish(mut self, em: &mut MethodEmitter<'_>, handler: Label, catch_type: Option<&str>) {
        self.close(em);
        for (start, end) in self.ranges {
            em.add_handler(start, end, handler, catch_type);
        }
    }
}

#[derive(Debug)]
pub(crate) enum Guard {
    Sync(SyncFrame),
    /// Body of a `try` with a `catch`. Leaving it only ends the range.
    Catch(Region),
    /// Body of a `try`, or of its `catch`, followed by `finally`. Leaving
    /// it runs the `finally` body first.
    Finally { region: Region, body: Vec<Stmt> },
}

impl FnGen<'_, '_> {
    /// Unwind every guard from `depth` up, innermost first.
    pub(crate) fn release_from(&mut self, depth: usize) -> Result<()> {
        for index in (depth..self.guards.len()).rev() {
            match self.guards[index] {
                Guard::Sync(_) => self.release_frame(index),
                Guard::Catch(ref mut region) => region.close(&mut self.em),
                Guard::Finally { .. } => self.run_finally(index)?,
            }
        }
        Ok(())
    }

    /// Reopen the ranges closed by [`FnGen::release_from`].
    pub(crate) fn reopen_from(&mut self, depth: usize) {
        for index in depth..self.guards.len() {
            match self.guards[index] {
                Guard::Sync(ref mut frame) => frame.reopen(&mut self.em),
                Guard::Catch(ref mut region) | Guard::Finally { ref mut region, .. } => region.open(&mut self.em),
            }
        }
    }

    /// Copy the `finally` body of guard `index` to the current position.
    /// While it is emitted the guard and everything above it are set
    /// aside, together with the loops started inside them.
    pub(crate) fn run_finally(&mut self, index: usize) -> Result<()> {
        let mut above = self.guards.split_off(index);
        let result = match above.first_mut() {
            Some(Guard::Finally { region, body }) => {
                region.close(&mut self.em);
                if self.em.is_reachable() {
                    let loops = self.em.jumps().suspend_above(index);
                    let result = self.block(body);
                    self.em.jumps().resume(loops);
                    result
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        };
        self.guards.extend(above);
        result
    }
}
