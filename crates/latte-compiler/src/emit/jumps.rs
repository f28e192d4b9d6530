//! Loop bookkeeping for `break` and `continue`.

use super::Label;

/// Stack of enclosing loops, innermost last.
#[derive(Debug, Default)]
pub struct JumpManager {
    loops: Vec<LoopContext>,
}

/// Where `break` and `continue` go for one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopContext {
    /// Starts the next iteration.
    pub continue_label: Label,
    /// First instruction after the loop.
    pub break_label: Label,
    /// Number of guards (`synchronized` blocks, `try` bodies) already open
    /// when the loop started. Leaving the loop unwinds every guard above it.
    pub guard_depth: usize,
}

impl JumpManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_loop(&mut self, continue_label: Label, break_label: Label, guard_depth: usize) {
        self.loops.push(LoopContext {
            continue_label,
            break_label,
            guard_depth,
        });
    }

    pub fn exit_loop(&mut self) -> Option<LoopContext> {
        self.loops.pop()
    }

    /// The innermost loop, if any.
    pub fn current(&self) -> Option<LoopContext> {
        self.loops.last().copied()
    }

    pub fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    pub fn loop_depth(&self) -> usize {
        self.loops.len()
    }

    /// Take away the loops started inside guard `depth` or deeper, so that
    /// a `finally` body copied to an exit sees only the loops around its
    /// `try`.
    pub fn suspend_above(&mut self, depth: usize) -> Vec<LoopContext> {
        let keep = self.loops.partition_point(|l| l.guard_depth <= depth);
        self.loops.split_off(keep)
    }

    pub fn resume(&mut self, suspended: Vec<LoopContext>) {
        self.loops.extend(suspended);
    }
}
