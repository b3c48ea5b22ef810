use std::collections::HashSet;

use tracing::warn;

/// Compile-time view of lexical scopes: a stack of frames of bound names.
///
/// Frame 0 is the unit's global frame and is never popped. The stack
/// mirrors the `OpenScope`/`CloseScope` instructions the compiler emits.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<HashSet<String>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![HashSet::new()],
        }
    }

    /// Number of frames above the global one.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn push(&mut self) {
        self.frames.push(HashSet::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// `:=` binds in the innermost frame, shadowing outer bindings.
    pub fn declare(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string());
        }
    }

    /// `=` rebinds the nearest existing binding. A name bound nowhere is
    /// bound in the innermost frame, as `StoreName` does at runtime.
    pub fn assign(&mut self, name: &str) {
        if self.is_bound(name) {
            return;
        }
        warn!(ident = %name, depth = self.depth(), "assignment to undeclared name");
        self.declare(name);
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|frame| frame.contains(name))
    }
}
