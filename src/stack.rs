//! Stack growth for deep recursion.
//!
//! The parser and interpreter recurse on the host stack once per nested
//! expression, block and call. Wrapping those entry points keeps deeply
//! nested programs from overflowing a small thread stack; the interpreter's
//! call depth limit stays the error a script actually sees.

/// Grow the stack when less than this remains (100KB)
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment (1MB)
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if the current one is
/// nearly exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// wasm manages its own stack
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
