//! A small hierarchical logger used throughout the compiler to trace compilation stages
//! (definition compilation, export linking, action compilation) without pulling in a
//! process-wide logging framework. Loggers are cheap, cloneable handles identified by a
//! dotted path (`"compiler.linker"`), so every component can carry its own sub-logger.

#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]

pub mod disabled;
pub mod enabled;

use fsc_prelude::*;

pub use enabled::Logger;



// ==============
// === LogMsg ===
// ==============

/// A message that can be rendered lazily. Implemented both for plain string-likes and for
/// closures so that expensive-to-format diagnostics are only formatted when logging is enabled.
pub trait LogMsg {
    fn with_log_msg<F: FnOnce(&str) -> T, T>(&self, f: F) -> T;
}

impl LogMsg for &str {
    fn with_log_msg<F: FnOnce(&str) -> T, T>(&self, f: F) -> T {
        f(self)
    }
}

impl LogMsg for String {
    fn with_log_msg<F: FnOnce(&str) -> T, T>(&self, f: F) -> T {
        f(self.as_str())
    }
}

impl<F: Fn() -> S, S: Str> LogMsg for F {
    fn with_log_msg<G: FnOnce(&str) -> T, T>(&self, f: G) -> T {
        f(self().as_ref())
    }
}



// =================
// === AnyLogger ===
// =================

/// The common interface of the enabled and disabled logger implementations. Code that only
/// wants to log, without caring whether logging is compiled in, should be generic over this
/// trait rather than naming `Logger` directly.
pub trait AnyLogger: Clone {
    /// The dotted path identifying this logger, e.g. `"compiler.linker"`.
    fn path(&self) -> &str;
    /// Creates a new root logger.
    fn new(path: impl Str) -> Self;
    /// Creates a child logger nested under this one's path.
    fn sub(&self, path: impl Str) -> Self {
        Self::new(format!("{}.{}", self.path(), path.as_ref()))
    }
    fn trace<M: LogMsg>(&self, msg: M);
    fn debug<M: LogMsg>(&self, msg: M);
    fn info<M: LogMsg>(&self, msg: M);
    fn warning<M: LogMsg>(&self, msg: M);
    fn error<M: LogMsg>(&self, msg: M);
    fn group_begin<M: LogMsg>(&self, msg: M);
    fn group_end(&self);

    /// Evaluates `f`, visually grouping everything it logs.
    fn group<M: LogMsg, T, F: FnOnce() -> T>(&self, msg: M, f: F) -> T {
        self.group_begin(msg);
        let out = f();
        self.group_end();
        out
    }
}
