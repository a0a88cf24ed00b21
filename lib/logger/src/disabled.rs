//! A logger implementation that compiles all logging out. Swap `crate::enabled::Logger` for
//! `crate::disabled::Logger` in a component to strip its tracing from release builds without
//! touching call sites.

use fsc_prelude::*;

use crate::AnyLogger;
use crate::LogMsg;

/// A logger whose every method is a no-op. Still carries a path so it round-trips with the
/// enabled logger via `From`.
#[derive(Clone, Debug, Default)]
pub struct Logger {
    pub path: Rc<String>,
}

impl CloneRef for Logger {
    fn clone_ref(&self) -> Self {
        Logger { path: self.path.clone_ref() }
    }
}

impl From<crate::enabled::Logger> for Logger {
    fn from(logger: crate::enabled::Logger) -> Self {
        Self::new(logger.path())
    }
}

impl AnyLogger for Logger {
    fn path(&self) -> &str {
        self.path.as_str()
    }

    fn new(path: impl Str) -> Self {
        Self { path: Rc::new(path.as_ref().to_owned()) }
    }

    fn trace<M: LogMsg>(&self, _msg: M) {}
    fn debug<M: LogMsg>(&self, _msg: M) {}
    fn info<M: LogMsg>(&self, _msg: M) {}
    fn warning<M: LogMsg>(&self, _msg: M) {}
    fn error<M: LogMsg>(&self, _msg: M) {}
    fn group_begin<M: LogMsg>(&self, _msg: M) {}
    fn group_end(&self) {}
}
