//! The core's own error channel. Everything here is a failure the core's *own* bookkeeping can
//! detect; unknown identifiers and duplicate definitions discovered by the driver's own name
//! resolution are reported through the driver's separate diagnostic stream, never through this
//! type.

use fsc_prelude::*;

use crate::expr::{DefId, Loc};

/// A result of a core compilation entry point.
pub type Result<T> = std::result::Result<T, CompileError>;

/// An error surfaced by the core itself, rather than by the driver's surrounding diagnostics.
#[derive(Debug, Fail)]
pub enum CompileError {
    /// `repeat(low, high)` with `low > high` (`high = None` meaning unbounded is always valid).
    InvalidRepeat { low: u32, high: u32, loc: Loc },

    /// An `Embed` dependency cycle was found while topologically ordering definitions.
    CyclicEmbed(Vec<String>),

    /// A `Collapse` or `Embed` names a definition absent from this session's definition table.
    UndefinedReference(DefId),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CompileError::InvalidRepeat { low, high, .. } => {
                write!(f, "invalid repeat bound {{{}, {}}}: low must not exceed high", low, high)
            }
            CompileError::CyclicEmbed(path) => write!(f, "circular embedding: {}", path.join(" -> ")),
            CompileError::UndefinedReference(id) => write!(f, "reference to undefined definition {:?}", id),
        }
    }
}

impl CompileError {
    pub fn invalid_repeat(low: u32, high: u32, loc: Loc) -> CompileError {
        CompileError::InvalidRepeat { low, high, loc }
    }
}
