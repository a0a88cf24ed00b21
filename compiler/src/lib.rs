//! Compiles an extended-regular-expression definition graph — named definitions, `embed`/`collapse`
//! cross-references, and user-attached semantic actions — into a deterministic dispatch table.
//!
//! The pipeline, end to end:
//!
//! 1. [`thompson`] (C3) builds one annotated NFA per definition via recursive-descent Thompson
//!    construction over [`expr::ExprArena`], anchoring action-bearing states against minimization
//!    merging them away.
//! 2. [`linker`] (C4) splices an exported definition's automaton together with every definition it
//!    reaches through `collapse`, replacing collapse-label placeholders with epsilon wiring, then
//!    determinizes, minimizes, trims, and strips the anti-merge action labels.
//! 3. [`action_compiler`] (C5) diffs each transition's two expression-closures to produce the
//!    entering/leaving/transiting/finishing action sets, and emits a [`action_compiler::DispatchTable`].
//! 4. [`dispatch`] wraps that table in the `start`/`is_final`/`transit` contract callers drive.
//!
//! [`session::Session`] is the entry point gluing all four stages together across a whole set of
//! named definitions.

pub mod action_compiler;
pub mod dispatch;
pub mod error;
pub mod expr;
pub mod linker;
pub mod session;
pub mod thompson;

pub use action_compiler::DispatchTable;
pub use dispatch::{CompiledDefinition, DEAD};
pub use error::{CompileError, Result};
pub use expr::{ActionId, ActionSet, DefId, Definition, ExprArena, ExprId, ExprKind, Loc};
pub use session::{Session, SessionConfig};
