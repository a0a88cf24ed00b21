//! Finite-state automaton primitives, annotated with expression-tree provenance.
//!
//! This crate has three layers, in order of dependency:
//!
//! - [`fsa`]: bare epsilon-NFA/DFA structure and the structural operations (epsilon-closure,
//!   product, subset construction, Hopcroft minimization, accessibility pruning) that don't know
//!   anything about what a transition label *means*.
//! - [`label`]: the label-space arithmetic (ordinary/action/collapse zones) and the per-state tag
//!   bitset used to classify a state's role (`start`/`inner`/`final`) within some subtree.
//! - [`anno`]: `AnnotatedFsa<T>`, which pairs a bare `Fsa` with a per-state multimap from caller-
//!   supplied keys `T` (an expression-tree node, from the caller's point of view) to the tags
//!   under which that state belongs to the key's subtree, and re-derives that multimap through
//!   every structural operation.

pub mod anno;
pub mod fsa;
pub mod label;
pub mod unicode;

pub use anno::AnnotatedFsa;
pub use fsa::{EdgeLabel, Fsa, StateId};
pub use label::{Label, LabelAllocator, Tag, EPSILON};
