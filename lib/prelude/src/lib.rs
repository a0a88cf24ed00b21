//! Common utilities shared by every crate in the workspace. Mirrors the shape of the
//! `enso-prelude` crate this project grew out of: a grab-bag of small, generally useful
//! re-exports and helpers rather than a single cohesive abstraction.

pub mod macros;
pub mod phantom;
pub mod reference;

pub use boolinator::Boolinator;
pub use derivative::Derivative;
pub use derive_more::*;
pub use failure::Fail;
pub use itertools::Itertools;
pub use shrinkwraprs::Shrinkwrap;
pub use std::cell::Ref;
pub use std::cell::RefCell;
pub use std::collections::HashMap;
pub use std::collections::HashSet;
pub use std::convert::identity;
pub use std::convert::TryFrom;
pub use std::convert::TryInto;
pub use std::fmt;
pub use std::fmt::Display;
pub use std::hash::Hash;
pub use std::iter;
pub use std::iter::FromIterator;
pub use std::marker::PhantomData;
pub use std::ops::Deref;
pub use std::ops::DerefMut;
pub use std::ops::Index;
pub use std::ops::IndexMut;
pub use std::rc::Rc;
pub use std::rc::Weak;
pub use std::slice;

pub use phantom::*;
pub use reference::*;

/// Anything that can be viewed as a string slice without an explicit conversion call at every
/// use site. Used throughout the workspace in place of a bare `AsRef<str>` bound so that call
/// sites read `impl Str` rather than `impl AsRef<str>`.
pub trait Str: AsRef<str> {}
impl<T: AsRef<str>> Str for T {}

/// `Default::default()`, spelled without repeating the type.
pub fn default<T: Default>() -> T {
    Default::default()
}

/// Clones a value behind reference-counted indirection without cloning the pointee.
///
/// Implemented for `Rc`/`Weak`-shaped wrappers throughout the compiler so that cheap clones of
/// shared compilation state (the definition table, the compiled-cache) read the same as deep
/// clones at the call site.
pub trait CloneRef {
    fn clone_ref(&self) -> Self;
}

impl<T> CloneRef for Rc<T> {
    fn clone_ref(&self) -> Self {
        self.clone()
    }
}

impl<T> CloneRef for Weak<T> {
    fn clone_ref(&self) -> Self {
        self.clone()
    }
}
