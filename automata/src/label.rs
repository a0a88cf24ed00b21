//! Label-space arithmetic (tag bitset plus the action/collapse label allocator).
//!
//! The transition alphabet is split into three zones, in ascending order:
//! ordinary symbols `[0, action_base)`, action labels `[action_base, collapse_base)`,
//! and collapse labels `[collapse_base, ..)`. Ordinary symbols come straight from the
//! grammar's byte/codepoint alphabet; action and collapse labels are minted on demand
//! by `LabelAllocator` as a definition's expression tree is walked.

/// A transition label. Negative values are reserved (`EPSILON`); non-negative values are
/// partitioned into the three zones above.
pub type Label = i64;

/// The distinguished epsilon value. Never appears as an ordinary, action, or collapse label.
pub const EPSILON: Label = -1;

/// The smallest action/collapse base we will ever allocate, regardless of how small the
/// grammar's declared alphabet is. Matches the byte alphabet size so single-byte grammars
/// still get a full byte of headroom before action labels begin.
pub const MIN_ALPHABET_HI: Label = 256;

/// Per-state provenance flavor: whether a state is the start, an accepting state, or neither,
/// with respect to one particular expression node's subtree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(u8);

impl Tag {
    pub const NONE: Tag = Tag(0);
    pub const START: Tag = Tag(1 << 0);
    pub const INNER: Tag = Tag(1 << 1);
    pub const FINAL: Tag = Tag(1 << 2);

    pub fn union(self, other: Tag) -> Tag {
        Tag(self.0 | other.0)
    }

    pub fn contains(self, other: Tag) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_start(self) -> bool {
        self.contains(Tag::START)
    }

    pub fn is_final(self) -> bool {
        self.contains(Tag::FINAL)
    }
}

impl std::ops::BitOr for Tag {
    type Output = Tag;
    fn bitor(self, rhs: Tag) -> Tag {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for Tag {
    fn bitor_assign(&mut self, rhs: Tag) {
        *self = self.union(rhs);
    }
}

/// Hands out fresh action and collapse labels for a single compilation session, and answers
/// zone-membership questions for labels already minted.
///
/// One allocator is shared by every definition compiled in the same session so that action and
/// collapse labels never collide across definitions, even after their automata are later linked
/// together by the cross-definition linker.
#[derive(Clone, Debug)]
pub struct LabelAllocator {
    pub action_base: Label,
    pub collapse_base: Label,
    next_action: Label,
    next_collapse: Label,
}

impl LabelAllocator {
    /// `alphabet_hi` is the exclusive upper bound of the grammar's ordinary alphabet (256 for a
    /// byte grammar, or higher if `dot`/unicode ranges widen it). Action labels begin there;
    /// `collapse_reserve` is the width of the action zone above `action_base` — it must be large
    /// enough that no action label allocated while compiling a session ever reaches
    /// `collapse_base`, where collapse labels begin.
    pub fn new(alphabet_hi: Label, collapse_reserve: Label) -> Self {
        let action_base = alphabet_hi.max(MIN_ALPHABET_HI);
        let collapse_base = action_base + collapse_reserve;
        LabelAllocator { action_base, collapse_base, next_action: action_base, next_collapse: collapse_base }
    }

    pub fn alloc_action(&mut self) -> Label {
        let label = self.next_action;
        self.next_action += 1;
        assert!(self.next_action <= self.collapse_base, "action label allocation overran the collapse zone");
        label
    }

    pub fn alloc_collapse(&mut self) -> Label {
        let label = self.next_collapse;
        self.next_collapse += 1;
        label
    }

    pub fn is_ordinary(&self, label: Label) -> bool {
        label >= 0 && label < self.action_base
    }

    pub fn is_action(&self, label: Label) -> bool {
        label >= self.action_base && label < self.collapse_base
    }

    pub fn is_collapse(&self, label: Label) -> bool {
        label >= self.collapse_base
    }
}
