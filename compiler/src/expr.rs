//! The expression-tree contract consumed from the (external, out-of-scope) parser, and the
//! position bookkeeping (`pre`/`post`/`depth`/`anc[k]`) the Thompson builder precomputes over it.
//!
//! Expression nodes live in a flat, append-only arena keyed by a stable `ExprId`, with
//! `pre`/`post`/`depth`/`anc[]` held in parallel tables filled in by [`ExprArena::place`] /
//! [`ExprArena::finish`] as the Thompson builder walks the tree. Lowest-common-ancestor is then a
//! pure function of two indices, answerable in `O(log depth)` via binary lifting.

use fsc_automata::Tag;

pub type ExprId = usize;
pub type DefId = usize;
pub type ActionId = u32;

/// An opaque source range, never interpreted by the core — only carried through to diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Loc {
    pub start: u32,
    pub end: u32,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Literal(Vec<u8>),
    Dot,
    Bracket(Vec<(i64, i64)>),
    UnicodeRange(u32, u32),
    Epsilon,
    Collapse(DefId),
    Embed(DefId),
    Concat(ExprId, ExprId),
    Union(ExprId, ExprId),
    Star(ExprId),
    Plus(ExprId),
    Question(ExprId),
    Repeat(ExprId, u32, Option<u32>),
    Complement(ExprId),
    Difference(ExprId, ExprId),
    Intersect(ExprId, ExprId),
}

impl ExprKind {
    /// The node's children, in the order the parser pre-ordered them (used for `pre`/`post`
    /// ticking; the Thompson builder itself visits binary nodes right-before-left).
    pub fn children(&self) -> Vec<ExprId> {
        use ExprKind::*;
        match *self {
            Literal(_) | Dot | Bracket(_) | UnicodeRange(..) | Epsilon | Collapse(_) | Embed(_) => vec![],
            Star(e) | Plus(e) | Question(e) | Repeat(e, _, _) | Complement(e) => vec![e],
            Concat(l, r) | Union(l, r) | Difference(l, r) | Intersect(l, r) => vec![l, r],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ActionSet {
    pub entering: Vec<ActionId>,
    pub leaving: Vec<ActionId>,
    pub transiting: Vec<ActionId>,
    pub finishing: Vec<ActionId>,
}

impl ActionSet {
    pub fn is_empty(&self) -> bool {
        self.entering.is_empty() && self.leaving.is_empty() && self.transiting.is_empty() && self.finishing.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub loc: Loc,
    pub actions: ActionSet,
    pub stmt: DefId,
}

/// A named top-level definition. `export_params` is an opaque pass-through string attached to the
/// emitted `transit` function's signature; the core never parses it.
#[derive(Clone, Debug)]
pub struct Definition {
    pub name: String,
    pub root: ExprId,
    pub export: bool,
    pub intact: bool,
    pub export_params: String,
}

const LIFT_LEVELS: usize = 32;

/// Owns every expression node for a compilation session, plus the position tables used to answer
/// ancestor and LCA queries in `O(log depth)`.
#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
    parent: Vec<Option<ExprId>>,
    pre: Vec<u32>,
    post: Vec<u32>,
    depth: Vec<u32>,
    anc: Vec<[Option<ExprId>; LIFT_LEVELS]>,
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena::default()
    }

    pub fn push(&mut self, kind: ExprKind, loc: Loc, actions: ActionSet, stmt: DefId) -> ExprId {
        let id = self.nodes.len();
        self.nodes.push(ExprNode { kind, loc, actions, stmt });
        self.parent.push(None);
        self.pre.push(0);
        self.post.push(0);
        self.depth.push(0);
        self.anc.push([None; LIFT_LEVELS]);
        id
    }

    pub fn node(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id]
    }

    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.nodes[id].kind
    }

    pub fn actions(&self, id: ExprId) -> &ActionSet {
        &self.nodes[id].actions
    }

    pub fn stmt(&self, id: ExprId) -> DefId {
        self.nodes[id].stmt
    }

    pub fn pre(&self, id: ExprId) -> u32 {
        self.pre[id]
    }

    pub fn parent(&self, id: ExprId) -> Option<ExprId> {
        self.parent[id]
    }

    /// Records `id`'s tree position (called by the Thompson builder on preorder entry, with the
    /// path stack of ancestors seen so far). Fills `depth`, `parent`, and the binary-lifted
    /// `anc[k]` table; `pre`/`post` ticks are supplied by the caller since they number the whole
    /// tree, not just one node's subtree.
    pub fn place(&mut self, id: ExprId, parent: Option<ExprId>, pre_tick: u32) {
        self.parent[id] = parent;
        self.pre[id] = pre_tick;
        self.depth[id] = parent.map_or(0, |p| self.depth[p] + 1);
        self.anc[id][0] = parent;
        for k in 1..LIFT_LEVELS {
            self.anc[id][k] = self.anc[id][k - 1].and_then(|a| self.anc[a][k - 1]);
        }
    }

    pub fn finish(&mut self, id: ExprId, post_tick: u32) {
        self.post[id] = post_tick;
    }

    fn ancestor(&self, mut id: ExprId, mut steps: u32) -> Option<ExprId> {
        let mut k = 0;
        while steps > 0 {
            if steps & 1 == 1 {
                id = self.anc[id][k]?;
            }
            steps >>= 1;
            k += 1;
        }
        Some(id)
    }

    /// Lowest common ancestor of `a` and `b`, via binary lifting to equal depth followed by a
    /// simultaneous climb. `O(log depth)`.
    pub fn lca(&self, a: ExprId, b: ExprId) -> ExprId {
        let (mut a, mut b) = (a, b);
        if self.depth[a] < self.depth[b] {
            std::mem::swap(&mut a, &mut b);
        }
        let diff = self.depth[a] - self.depth[b];
        a = self.ancestor(a, diff).expect("depth bookkeeping is consistent with anc[]");
        if a == b {
            return a;
        }
        for k in (0..LIFT_LEVELS).rev() {
            if self.anc[a][k] != self.anc[b][k] {
                a = self.anc[a][k].expect("climbing below the LCA never runs past the root");
                b = self.anc[b][k].expect("climbing below the LCA never runs past the root");
            }
        }
        self.anc[a][0].expect("a != b implies both have a parent below their LCA")
    }

    /// The expression-closure `within(u)`, from a state's raw `assoc[u]` entries: sorts by
    /// preorder, then for each element walks ancestor pointers upward, stopping at the LCA with
    /// the previous element (or at the root, for the first element), so shared ancestor chains
    /// are only added once.
    pub fn expression_closure(&self, assoc_u: &[(ExprId, Tag)]) -> Vec<(ExprId, Tag)> {
        let mut sorted: Vec<(ExprId, Tag)> = assoc_u.to_vec();
        sorted.sort_by_key(|&(e, _)| self.pre[e]);
        let mut result: Vec<(ExprId, Tag)> = Vec::new();
        let mut prev: Option<ExprId> = None;
        for &(e, tag) in &sorted {
            let stop_at = prev.map(|p| self.lca(p, e));
            let mut cur = Some(e);
            while let Some(node) = cur {
                if Some(node) == stop_at {
                    break;
                }
                result.push((node, tag));
                cur = self.parent[node];
            }
            prev = Some(e);
        }
        result.sort_by_key(|&(e, _)| e);
        let mut merged: Vec<(ExprId, Tag)> = Vec::with_capacity(result.len());
        for (e, tag) in result {
            match merged.last_mut() {
                Some(last) if last.0 == e => last.1 |= tag,
                _ => merged.push((e, tag)),
            }
        }
        merged
    }
}
