//! C2: annotated finite-state automata.
//!
//! Wraps a bare `Fsa` with a per-state multimap `assoc: Vec<Vec<(T, Tag)>>` from expression-tree
//! keys to the tag under which that state belongs to the key's subtree (`start`, `inner`, or
//! `final`). `T` is left abstract here — the compiler crate instantiates it with its expression
//! arena's index type — so this crate stays free of any dependency on a concrete AST shape.
//!
//! Every method that restructures the underlying `Fsa` rebuilds `assoc` in lockstep via the
//! `relate` callbacks `Fsa`'s operations expose, so the two halves of an `AnnotatedFsa` can never
//! drift out of sync.

use itertools::Itertools;

use crate::fsa::{EdgeLabel, Fsa, StateId};
use crate::label::{Label, Tag};

fn merge_assoc<T: Ord + Copy>(mut entries: Vec<(T, Tag)>) -> Vec<(T, Tag)> {
    entries.sort_by_key(|&(k, _)| k);
    entries
        .into_iter()
        .coalesce(|(k1, t1), (k2, t2)| if k1 == k2 { Ok((k1, t1 | t2)) } else { Err(((k1, t1), (k2, t2))) })
        .collect()
}

#[derive(Clone, Debug)]
pub struct AnnotatedFsa<T> {
    pub fsa: Fsa,
    pub assoc: Vec<Vec<(T, Tag)>>,
    /// Whether `fsa` is currently epsilon-free and deterministic. Thompson gadgets and the
    /// structural combinators (`concat`, `union`, `star`, ...) all produce nondeterministic
    /// automata; `determinize` is the only way back to `true`.
    pub deterministic: bool,
}

impl<T: Ord + Copy> AnnotatedFsa<T> {
    // ---- leaf gadgets ----------------------------------------------------------------------

    /// The automaton accepting exactly the empty string.
    pub fn epsilon(expr: T) -> Self {
        let fsa = Fsa { start: 0, finals: vec![0], adj: vec![Vec::new()] };
        AnnotatedFsa { fsa, assoc: vec![vec![(expr, Tag::START | Tag::FINAL)]], deterministic: true }
    }

    /// A linear chain accepting exactly `bytes`.
    pub fn literal(bytes: &[u8], expr: T) -> Self {
        let n = bytes.len();
        let mut adj = vec![Vec::new(); n + 1];
        for (i, &b) in bytes.iter().enumerate() {
            adj[i].push((EdgeLabel::Range(b as Label, b as Label + 1), i + 1));
        }
        let fsa = Fsa { start: 0, finals: vec![n], adj };
        let mut assoc = vec![Vec::new(); n + 1];
        for (s, slot) in assoc.iter_mut().enumerate() {
            let tag = if s == 0 { Tag::START } else if s == n { Tag::FINAL } else { Tag::INNER };
            slot.push((expr, tag));
        }
        AnnotatedFsa { fsa, assoc, deterministic: true }
    }

    /// A single transition matching any symbol in `[0, alphabet_hi)`.
    pub fn dot(alphabet_hi: Label, expr: T) -> Self {
        let fsa = Fsa { start: 0, finals: vec![1], adj: vec![vec![(EdgeLabel::Range(0, alphabet_hi), 1)], Vec::new()] };
        AnnotatedFsa { fsa, assoc: vec![vec![(expr, Tag::START)], vec![(expr, Tag::FINAL)]], deterministic: true }
    }

    /// A single transition matching any symbol covered by `ranges`.
    pub fn bracket(ranges: &[(Label, Label)], expr: T) -> Self {
        let mut edges: Vec<(EdgeLabel, StateId)> = ranges.iter().map(|&(lo, hi)| (EdgeLabel::Range(lo, hi), 1)).collect();
        edges.sort();
        let fsa = Fsa { start: 0, finals: vec![1], adj: vec![edges, Vec::new()] };
        AnnotatedFsa { fsa, assoc: vec![vec![(expr, Tag::START)], vec![(expr, Tag::FINAL)]], deterministic: true }
    }

    /// A placeholder gadget for a `collapse` reference: a single transition on a reserved
    /// collapse label, later rewritten by the cross-definition linker into an epsilon edge into
    /// the referenced definition's automaton.
    pub fn collapse_placeholder(label: Label, expr: T) -> Self {
        let fsa =
            Fsa { start: 0, finals: vec![1], adj: vec![vec![(EdgeLabel::Range(label, label + 1), 1)], Vec::new()] };
        AnnotatedFsa { fsa, assoc: vec![vec![(expr, Tag::START)], vec![(expr, Tag::FINAL)]], deterministic: true }
    }

    /// A code-point-range gadget, expanded into UTF-8 byte paths with shared tail states.
    pub fn unicode_range(lo: u32, hi: u32, expr: T) -> Self {
        crate::unicode::utf8_range_nfa(lo, hi, expr)
    }

    /// Tags every current state of `self` with `expr` under `start`/`inner`/`final` as
    /// appropriate. A no-op when the expression carries no actions, is not `intact`, and is not a
    /// collapse reference target, since such nodes never need to be found again by `within(u)`.
    pub fn add_assoc(&mut self, expr: T, needs_tracking: bool) {
        if !needs_tracking {
            return;
        }
        for s in 0..self.fsa.n() {
            let tag = if s == self.fsa.start {
                Tag::START
            } else if self.fsa.is_final(s) {
                Tag::FINAL
            } else {
                Tag::INNER
            };
            self.assoc[s].push((expr, tag));
        }
        for entries in &mut self.assoc {
            let taken = std::mem::take(entries);
            *entries = merge_assoc(taken);
        }
    }

    // ---- structural combinators -------------------------------------------------------------

    /// Sequencing: epsilon-links every final state of `self` to `rhs`'s start, and adopts `rhs`'s
    /// finals as the result's only finals.
    pub fn concat(&mut self, rhs: AnnotatedFsa<T>) {
        let shift = self.fsa.n();
        for &f in &self.fsa.finals.clone() {
            self.fsa.adj[f].push((EdgeLabel::Epsilon, shift + rhs.fsa.start));
            self.fsa.adj[f].sort();
        }
        for mut row in rhs.fsa.adj {
            for edge in &mut row {
                edge.1 += shift;
            }
            self.fsa.adj.push(row);
        }
        self.fsa.finals = rhs.fsa.finals.into_iter().map(|f| f + shift).collect();
        self.assoc.extend(rhs.assoc);
        self.deterministic = false;
    }

    /// Alternation: introduces one new source state epsilon-branching into both operands' starts.
    pub fn union(mut self, rhs: AnnotatedFsa<T>, expr: T) -> AnnotatedFsa<T> {
        let shift = self.fsa.n();
        let old_start = self.fsa.start;
        let mut rhs_finals: Vec<StateId> = rhs.fsa.finals.iter().map(|&f| f + shift).collect();
        for mut row in rhs.fsa.adj {
            for edge in &mut row {
                edge.1 += shift;
            }
            self.fsa.adj.push(row);
        }
        let src = self.fsa.n();
        self.fsa.adj.push(vec![(EdgeLabel::Epsilon, old_start), (EdgeLabel::Epsilon, shift + rhs.fsa.start)]);
        self.fsa.adj[src].sort();
        self.fsa.finals.append(&mut rhs_finals);
        self.fsa.finals.sort_unstable();
        self.fsa.start = src;
        self.assoc.extend(rhs.assoc);
        self.assoc.push(vec![(expr, Tag::START)]);
        self.deterministic = false;
        self
    }

    /// Kleene star: new source/sink pair, with the source also reachable from (and reaching) the
    /// sink directly so zero repetitions are accepted, and the old finals loop back to the source.
    pub fn star(mut self, expr: T) -> AnnotatedFsa<T> {
        let old_start = self.fsa.start;
        let src = self.fsa.n();
        let sink = src + 1;
        self.fsa.adj.push(vec![(EdgeLabel::Epsilon, old_start), (EdgeLabel::Epsilon, sink)]);
        self.fsa.adj.push(Vec::new());
        self.fsa.adj[src].sort();
        for &f in &self.fsa.finals.clone() {
            self.fsa.adj[f].push((EdgeLabel::Epsilon, old_start));
            self.fsa.adj[f].push((EdgeLabel::Epsilon, sink));
            self.fsa.adj[f].sort();
        }
        self.fsa.start = src;
        self.fsa.finals = vec![sink];
        self.assoc.push(vec![(expr, Tag::START)]);
        self.assoc.push(vec![(expr, Tag::FINAL)]);
        self.deterministic = false;
        self
    }

    /// One-or-more repetition: loops the old finals back to the old start, without introducing
    /// any new states (so, unlike `star`/`question`, this leaves `assoc` untouched).
    pub fn plus(mut self) -> AnnotatedFsa<T> {
        let old_start = self.fsa.start;
        for &f in &self.fsa.finals.clone() {
            self.fsa.adj[f].push((EdgeLabel::Epsilon, old_start));
            self.fsa.adj[f].sort();
        }
        self.deterministic = false;
        self
    }

    /// Zero-or-one: new source bypasses straight to a new sink (zero occurrences), while the old
    /// finals remain accepting on their own (one occurrence).
    pub fn question(mut self, expr: T) -> AnnotatedFsa<T> {
        let old_start = self.fsa.start;
        let src = self.fsa.n();
        let sink = src + 1;
        self.fsa.adj.push(vec![(EdgeLabel::Epsilon, old_start), (EdgeLabel::Epsilon, sink)]);
        self.fsa.adj.push(Vec::new());
        self.fsa.adj[src].sort();
        self.fsa.finals.push(sink);
        self.fsa.finals.sort_unstable();
        self.fsa.start = src;
        self.assoc.push(vec![(expr, Tag::START)]);
        self.assoc.push(vec![(expr, Tag::FINAL)]);
        self.deterministic = false;
        self
    }

    /// Bounded repetition `{low, high}` (`high = None` meaning unbounded), built by concatenating
    /// `low` mandatory copies of `base`, followed either by `high - low` optional copies or, when
    /// unbounded, a single starred copy. Callers are expected to have already validated
    /// `low <= high` before reaching here; invalid bounds are a contract violation, not a runtime
    /// error at this layer.
    pub fn repeat(base: AnnotatedFsa<T>, low: u32, high: Option<u32>, expr: T) -> AnnotatedFsa<T>
    where
        AnnotatedFsa<T>: Clone,
    {
        assert!(high.map_or(true, |h| low <= h), "repeat bounds must satisfy low <= high");
        let mut parts: Vec<AnnotatedFsa<T>> = Vec::new();
        for _ in 0..low {
            parts.push(base.clone());
        }
        match high {
            Some(h) => {
                for _ in low..h {
                    parts.push(base.clone().question(expr));
                }
            }
            None => parts.push(base.clone().star(expr)),
        }
        let mut parts = parts.into_iter();
        let mut acc = match parts.next() {
            Some(first) => first,
            None => return AnnotatedFsa::epsilon(expr),
        };
        for part in parts {
            acc.concat(part);
        }
        acc
    }

    // ---- operations that require determinism ------------------------------------------------

    pub fn determinize(&mut self) {
        if self.deterministic {
            return;
        }
        let assoc = std::mem::take(&mut self.assoc);
        let mut new_assoc = Vec::new();
        let new_fsa = self.fsa.determinize(|_, members| {
            let merged = members.iter().flat_map(|&m| assoc[m].iter().copied()).collect();
            new_assoc.push(merge_assoc(merged));
        });
        self.fsa = new_fsa;
        self.assoc = new_assoc;
        self.deterministic = true;
    }

    pub fn minimize(&mut self) {
        assert!(self.deterministic, "minimize requires a deterministic automaton; call determinize first");
        let assoc = std::mem::take(&mut self.assoc);
        let mut new_assoc = Vec::new();
        let new_fsa = self.fsa.distinguish(|members| {
            let merged = members.iter().flat_map(|&m| assoc[m].iter().copied()).collect();
            new_assoc.push(merge_assoc(merged));
        });
        self.fsa = new_fsa;
        self.assoc = new_assoc;
    }

    /// Keeps only forward- and backward-reachable states, discarding their `assoc` entries along
    /// with them.
    pub fn trim(&mut self) {
        let assoc = std::mem::take(&mut self.assoc);
        let mut stage1 = Vec::new();
        let fsa1 = self.fsa.accessible(|old| stage1.push(assoc[old].clone()));
        let mut stage2 = Vec::new();
        let fsa2 = fsa1.co_accessible(|old| stage2.push(stage1[old].clone()));
        self.fsa = fsa2;
        self.assoc = stage2;
    }

    /// Drops every edge labeled within `[action_base, collapse_base)` — the anti-merge labels the
    /// Thompson builder anchors onto action-bearing states to keep minimization from folding them
    /// into bisimilar neighbors. Must run after minimization, never before: stripping
    /// early would let exactly the merges these labels exist to prevent happen.
    pub fn strip_action_edges(&mut self, action_base: Label, collapse_base: Label) {
        for row in &mut self.fsa.adj {
            row.retain(|&(label, _)| match label {
                EdgeLabel::Range(lo, _) => !(lo >= action_base && lo < collapse_base),
                EdgeLabel::Epsilon => true,
            });
        }
    }

    /// Complement over `[0, alphabet_hi)`. Per the source automaton's structure, the inverted
    /// states no longer correspond to any single expression subtree, so `assoc` is reset to
    /// empty for every resulting state (including the synthetic sink the complement introduces).
    pub fn complement(&mut self, alphabet_hi: Label) {
        if !self.deterministic {
            self.determinize();
        }
        self.fsa = self.fsa.complement(alphabet_hi);
        self.assoc = vec![Vec::new(); self.fsa.n()];
        self.deterministic = true;
    }

    /// Intersection. Associated expressions are carried over from both operands into each
    /// surviving product state, then the result is trimmed since not every reachable pair lies
    /// on an accepting path.
    pub fn intersect(&mut self, rhs: &mut AnnotatedFsa<T>) {
        if !self.deterministic {
            self.determinize();
        }
        if !rhs.deterministic {
            rhs.determinize();
        }
        let a_assoc = std::mem::take(&mut self.assoc);
        let b_assoc = rhs.assoc.clone();
        let mut new_assoc = Vec::new();
        let new_fsa = self.fsa.intersect(&rhs.fsa, |_, (u, v)| {
            let mut merged = a_assoc[u].clone();
            merged.extend(b_assoc[v].iter().copied());
            new_assoc.push(merge_assoc(merged));
        });
        self.fsa = new_fsa;
        self.assoc = new_assoc;
        self.deterministic = true;
        self.trim();
    }

    /// Set difference (`self \ rhs`). Only `self`'s associations survive, since the result's
    /// language is defined purely in terms of `self`'s acceptance.
    pub fn difference(&mut self, rhs: &mut AnnotatedFsa<T>, alphabet_hi: Label) {
        if !self.deterministic {
            self.determinize();
        }
        if !rhs.deterministic {
            rhs.determinize();
        }
        let a_assoc = std::mem::take(&mut self.assoc);
        let mut new_assoc = Vec::new();
        let new_fsa = self.fsa.difference(&rhs.fsa, alphabet_hi, |_, (u, _v)| {
            new_assoc.push(a_assoc[u].clone());
        });
        self.fsa = new_fsa;
        self.assoc = new_assoc;
        self.deterministic = true;
        self.trim();
    }

    /// Rewrites the automaton to additionally accept any substring of a full parse, except
    /// through regions marked `intact` by the owning definition. `is_blocked` reports, for a
    /// state's current associations, whether that state is strictly interior to an intact
    /// definition (and so may not serve as a substring boundary). The original start and original
    /// finals are always eligible regardless of `is_blocked`.
    pub fn substring_grammar(&mut self, expr: T, is_blocked: impl Fn(&[(T, Tag)]) -> bool) {
        let n = self.fsa.n();
        let mut start_ok = vec![false; n];
        let mut end_ok = vec![false; n];
        for s in 0..n {
            let blocked = is_blocked(&self.assoc[s]);
            start_ok[s] = s == self.fsa.start || self.fsa.is_final(s) || !blocked;
            end_ok[s] = self.fsa.is_final(s) || !blocked;
        }
        let src = n;
        let sink = n + 1;
        self.fsa.adj.push(Vec::new());
        self.fsa.adj.push(Vec::new());
        for s in 0..n {
            if start_ok[s] {
                self.fsa.adj[src].push((EdgeLabel::Epsilon, s));
            }
            if end_ok[s] {
                self.fsa.adj[s].push((EdgeLabel::Epsilon, sink));
                self.fsa.adj[s].sort();
            }
        }
        self.fsa.adj[src].sort();
        self.fsa.start = src;
        self.fsa.finals = vec![sink];
        self.assoc.push(vec![(expr, Tag::START)]);
        self.assoc.push(vec![(expr, Tag::FINAL)]);
        self.deterministic = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(fsa: &AnnotatedFsa<u32>, input: &[i64]) -> bool {
        let mut current = fsa.fsa.epsilon_closure(&[fsa.fsa.start]);
        for &c in input {
            let mut next = Vec::new();
            for &u in &current {
                for &(label, v) in &fsa.fsa.adj[u] {
                    if let EdgeLabel::Range(lo, hi) = label {
                        if lo <= c && c < hi {
                            next.push(v);
                        }
                    }
                }
            }
            current = fsa.fsa.epsilon_closure(&next);
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|&u| fsa.fsa.is_final(u))
    }

    #[test]
    fn literal_tags_start_inner_final() {
        let fsa = AnnotatedFsa::literal(b"ab", 0u32);
        assert_eq!(fsa.assoc[0], vec![(0, Tag::START)]);
        assert_eq!(fsa.assoc[1], vec![(0, Tag::INNER)]);
        assert_eq!(fsa.assoc[2], vec![(0, Tag::FINAL)]);
    }

    #[test]
    fn concat_accepts_sequenced_literals() {
        let mut lhs = AnnotatedFsa::literal(b"a", 0u32);
        let rhs = AnnotatedFsa::literal(b"b", 1u32);
        lhs.concat(rhs);
        assert!(accepts(&lhs, &[b'a' as i64, b'b' as i64]));
        assert!(!accepts(&lhs, &[b'a' as i64]));
        assert_eq!(lhs.assoc.len(), lhs.fsa.n());
    }

    #[test]
    fn union_accepts_either_branch() {
        let lhs = AnnotatedFsa::literal(b"a", 0u32);
        let rhs = AnnotatedFsa::literal(b"b", 1u32);
        let mut alt = lhs.union(rhs, 2u32);
        alt.determinize();
        assert!(accepts(&alt, &[b'a' as i64]));
        assert!(accepts(&alt, &[b'b' as i64]));
        assert!(!accepts(&alt, &[b'c' as i64]));
    }

    #[test]
    fn star_accepts_zero_or_more() {
        let base = AnnotatedFsa::literal(b"a", 0u32);
        let mut star = base.star(1u32);
        star.determinize();
        assert!(accepts(&star, &[]));
        assert!(accepts(&star, &[b'a' as i64]));
        assert!(accepts(&star, &[b'a' as i64, b'a' as i64, b'a' as i64]));
        assert!(!accepts(&star, &[b'b' as i64]));
    }

    #[test]
    fn question_accepts_zero_or_one_only() {
        let base = AnnotatedFsa::literal(b"a", 0u32);
        let mut q = base.question(1u32);
        q.determinize();
        assert!(accepts(&q, &[]));
        assert!(accepts(&q, &[b'a' as i64]));
        assert!(!accepts(&q, &[b'a' as i64, b'a' as i64]));
    }

    #[test]
    fn repeat_bounds_mandatory_and_optional_copies() {
        let base = AnnotatedFsa::literal(b"a", 0u32);
        let mut r = AnnotatedFsa::repeat(base, 2, Some(3), 1u32);
        r.determinize();
        assert!(!accepts(&r, &[b'a' as i64]));
        assert!(accepts(&r, &[b'a' as i64, b'a' as i64]));
        assert!(accepts(&r, &[b'a' as i64, b'a' as i64, b'a' as i64]));
        assert!(!accepts(&r, &[b'a' as i64, b'a' as i64, b'a' as i64, b'a' as i64]));
    }

    #[test]
    fn intersect_keeps_common_language_and_merges_assoc() {
        let mut lhs = AnnotatedFsa::literal(b"a", 0u32);
        let mut rhs = AnnotatedFsa::bracket(&[(b'a' as Label, b'z' as Label + 1)], 1u32);
        lhs.intersect(&mut rhs);
        assert!(accepts(&lhs, &[b'a' as i64]));
        assert!(!accepts(&lhs, &[b'b' as i64]));
        assert!(lhs.assoc[lhs.fsa.start].iter().any(|&(e, _)| e == 0));
        assert!(lhs.assoc[lhs.fsa.start].iter().any(|&(e, _)| e == 1));
    }

    #[test]
    fn difference_excludes_rhs_language() {
        let mut lhs = AnnotatedFsa::bracket(&[(b'a' as Label, b'z' as Label + 1)], 0u32);
        let mut rhs = AnnotatedFsa::literal(b"a", 1u32);
        lhs.difference(&mut rhs, 256);
        assert!(!accepts(&lhs, &[b'a' as i64]));
        assert!(accepts(&lhs, &[b'b' as i64]));
    }

    #[test]
    fn complement_resets_assoc() {
        let mut fsa = AnnotatedFsa::literal(b"a", 0u32);
        fsa.complement(256);
        assert!(fsa.assoc.iter().all(|entries| entries.is_empty()));
    }

    #[test]
    fn substring_grammar_permits_interior_cuts_unless_blocked() {
        let mut fsa = AnnotatedFsa::literal(b"abc", 0u32);
        fsa.add_assoc(0u32, true);
        fsa.substring_grammar(1u32, |_| false);
        fsa.determinize();
        assert!(accepts(&fsa, &[b'b' as i64]));
        assert!(accepts(&fsa, &[b'a' as i64, b'b' as i64]));
        assert!(accepts(&fsa, &[b'a' as i64, b'b' as i64, b'c' as i64]));
    }

    #[test]
    fn substring_grammar_blocks_interior_cuts_when_intact() {
        let mut fsa = AnnotatedFsa::literal(b"abc", 0u32);
        fsa.add_assoc(0u32, true);
        fsa.substring_grammar(1u32, |_| true);
        fsa.determinize();
        assert!(!accepts(&fsa, &[b'b' as i64]));
        assert!(accepts(&fsa, &[b'a' as i64, b'b' as i64, b'c' as i64]));
    }
}
