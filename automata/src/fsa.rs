//! C1: raw finite-state-automaton primitives.
//!
//! An `Fsa` is a bare epsilon-NFA (or DFA, nothing here distinguishes the two structurally):
//! one start state, a sorted set of final states, and per-state adjacency sorted so that any
//! epsilon edges sort first (`EdgeLabel::Epsilon < EdgeLabel::Range(..)` by declaration order),
//! which lets `epsilon_closure` stop scanning a state's edge list as soon as it sees the first
//! non-epsilon entry.
//!
//! Every structural operation that creates new states (`product`, `determinize`, `distinguish`,
//! `accessible`, `co_accessible`) takes a `relate` callback invoked once per surviving/new state,
//! in ascending order of the state's id in the *result* automaton. The annotated layer (`anno.rs`)
//! uses these callbacks to rebuild its per-state `assoc` multimap in lockstep, without this module
//! having to know anything about expression trees.

use std::collections::{BTreeSet, HashMap};

use crate::label::Label;

pub type StateId = usize;

/// One outgoing edge label: either an epsilon step, or an inclusive-low/exclusive-high symbol
/// range `[lo, hi)`. Declared in this order so that `EdgeLabel::Epsilon` sorts before every
/// `EdgeLabel::Range`, matching the "epsilon edges come first" adjacency invariant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeLabel {
    Epsilon,
    Range(Label, Label),
}

impl EdgeLabel {
    pub fn range(self) -> Option<(Label, Label)> {
        match self {
            EdgeLabel::Range(lo, hi) => Some((lo, hi)),
            EdgeLabel::Epsilon => None,
        }
    }
}

/// A bare automaton: states are dense indices `0..n`, `adj[u]` lists `u`'s outgoing edges sorted
/// by `EdgeLabel`, and `finals` is a sorted, deduplicated list of accepting states.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fsa {
    pub start: StateId,
    pub finals: Vec<StateId>,
    pub adj: Vec<Vec<(EdgeLabel, StateId)>>,
}

impl Fsa {
    pub fn n(&self) -> usize {
        self.adj.len()
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.finals.binary_search(&state).is_ok()
    }

    /// Expands `src` by every epsilon-reachable successor. The result is sorted and deduplicated;
    /// calling this again on its own output is a no-op (idempotent).
    pub fn epsilon_closure(&self, src: &[StateId]) -> Vec<StateId> {
        let mut visited: BTreeSet<StateId> = src.iter().copied().collect();
        let mut queue: Vec<StateId> = src.to_vec();
        let mut i = 0;
        while i < queue.len() {
            let u = queue[i];
            i += 1;
            for &(label, v) in &self.adj[u] {
                if label != EdgeLabel::Epsilon {
                    break;
                }
                if visited.insert(v) {
                    queue.push(v);
                }
            }
        }
        visited.into_iter().collect()
    }

    /// Routes every interval not already covered by an outgoing edge to a freshly appended sink
    /// state, so every state has an outgoing edge covering the full `[0, alphabet_hi)` range.
    /// Requires a deterministic, epsilon-free input.
    pub fn totalize(&self, alphabet_hi: Label) -> Fsa {
        let sink = self.n();
        let mut adj = self.adj.clone();
        for row in adj.iter_mut().take(sink) {
            let mut out = Vec::with_capacity(row.len() + 1);
            let mut cursor = 0;
            for &(label, v) in row.iter() {
                if let EdgeLabel::Range(lo, hi) = label {
                    if cursor < lo {
                        out.push((EdgeLabel::Range(cursor, lo), sink));
                    }
                    out.push((label, v));
                    cursor = hi;
                }
            }
            if cursor < alphabet_hi {
                out.push((EdgeLabel::Range(cursor, alphabet_hi), sink));
            }
            *row = out;
        }
        adj.push(vec![(EdgeLabel::Range(0, alphabet_hi), sink)]);
        Fsa { start: self.start, finals: self.finals.clone(), adj }
    }

    /// Complement over `[0, alphabet_hi)`: totalizes, then inverts acceptance. The synthetic sink
    /// state becomes accepting, as it represents "ran out of matching input."
    pub fn complement(&self, alphabet_hi: Label) -> Fsa {
        let total = self.totalize(alphabet_hi);
        let finals = (0..total.n()).filter(|s| !self.is_final(*s) || *s >= self.n()).collect();
        Fsa { start: total.start, finals, adj: total.adj }
    }

    /// Synchronized product construction: walks both operands' sorted edge lists in tandem,
    /// emitting one product transition per overlapping range. `relate(id, (u, v))` fires once
    /// per newly discovered pair, in ascending `id` order. Requires deterministic, epsilon-free
    /// operands.
    pub fn product<F: FnMut(StateId, (StateId, StateId))>(&self, rhs: &Fsa, mut relate: F) -> Fsa {
        let mut nodes = vec![(self.start, rhs.start)];
        let mut index = HashMap::new();
        index.insert(nodes[0], 0usize);
        relate(0, nodes[0]);
        let mut adj = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            let (u, v) = nodes[i];
            let mut out = Vec::new();
            let au = &self.adj[u];
            let av = &rhs.adj[v];
            let (mut ai, mut bi) = (0usize, 0usize);
            while ai < au.len() && bi < av.len() {
                let (la, ta) = au[ai];
                let (lb, tb) = av[bi];
                match (la, lb) {
                    (EdgeLabel::Range(loa, hia), EdgeLabel::Range(lob, hib)) => {
                        let lo = loa.max(lob);
                        let hi = hia.min(hib);
                        if lo < hi {
                            let key = (ta, tb);
                            let id = *index.entry(key).or_insert_with(|| nodes.len());
                            if id == nodes.len() {
                                nodes.push(key);
                                relate(id, key);
                            }
                            out.push((EdgeLabel::Range(lo, hi), id));
                        }
                        if hia <= hib {
                            ai += 1;
                        } else {
                            bi += 1;
                        }
                    }
                    (EdgeLabel::Epsilon, _) => ai += 1,
                    (_, EdgeLabel::Epsilon) => bi += 1,
                }
            }
            adj.push(out);
            i += 1;
        }
        Fsa { start: 0, finals: Vec::new(), adj }
    }

    /// Intersection via product, accepting pairs where both operands accept.
    pub fn intersect<F: FnMut(StateId, (StateId, StateId))>(&self, rhs: &Fsa, mut relate: F) -> Fsa {
        let mut pairs = Vec::new();
        let mut result = self.product(rhs, |id, pair| {
            pairs.push(pair);
            relate(id, pair);
        });
        for (i, &(u, v)) in pairs.iter().enumerate() {
            if self.is_final(u) && rhs.is_final(v) {
                result.finals.push(i);
            }
        }
        result
    }

    /// Difference via product against a totalized `rhs`: the right operand's missing intervals
    /// are routed to a synthetic sink, so "rhs doesn't match here" is itself a reachable, rejecting
    /// product state.
    pub fn difference<F: FnMut(StateId, (StateId, StateId))>(
        &self,
        rhs: &Fsa,
        alphabet_hi: Label,
        mut relate: F,
    ) -> Fsa {
        let totalized = rhs.totalize(alphabet_hi);
        let mut pairs = Vec::new();
        let mut result = self.product(&totalized, |id, pair| {
            pairs.push(pair);
            relate(id, pair);
        });
        for (i, &(u, v)) in pairs.iter().enumerate() {
            if self.is_final(u) && !totalized.is_final(v) {
                result.finals.push(i);
            }
        }
        result
    }

    /// Subset construction. `relate(id, members)` fires once per newly discovered subset, with
    /// `members` sorted, in ascending `id` order. Tie-breaks on overlapping interval boundaries
    /// favor the numerically smallest endpoint first.
    pub fn determinize<F: FnMut(StateId, &[StateId])>(&self, mut relate: F) -> Fsa {
        let start_set = self.epsilon_closure(&[self.start]);
        let mut sets: Vec<Vec<StateId>> = vec![start_set.clone()];
        let mut index: HashMap<Vec<StateId>, StateId> = HashMap::new();
        index.insert(start_set.clone(), 0);
        relate(0, &start_set);
        let mut adj = Vec::new();
        let mut i = 0;
        while i < sets.len() {
            let members = sets[i].clone();
            let mut events: BTreeSet<Label> = BTreeSet::new();
            for &m in &members {
                for &(label, _) in &self.adj[m] {
                    if let EdgeLabel::Range(lo, hi) = label {
                        events.insert(lo);
                        events.insert(hi);
                    }
                }
            }
            let events: Vec<Label> = events.into_iter().collect();
            let mut out = Vec::new();
            for w in events.windows(2) {
                let (lo, hi) = (w[0], w[1]);
                if lo >= hi {
                    continue;
                }
                let mut targets = Vec::new();
                for &m in &members {
                    for &(label, v) in &self.adj[m] {
                        if let EdgeLabel::Range(l0, h0) = label {
                            if l0 <= lo && hi <= h0 {
                                targets.push(v);
                            }
                        }
                    }
                }
                if targets.is_empty() {
                    continue;
                }
                let closure = self.epsilon_closure(&targets);
                let id = match index.get(&closure) {
                    Some(&id) => id,
                    None => {
                        let id = sets.len();
                        index.insert(closure.clone(), id);
                        sets.push(closure.clone());
                        relate(id, &closure);
                        id
                    }
                };
                out.push((EdgeLabel::Range(lo, hi), id));
            }
            adj.push(out);
            i += 1;
        }
        let finals = (0..sets.len()).filter(|&i| sets[i].iter().any(|&s| self.is_final(s))).collect();
        Fsa { start: 0, finals, adj }
    }

    fn elementary_endpoints(&self) -> Vec<Label> {
        let mut points = BTreeSet::new();
        for row in &self.adj {
            for &(label, _) in row {
                if let EdgeLabel::Range(lo, hi) = label {
                    points.insert(lo);
                    points.insert(hi);
                }
            }
        }
        points.into_iter().collect()
    }

    /// For each state, and each elementary sub-interval carved out of the union of all interval
    /// endpoints in the automaton, the (at most one) target state reached on that sub-interval.
    fn elementary_matrix(&self, points: &[Label]) -> Vec<Vec<Option<StateId>>> {
        let n = self.n();
        let k = points.len().saturating_sub(1);
        let mut mat = vec![vec![None; k]; n];
        for (u, row) in self.adj.iter().enumerate() {
            for &(label, v) in row {
                if let EdgeLabel::Range(lo, hi) = label {
                    let start = points.binary_search(&lo).unwrap();
                    let end = points.binary_search(&hi).unwrap();
                    for slot in mat[u].iter_mut().take(end).skip(start) {
                        *slot = Some(v);
                    }
                }
            }
        }
        mat
    }

    /// Hopcroft-style partition refinement minimization. Reduces the interval alphabet to
    /// elementary sub-intervals first (the union of all endpoints in the automaton), runs textbook
    /// worklist refinement over that finite symbol set, then re-coalesces consecutive elementary
    /// intervals that a block routes to the same successor block back into a single edge.
    /// `relate(members)` fires once per surviving block, in ascending order of the block's minimum
    /// member id. Requires a deterministic input.
    pub fn distinguish<F: FnMut(&[StateId])>(&self, mut relate: F) -> Fsa {
        let n = self.n();
        let points = self.elementary_endpoints();
        let k = points.len().saturating_sub(1);
        let mat = self.elementary_matrix(&points);

        let finals_set: BTreeSet<StateId> = self.finals.iter().copied().collect();
        let non_finals: BTreeSet<StateId> = (0..n).filter(|s| !finals_set.contains(s)).collect();
        let mut partition: Vec<BTreeSet<StateId>> = Vec::new();
        if !finals_set.is_empty() {
            partition.push(finals_set.clone());
        }
        if !non_finals.is_empty() {
            partition.push(non_finals);
        }

        use std::collections::VecDeque;
        let mut worklist: VecDeque<(usize, usize)> = VecDeque::new();
        if partition.len() == 2 {
            let small = if partition[0].len() <= partition[1].len() { 0 } else { 1 };
            for sym in 0..k {
                worklist.push_back((sym, small));
            }
        } else {
            for sym in 0..k {
                worklist.push_back((sym, 0));
            }
        }

        while let Some((sym, b)) = worklist.pop_front() {
            if b >= partition.len() {
                continue;
            }
            let target_states = partition[b].clone();
            let x: BTreeSet<StateId> =
                (0..n).filter(|&u| mat[u][sym].map_or(false, |t| target_states.contains(&t))).collect();
            if x.is_empty() {
                continue;
            }
            let mut touched = Vec::new();
            for (bi, blk) in partition.iter().enumerate() {
                let inter_len = blk.intersection(&x).count();
                if inter_len > 0 && inter_len < blk.len() {
                    touched.push(bi);
                }
            }
            for bi in touched {
                let y = partition[bi].clone();
                let inter: BTreeSet<StateId> = y.intersection(&x).copied().collect();
                let diff: BTreeSet<StateId> = y.difference(&x).copied().collect();
                partition[bi] = diff.clone();
                let new_id = partition.len();
                partition.push(inter.clone());
                let smaller = if inter.len() <= diff.len() { new_id } else { bi };
                for sym2 in 0..k {
                    worklist.push_back((sym2, smaller));
                }
            }
        }

        let mut final_blocks: Vec<Vec<StateId>> =
            partition.into_iter().filter(|b| !b.is_empty()).map(|b| b.into_iter().collect()).collect();
        final_blocks.sort_by_key(|b| b[0]);
        let mut id_of = vec![0usize; n];
        for (id, blk) in final_blocks.iter().enumerate() {
            for &s in blk {
                id_of[s] = id;
            }
        }
        for blk in &final_blocks {
            relate(blk);
        }

        let mut adj = Vec::with_capacity(final_blocks.len());
        for blk in &final_blocks {
            let rep = blk[0];
            let mut out = Vec::new();
            let mut cur: Option<usize> = None;
            let mut lo = *points.first().unwrap_or(&0);
            for (sym, &endpoint) in points.iter().skip(1).enumerate() {
                let target = mat[rep][sym].map(|t| id_of[t]);
                if target != cur {
                    if let Some(t) = cur {
                        out.push((EdgeLabel::Range(lo, points[sym]), t));
                    }
                    cur = target;
                    lo = points[sym];
                }
                let _ = endpoint;
            }
            if let (Some(t), Some(&hi)) = (cur, points.last()) {
                out.push((EdgeLabel::Range(lo, hi), t));
            }
            adj.push(out);
        }
        let start = id_of[self.start];
        let finals: Vec<StateId> = (0..final_blocks.len()).filter(|&id| finals_set.contains(&final_blocks[id][0])).collect();
        Fsa { start, finals, adj }
    }

    /// Keeps only states reachable forward from `start`. `relate(old_id)` fires once per
    /// surviving state, in ascending order of its *new* id.
    pub fn accessible<F: FnMut(StateId)>(&self, mut relate: F) -> Fsa {
        let n = self.n();
        let mut visited = vec![false; n];
        let mut order = Vec::new();
        let mut stack = vec![self.start];
        visited[self.start] = true;
        while let Some(u) = stack.pop() {
            order.push(u);
            for &(_, v) in &self.adj[u] {
                if !visited[v] {
                    visited[v] = true;
                    stack.push(v);
                }
            }
        }
        order.sort_unstable();
        let mut new_id = vec![usize::MAX; n];
        for (i, &old) in order.iter().enumerate() {
            new_id[old] = i;
            relate(old);
        }
        let mut adj = vec![Vec::new(); order.len()];
        for (i, &old) in order.iter().enumerate() {
            for &(label, v) in &self.adj[old] {
                if visited[v] {
                    adj[i].push((label, new_id[v]));
                }
            }
        }
        let mut finals: Vec<StateId> = self.finals.iter().filter(|&&f| visited[f]).map(|&f| new_id[f]).collect();
        finals.sort_unstable();
        Fsa { start: new_id[self.start], finals, adj }
    }

    /// Keeps only states reachable backward from some final state. `relate(old_id)` fires once
    /// per surviving state, in ascending order of its *new* id.
    pub fn co_accessible<F: FnMut(StateId)>(&self, mut relate: F) -> Fsa {
        let n = self.n();
        let mut radj = vec![Vec::new(); n];
        for (u, row) in self.adj.iter().enumerate() {
            for &(label, v) in row {
                radj[v].push((label, u));
            }
        }
        let mut visited = vec![false; n];
        let mut stack: Vec<StateId> = self.finals.clone();
        for &f in &self.finals {
            visited[f] = true;
        }
        while let Some(u) = stack.pop() {
            for &(_, v) in &radj[u] {
                if !visited[v] {
                    visited[v] = true;
                    stack.push(v);
                }
            }
        }
        let order: Vec<StateId> = (0..n).filter(|&s| visited[s]).collect();
        let mut new_id = vec![usize::MAX; n];
        for (i, &old) in order.iter().enumerate() {
            new_id[old] = i;
            relate(old);
        }
        let mut adj = vec![Vec::new(); order.len()];
        for (i, &old) in order.iter().enumerate() {
            for &(label, v) in &self.adj[old] {
                if visited[v] {
                    adj[i].push((label, new_id[v]));
                }
            }
        }
        let mut finals: Vec<StateId> = self.finals.iter().filter(|&&f| visited[f]).map(|&f| new_id[f]).collect();
        finals.sort_unstable();
        let start = if visited[self.start] { new_id[self.start] } else { 0 };
        Fsa { start, finals, adj }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(fsa: &Fsa, input: &[i64]) -> bool {
        let mut current = fsa.epsilon_closure(&[fsa.start]);
        for &c in input {
            let mut next = Vec::new();
            for &u in &current {
                for &(label, v) in &fsa.adj[u] {
                    if let EdgeLabel::Range(lo, hi) = label {
                        if lo <= c && c < hi {
                            next.push(v);
                        }
                    }
                }
            }
            current = fsa.epsilon_closure(&next);
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|&u| fsa.is_final(u))
    }

    fn literal(bytes: &[u8]) -> Fsa {
        let n = bytes.len();
        let mut adj = vec![Vec::new(); n + 1];
        for (i, &b) in bytes.iter().enumerate() {
            adj[i].push((EdgeLabel::Range(b as Label, b as Label + 1), i + 1));
        }
        Fsa { start: 0, finals: vec![n], adj }
    }

    #[test]
    fn epsilon_closure_stops_at_first_non_epsilon() {
        let fsa = Fsa {
            start: 0,
            finals: vec![2],
            adj: vec![vec![(EdgeLabel::Epsilon, 1), (EdgeLabel::Range(0, 1), 2)], vec![], vec![]],
        };
        assert_eq!(fsa.epsilon_closure(&[0]), vec![0, 1]);
    }

    #[test]
    fn totalize_covers_whole_alphabet() {
        let fsa = literal(b"a");
        let total = fsa.totalize(256);
        for row in &total.adj {
            let mut lo = 0;
            for &(label, _) in row {
                if let EdgeLabel::Range(a, b) = label {
                    assert_eq!(a, lo);
                    lo = b;
                }
            }
            assert_eq!(lo, 256);
        }
    }

    #[test]
    fn complement_inverts_acceptance() {
        let fsa = literal(b"a");
        let comp = fsa.complement(256);
        assert!(accepts(&fsa, &[b'a' as i64]));
        assert!(!accepts(&comp, &[b'a' as i64]));
        assert!(!accepts(&fsa, &[b'b' as i64]));
        assert!(accepts(&comp, &[b'b' as i64]));
        assert!(!accepts(&fsa, &[]));
        assert!(accepts(&comp, &[]));
    }

    #[test]
    fn determinize_preserves_language() {
        // (a|a) -- two parallel branches recognizing the same literal, forcing a nontrivial
        // subset construction merge.
        let branch = literal(b"a");
        let mut adj = vec![vec![(EdgeLabel::Epsilon, 1), (EdgeLabel::Epsilon, 3)]];
        for mut row in branch.adj.clone() {
            for e in &mut row {
                e.1 += 1;
            }
            adj.push(row);
        }
        for mut row in branch.adj {
            for e in &mut row {
                e.1 += 3;
            }
            adj.push(row);
        }
        let fsa = Fsa { start: 0, finals: vec![2, 4], adj };
        let mut seen = Vec::new();
        let det = fsa.determinize(|id, members| seen.push((id, members.to_vec())));
        assert!(accepts(&det, &[b'a' as i64]));
        assert!(!accepts(&det, &[b'b' as i64]));
        assert_eq!(seen.len(), det.n());
    }

    #[test]
    fn distinguish_merges_equivalent_states() {
        // Two disjoint copies of "a", unioned: minimization should fold them to 2 states.
        let a1 = literal(b"a");
        let mut a2 = literal(b"a");
        for row in &mut a2.adj {
            for e in row {
                e.1 += 2;
            }
        }
        let mut adj = vec![vec![(EdgeLabel::Epsilon, 1), (EdgeLabel::Epsilon, 3)]];
        adj.extend(a1.adj);
        adj.extend(a2.adj);
        let fsa = Fsa { start: 0, finals: vec![2, 4], adj };
        let det = fsa.determinize(|_, _| {});
        let mut relate_calls = 0;
        let min = det.distinguish(|_| relate_calls += 1);
        assert_eq!(min.n(), 2);
        assert_eq!(relate_calls, 2);
        assert!(accepts(&min, &[b'a' as i64]));
        assert!(!accepts(&min, &[b'b' as i64]));
    }

    #[test]
    fn accessible_drops_unreachable_states() {
        let fsa = Fsa {
            start: 0,
            finals: vec![1],
            adj: vec![vec![(EdgeLabel::Range(0, 1), 1)], vec![], vec![(EdgeLabel::Range(0, 1), 0)]],
        };
        let mut related = Vec::new();
        let reached = fsa.accessible(|old| related.push(old));
        assert_eq!(reached.n(), 2);
        assert_eq!(related, vec![0, 1]);
    }

    #[test]
    fn co_accessible_drops_dead_ends() {
        let fsa = Fsa {
            start: 0,
            finals: vec![1],
            adj: vec![
                vec![(EdgeLabel::Range(0, 1), 1), (EdgeLabel::Range(1, 2), 2)],
                vec![],
                vec![], // state 2 is reachable from start but can never reach a final
            ],
        };
        let reached = fsa.co_accessible(|_| {});
        assert_eq!(reached.n(), 2);
    }

    #[test]
    fn intersect_accepts_common_language() {
        let a = literal(b"a").totalize(256);
        let b = literal(b"a").totalize(256);
        let inter = a.intersect(&b, |_, _| {});
        assert!(accepts(&inter, &[b'a' as i64]));
    }
}
