//! C5: action compiler.
//!
//! For every deterministic transition `u -c-> v` of a linked, minimized automaton, computes which
//! of the four action categories fire by diffing the two endpoints' expression-closures
//! (`within(u)`, `within(v)`), then emits a dispatch table with adjacent same-target same-body
//! edges coalesced back into single case ranges.

use std::collections::BTreeSet;

use itertools::Itertools;

use fsc_automata::{AnnotatedFsa, EdgeLabel, Label, StateId, Tag};

use crate::expr::{ActionId, ExprArena, ExprId};

/// One coalesced `(u, [lo, hi)) -> v` case, with the action bodies that fire for every symbol in
/// the range (identical for the whole range, which is what makes coalescing valid).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchCase {
    pub from: StateId,
    pub lo: Label,
    pub hi: Label,
    pub to: StateId,
    pub body: Vec<ActionId>,
}

#[derive(Clone, Debug)]
pub struct DispatchTable {
    pub start: StateId,
    pub finals: Vec<StateId>,
    pub cases: Vec<DispatchCase>,
}

/// Computes `within(u)` for every state, ordered by preorder ascending, since both the diff logic
/// and the per-category action ordering need that order.
///
/// A leaf association tagged purely `start` (no `inner`/`final` bit) is dropped before the
/// ancestor walk: `start` marks the state one transition *before* a subtree's content is
/// consumed, so an expression whose only leaf tag at `u` is `start` is not yet "within" anything
/// at `u` — it becomes so on the transition that leaves `u`, which is exactly what makes that
/// transition's diff register as `entering` rather than `transiting`. A leaf combining `start`
/// with `final` (a zero-width gadget such as `epsilon`) keeps its entry, since the `final` bit
/// alone already qualifies it.
fn expression_closures<T: Ord + Copy>(arena: &ExprArena, fsa: &AnnotatedFsa<T>) -> Vec<Vec<(ExprId, Tag)>>
where
    T: Into<ExprId>,
{
    (0..fsa.fsa.n())
        .map(|u| {
            let raw: Vec<(ExprId, Tag)> = fsa.assoc[u]
                .iter()
                .filter(|&&(_, t)| t.contains(Tag::INNER) || t.contains(Tag::FINAL))
                .map(|&(e, t)| (e.into(), t))
                .collect();
            arena.expression_closure(&raw)
        })
        .collect()
}

/// Actions of one category (`entering`/`leaving`/`transiting`) for `expr`, or the `finishing`
/// subset when `final_only` is set.
fn actions_of(arena: &ExprArena, expr: ExprId, category: fn(&crate::expr::ActionSet) -> &Vec<ActionId>) -> Vec<ActionId> {
    category(&arena.node(expr).actions).clone()
}

fn diff_bodies(arena: &ExprArena, within_u: &[(ExprId, Tag)], within_v: &[(ExprId, Tag)]) -> Vec<ActionId> {
    let u_set: BTreeSet<ExprId> = within_u.iter().map(|&(e, _)| e).collect();
    let v_map: std::collections::HashMap<ExprId, Tag> = within_v.iter().copied().collect();
    let v_set: BTreeSet<ExprId> = within_v.iter().map(|&(e, _)| e).collect();

    let mut body = Vec::new();

    // leaving: in within(u), not in within(v) — ordered by preorder (within_u is already sorted).
    for &(e, _) in within_u {
        if !v_set.contains(&e) {
            body.extend(actions_of(arena, e, |a| &a.leaving));
        }
    }
    // entering: in within(v), not in within(u).
    for &(e, _) in within_v {
        if !u_set.contains(&e) {
            body.extend(actions_of(arena, e, |a| &a.entering));
        }
    }
    // transiting / finishing: intersection, ordered by within(u)'s preorder.
    for &(e, _) in within_u {
        if v_set.contains(&e) {
            body.extend(actions_of(arena, e, |a| &a.transiting));
            if v_map.get(&e).map_or(false, |t| t.is_final()) {
                body.extend(actions_of(arena, e, |a| &a.finishing));
            }
        }
    }

    let mut seen = BTreeSet::new();
    body.retain(|&a| seen.insert(a));
    body
}

/// Runs C5 over `fsa` (already linked, determinized, minimized, and stripped of action-anchor
/// edges), producing the per-transition entering/leaving/transiting/finishing dispatch table.
pub fn compile<T>(arena: &ExprArena, fsa: &AnnotatedFsa<T>) -> DispatchTable
where
    T: Ord + Copy + Into<ExprId>,
{
    let within = expression_closures(arena, fsa);
    let mut cases: Vec<DispatchCase> = Vec::new();

    for (u, row) in fsa.fsa.adj.iter().enumerate() {
        let mut row: Vec<(Label, Label, StateId)> = row
            .iter()
            .filter_map(|&(label, v)| match label {
                EdgeLabel::Range(lo, hi) => Some((lo, hi, v)),
                EdgeLabel::Epsilon => None,
            })
            .collect();
        row.sort();

        let coalesced = row
            .into_iter()
            .map(|(lo, hi, v)| DispatchCase { from: u, lo, hi, to: v, body: diff_bodies(arena, &within[u], &within[v]) })
            .coalesce(|a, b| {
                if a.to == b.to && a.body == b.body && a.hi == b.lo {
                    Ok(DispatchCase { from: a.from, lo: a.lo, hi: b.hi, to: a.to, body: a.body })
                } else {
                    Err((a, b))
                }
            });
        cases.extend(coalesced);
    }

    DispatchTable { start: fsa.fsa.start, finals: fsa.fsa.finals.clone(), cases }
}
