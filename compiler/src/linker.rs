//! C4: cross-definition linker.
//!
//! Splices every definition transitively reachable from the root via `Collapse` references into
//! one composite automaton, replacing each collapse-label placeholder edge with epsilon wiring
//! into (and out of) the referenced definition's automaton, then hands off to the annotated-FSA
//! determinize/minimize/trim and strips the now-unneeded action-label edges.
//!
//! Collapse targets are allocated depth-first as they're discovered. "Enter" epsilon edges are
//! added from every collapse-placeholder source, and "exit" epsilon edges are added from the
//! referenced definition's finals back into the placeholder's target state — after which the
//! placeholder edge itself is dropped.

use std::collections::HashMap;

use fsc_automata::{AnnotatedFsa, EdgeLabel, Label, Tag};

use crate::expr::{DefId, ExprId};

/// Splices `root`'s automaton and every definition reachable from it via `Collapse` into one
/// composite, wiring collapse placeholders to epsilon edges. `per_def_fsa` holds each
/// definition's already Thompson-built annotated NFA; `collapse_targets` maps every collapse
/// label allocated anywhere in the session to the definition it refers to (built incrementally by
/// [`crate::thompson::ThompsonBuilder`] as each definition compiles).
///
/// Definitions are allocated into the composite lazily, following collapse edges outward from
/// `root` — a definition never referenced (directly or transitively) by `root` is left out, since
/// only what an exported definition's root can actually reach needs to exist in its export.
pub fn link(
    root: DefId,
    per_def_fsa: &HashMap<DefId, AnnotatedFsa<ExprId>>,
    collapse_targets: &HashMap<Label, DefId>,
) -> AnnotatedFsa<ExprId> {
    let mut offsets: HashMap<DefId, usize> = HashMap::new();
    let mut adj: Vec<Vec<(EdgeLabel, usize)>> = Vec::new();
    let mut assoc: Vec<Vec<(ExprId, Tag)>> = Vec::new();
    let mut pending = vec![root];

    // Allocate every reachable definition's states first, discovering further definitions to
    // allocate as their own collapse placeholders are scanned, before any epsilon wiring runs.
    while let Some(def) = pending.pop() {
        if offsets.contains_key(&def) {
            continue;
        }
        let fsa = per_def_fsa.get(&def).expect("every reachable definition is already compiled");
        let offset = adj.len();
        offsets.insert(def, offset);
        for mut row in fsa.fsa.adj.clone() {
            for edge in &mut row {
                edge.1 += offset;
            }
            adj.push(row);
        }
        assoc.extend(fsa.assoc.clone());

        for row in &fsa.fsa.adj {
            for &(label, _) in row {
                if let EdgeLabel::Range(lo, _) = label {
                    if let Some(&target) = collapse_targets.get(&lo) {
                        pending.push(target);
                    }
                }
            }
        }
    }

    for def in offsets.keys().copied().collect::<Vec<_>>() {
        let offset = offsets[&def];
        let n = per_def_fsa[&def].fsa.n();
        for local_u in 0..n {
            let u = offset + local_u;
            let collapse_labels: Vec<Label> = adj[u]
                .iter()
                .filter_map(|&(label, _)| match label {
                    EdgeLabel::Range(lo, _) if collapse_targets.contains_key(&lo) => Some(lo),
                    _ => None,
                })
                .collect();
            for label in collapse_labels {
                let target_def = collapse_targets[&label];
                let target_offset = offsets[&target_def];
                let target_fsa = &per_def_fsa[&target_def];

                // enter: u -eps-> target.start
                adj[u].push((EdgeLabel::Epsilon, target_offset + target_fsa.fsa.start));

                // exit: every original placeholder destination v gets f -eps-> v for every final
                // f of the referenced definition.
                let placeholder_targets: Vec<usize> = adj[u]
                    .iter()
                    .filter(|&&(l, _)| l == EdgeLabel::Range(label, label + 1))
                    .map(|&(_, v)| v)
                    .collect();
                for v in placeholder_targets {
                    for &f in &target_fsa.fsa.finals {
                        adj[target_offset + f].push((EdgeLabel::Epsilon, v));
                    }
                }
            }
            adj[u].retain(|&(label, _)| !matches!(label, EdgeLabel::Range(lo, _) if collapse_targets.contains_key(&lo)));
        }
    }

    for row in &mut adj {
        row.sort();
        row.dedup();
    }

    let root_offset = offsets[&root];
    let root_fsa = &per_def_fsa[&root];
    let finals = root_fsa.fsa.finals.iter().map(|&f| root_offset + f).collect();
    let fsa = fsc_automata::Fsa { start: root_offset + root_fsa.fsa.start, finals, adj };
    AnnotatedFsa { fsa, assoc, deterministic: false }
}
