//! C3: recursive-descent Thompson construction over the expression tree.
//!
//! Binary nodes compile their **right** child first (stashed), then their left, so that Thompson
//! operators consume operands in the order the parser pre-ordered them. The builder also ticks
//! `pre`/`post` and fills `depth`/`anc[]` on every node it enters, via [`ExprArena::place`] /
//! [`ExprArena::finish`].

use std::collections::HashMap;

use fsc_automata::{AnnotatedFsa, LabelAllocator};
use fsc_logger::AnyLogger;

use crate::error::{CompileError, Result};
use crate::expr::{DefId, ExprArena, ExprId, ExprKind};
use crate::session::SessionConfig;

/// Drives one definition's worth of Thompson construction. Holds a preorder/postorder tick
/// counter shared across the whole recursive descent for one definition.
pub struct ThompsonBuilder<'a> {
    pub arena: &'a mut ExprArena,
    pub labels: &'a mut LabelAllocator,
    pub compiled: &'a HashMap<DefId, AnnotatedFsa<ExprId>>,
    pub collapse_targets: &'a mut HashMap<i64, DefId>,
    pub config: &'a SessionConfig,
    pub log: fsc_logger::Logger,
    tick: u32,
}

impl<'a> ThompsonBuilder<'a> {
    pub fn new(
        arena: &'a mut ExprArena,
        labels: &'a mut LabelAllocator,
        compiled: &'a HashMap<DefId, AnnotatedFsa<ExprId>>,
        collapse_targets: &'a mut HashMap<i64, DefId>,
        config: &'a SessionConfig,
        log: fsc_logger::Logger,
    ) -> Self {
        ThompsonBuilder { arena, labels, compiled, collapse_targets, config, log, tick: 0 }
    }

    /// Builds the annotated NFA for `id`, whose parent in the expression tree is `parent` (`None`
    /// for a definition's root).
    pub fn build(&mut self, id: ExprId, parent: Option<ExprId>, intact: bool) -> Result<AnnotatedFsa<ExprId>> {
        self.tick += 1;
        self.arena.place(id, parent, self.tick);

        let kind = self.arena.kind(id).clone();
        let is_collapse = matches!(kind, ExprKind::Collapse(_));
        let loc = self.arena.node(id).loc;

        let mut fsa = match kind.clone() {
            ExprKind::Literal(bytes) => AnnotatedFsa::literal(&bytes, id),
            ExprKind::Dot => AnnotatedFsa::dot(self.labels.action_base, id),
            ExprKind::Bracket(ranges) => AnnotatedFsa::bracket(&ranges, id),
            ExprKind::UnicodeRange(lo, hi) => AnnotatedFsa::unicode_range(lo, hi, id),
            ExprKind::Epsilon => AnnotatedFsa::epsilon(id),
            ExprKind::Collapse(def) => {
                let label = self.labels.alloc_collapse();
                self.collapse_targets.insert(label, def);
                AnnotatedFsa::collapse_placeholder(label, id)
            }
            ExprKind::Embed(def) => self
                .compiled
                .get(&def)
                .cloned()
                .ok_or(CompileError::UndefinedReference(def))?,
            ExprKind::Concat(l, r) => {
                let rhs = self.build(r, Some(id), intact)?;
                let mut lhs = self.build(l, Some(id), intact)?;
                lhs.concat(rhs);
                lhs
            }
            ExprKind::Union(l, r) => {
                let rhs = self.build(r, Some(id), intact)?;
                let lhs = self.build(l, Some(id), intact)?;
                lhs.union(rhs, id)
            }
            ExprKind::Star(e) => self.build(e, Some(id), intact)?.star(id),
            ExprKind::Plus(e) => self.build(e, Some(id), intact)?.plus(),
            ExprKind::Question(e) => self.build(e, Some(id), intact)?.question(id),
            ExprKind::Repeat(e, low, high) => {
                if let Some(h) = high {
                    if low > h {
                        return Err(CompileError::invalid_repeat(low, h, loc));
                    }
                }
                let inner = self.build(e, Some(id), intact)?;
                AnnotatedFsa::repeat(inner, low, high, id)
            }
            ExprKind::Complement(e) => {
                let mut inner = self.build(e, Some(id), intact)?;
                inner.complement(self.labels.action_base);
                inner
            }
            ExprKind::Difference(l, r) => {
                let mut rhs = self.build(r, Some(id), intact)?;
                let mut lhs = self.build(l, Some(id), intact)?;
                lhs.difference(&mut rhs, self.labels.action_base);
                lhs
            }
            ExprKind::Intersect(l, r) => {
                let mut rhs = self.build(r, Some(id), intact)?;
                let mut lhs = self.build(l, Some(id), intact)?;
                lhs.intersect(&mut rhs);
                lhs
            }
        };

        let has_actions = !self.arena.actions(id).is_empty();
        fsa.add_assoc(id, has_actions || intact || is_collapse);

        if has_actions {
            self.anchor_actions(&mut fsa);
        }

        if self.config.eager_minimize {
            fsa.determinize();
            fsa.minimize();
        }

        self.tick += 1;
        self.arena.finish(id, self.tick);
        self.log.trace(|| format!("built {} ({} states)", kind_name(&kind), fsa.fsa.n()));
        Ok(fsa)
    }

    /// Forces the start and final states of `expr`'s subautomaton apart from any structurally
    /// equivalent neighbor by looping a fresh action label on both: minimization is blind to
    /// `assoc`, so without a label difference two states that happen to carry different action
    /// sets but are otherwise bisimilar would be merged, silently dropping one side's actions.
    /// The label is stripped again by the cross-definition linker, strictly after the composite's
    /// own minimization has run.
    fn anchor_actions(&mut self, fsa: &mut AnnotatedFsa<ExprId>) {
        use fsc_automata::EdgeLabel;
        let label = self.labels.alloc_action();
        let sink = fsa.fsa.n();
        fsa.fsa.adj.push(Vec::new());
        fsa.assoc.push(Vec::new());
        fsa.fsa.adj[fsa.fsa.start].push((EdgeLabel::Range(label, label + 1), sink));
        fsa.fsa.adj[fsa.fsa.start].sort();
        fsa.deterministic = false;
    }
}

fn kind_name(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::Literal(_) => "Literal",
        ExprKind::Dot => "Dot",
        ExprKind::Bracket(_) => "Bracket",
        ExprKind::UnicodeRange(..) => "UnicodeRange",
        ExprKind::Epsilon => "Epsilon",
        ExprKind::Collapse(_) => "Collapse",
        ExprKind::Embed(_) => "Embed",
        ExprKind::Concat(..) => "Concat",
        ExprKind::Union(..) => "Union",
        ExprKind::Star(_) => "Star",
        ExprKind::Plus(_) => "Plus",
        ExprKind::Question(_) => "Question",
        ExprKind::Repeat(..) => "Repeat",
        ExprKind::Complement(_) => "Complement",
        ExprKind::Difference(..) => "Difference",
        ExprKind::Intersect(..) => "Intersect",
    }
}
