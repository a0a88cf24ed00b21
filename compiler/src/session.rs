//! Compilation-session configuration and the driver that ties C3/C4/C5 together across a whole
//! set of named definitions.

use std::collections::{HashMap, HashSet};

use fsc_automata::{AnnotatedFsa, Label, LabelAllocator, Tag};
use fsc_logger::AnyLogger;

use crate::action_compiler::{self, DispatchTable};
use crate::error::{CompileError, Result};
use crate::expr::{DefId, Definition, ExprArena, ExprId, ExprKind};
use crate::linker;
use crate::thompson::ThompsonBuilder;

/// Knobs for behavior that has no single correct answer independent of caller tradeoffs.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Determinize+minimize every operator's result eagerly (bounds intermediate blow-up at the
    /// cost of extra work when a later operator would have collapsed states anyway). When `false`
    /// a definition is only determinized+minimized once, at the end of C3.
    pub eager_minimize: bool,
    /// Initial upper bound of the ordinary-symbol alphabet; must be at least 256.
    pub alphabet_hi: Label,
    /// Width of the collapse-label zone reserved above `action_base`; must be large enough that no
    /// action label allocated during C3 ever reaches `collapse_base`.
    pub collapse_reserve: Label,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig { eager_minimize: false, alphabet_hi: 256, collapse_reserve: 4096 }
    }
}

/// One compilation session: owns the expression arena and every definition's compiled automaton,
/// and drains a worklist of definitions to compile, continuing past a single definition's failure
/// rather than aborting the whole batch.
pub struct Session {
    pub config: SessionConfig,
    pub arena: ExprArena,
    labels: LabelAllocator,
    definitions: HashMap<DefId, Definition>,
    compiled: HashMap<DefId, AnnotatedFsa<ExprId>>,
    collapse_targets: HashMap<Label, DefId>,
    log: fsc_logger::Logger,
}

impl Session {
    pub fn new(arena: ExprArena, config: SessionConfig) -> Self {
        let labels = LabelAllocator::new(config.alphabet_hi, config.collapse_reserve);
        Session {
            config,
            arena,
            labels,
            definitions: HashMap::new(),
            compiled: HashMap::new(),
            collapse_targets: HashMap::new(),
            log: fsc_logger::Logger::new("fsc-compiler"),
        }
    }

    pub fn add_definition(&mut self, id: DefId, def: Definition) {
        self.definitions.insert(id, def);
    }

    /// Thompson-builds every definition reachable from `embed` edges in dependency order (embed
    /// targets must already exist — cyclic embedding is an error), skipping any definition already
    /// compiled. Returns one error per definition that failed; the rest of the batch keeps going.
    pub fn compile_all(&mut self) -> Vec<(DefId, CompileError)> {
        let order = match self.topo_order() {
            Ok(order) => order,
            Err(e) => return vec![(0, e)],
        };
        let mut failures = Vec::new();
        for id in order {
            if self.compiled.contains_key(&id) {
                continue;
            }
            match self.compile_one(id) {
                Ok(fsa) => {
                    self.compiled.insert(id, fsa);
                }
                Err(e) => {
                    self.log.warning(|| format!("definition {} failed to compile: {}", id, e));
                    failures.push((id, e));
                }
            }
        }
        failures
    }

    fn compile_one(&mut self, id: DefId) -> Result<AnnotatedFsa<ExprId>> {
        let def = self.definitions.get(&id).ok_or(CompileError::UndefinedReference(id))?.clone();
        let mut builder = ThompsonBuilder::new(
            &mut self.arena,
            &mut self.labels,
            &self.compiled,
            &mut self.collapse_targets,
            &self.config,
            self.log.clone(),
        );
        let mut fsa = builder.build(def.root, None, def.intact)?;
        if !self.config.eager_minimize {
            fsa.determinize();
            fsa.minimize();
        }
        // No trim here: a dead-end action anchor (see `ThompsonBuilder::anchor_actions`) is
        // exactly the kind of state `co_accessible` would discard, and it needs to survive,
        // still distinguishable, into the composite's own minimize in `compile_export`. Pruning
        // happens once, on the composite, after linking.
        Ok(fsa)
    }

    /// Topologically orders definitions by their `Embed` dependencies (`Collapse` references do
    /// not constrain ordering — they're resolved by the linker, which tolerates cycles). Cyclic
    /// `Embed` chains are reported as [`CompileError::CyclicEmbed`] naming every definition on the
    /// cycle, in visitation order.
    fn topo_order(&self) -> Result<Vec<DefId>> {
        let mut order = Vec::new();
        let mut done: HashSet<DefId> = HashSet::new();
        let mut on_stack: Vec<DefId> = Vec::new();
        let mut in_progress: HashSet<DefId> = HashSet::new();

        let mut ids: Vec<DefId> = self.definitions.keys().copied().collect();
        ids.sort();
        for id in ids {
            self.visit(id, &mut order, &mut done, &mut in_progress, &mut on_stack)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        id: DefId,
        order: &mut Vec<DefId>,
        done: &mut HashSet<DefId>,
        in_progress: &mut HashSet<DefId>,
        on_stack: &mut Vec<DefId>,
    ) -> Result<()> {
        if done.contains(&id) {
            return Ok(());
        }
        if in_progress.contains(&id) {
            let mut cycle: Vec<String> = on_stack
                .iter()
                .skip_while(|&&d| d != id)
                .map(|&d| self.definitions.get(&d).map(|def| def.name.clone()).unwrap_or_default())
                .collect();
            cycle.push(self.definitions.get(&id).map(|def| def.name.clone()).unwrap_or_default());
            return Err(CompileError::CyclicEmbed(cycle));
        }
        let def = match self.definitions.get(&id) {
            Some(def) => def,
            None => return Ok(()),
        };
        in_progress.insert(id);
        on_stack.push(id);
        for dep in embed_dependencies(&self.arena, def.root) {
            self.visit(dep, order, done, in_progress, on_stack)?;
        }
        on_stack.pop();
        in_progress.remove(&id);
        done.insert(id);
        order.push(id);
        Ok(())
    }

    /// Runs C4 for `root`'s export, splicing in every `Collapse`-reachable definition. When
    /// `substring` is set, additionally rewrites the spliced composite to accept any substring of
    /// a full parse — except through a region whose owning definition is `intact` — before
    /// determinizing+minimizing+trimming and stripping action-label anti-merge edges.
    pub fn compile_export(&mut self, root: DefId, substring: bool) -> AnnotatedFsa<ExprId> {
        let mut fsa = linker::link(root, &self.compiled, &self.collapse_targets);
        if substring {
            let arena = &self.arena;
            let definitions = &self.definitions;
            let is_blocked = |entries: &[(ExprId, Tag)]| {
                entries.iter().any(|&(e, tag)| {
                    tag.contains(Tag::INNER) && definitions.get(&arena.stmt(e)).map_or(false, |d| d.intact)
                })
            };
            let root_expr = self.definitions.get(&root).expect("export root is a registered definition").root;
            fsa.substring_grammar(root_expr, is_blocked);
        }
        fsa.determinize();
        fsa.minimize();
        fsa.trim();
        fsa.strip_action_edges(self.labels.action_base, self.labels.collapse_base);
        fsa
    }

    /// Runs C5 over an already-exported composite automaton, producing the per-transition
    /// entering/leaving/transiting/finishing dispatch table.
    pub fn compile_actions(&self, fsa: &AnnotatedFsa<ExprId>) -> DispatchTable {
        action_compiler::compile(&self.arena, fsa)
    }
}

fn embed_dependencies(arena: &ExprArena, root: ExprId) -> Vec<DefId> {
    let mut deps = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if let ExprKind::Embed(def) = arena.kind(id) {
            deps.push(*def);
        }
        stack.extend(arena.kind(id).children());
    }
    deps
}
