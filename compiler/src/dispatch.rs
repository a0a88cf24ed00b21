//! The emitted dispatch contract: `start`, `is_final`, `transit` over one exported definition's
//! compiled [`DispatchTable`].

use fsc_automata::{Label, StateId};

use crate::action_compiler::{DispatchCase, DispatchTable};
use crate::expr::ActionId;

/// Sentinel returned by [`CompiledDefinition::transit`] when `c` has no matching case from `u` —
/// the input does not extend to a valid string for this definition from here.
pub const DEAD: StateId = StateId::max_value();

/// One exported definition's compiled automaton, ready to drive a byte-at-a-time scan. Finals are
/// kept sorted so `is_final` answers in `O(log n)`; cases are grouped by source state and sorted
/// by `lo` so `transit` binary-searches its case range instead of scanning the whole table.
pub struct CompiledDefinition {
    start: StateId,
    finals: Vec<StateId>,
    by_state: Vec<Vec<DispatchCase>>,
}

impl CompiledDefinition {
    pub fn new(table: DispatchTable) -> Self {
        let mut finals = table.finals.clone();
        finals.sort_unstable();

        let n = table.cases.iter().map(|c| c.from).max().map_or(0, |m| m + 1).max(table.start + 1);
        let mut by_state: Vec<Vec<DispatchCase>> = vec![Vec::new(); n];
        for case in table.cases {
            by_state[case.from].push(case);
        }
        for row in &mut by_state {
            row.sort_by_key(|c| c.lo);
        }

        CompiledDefinition { start: table.start, finals, by_state }
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn is_final(&self, u: StateId) -> bool {
        self.finals.binary_search(&u).is_ok()
    }

    /// Advances from `u` on symbol `c`, running every action body that fires along the way through
    /// `run`, and returns the next state, or [`DEAD`] if `c` has no outgoing case from `u`.
    pub fn transit(&self, u: StateId, c: Label, mut run: impl FnMut(ActionId)) -> StateId {
        let row = match self.by_state.get(u) {
            Some(row) => row,
            None => return DEAD,
        };
        let idx = match row.binary_search_by(|case| case.lo.cmp(&c)) {
            Ok(i) => i,
            Err(0) => return DEAD,
            Err(i) => i - 1,
        };
        let case = &row[idx];
        if c < case.hi {
            for &action in &case.body {
                run(action);
            }
            case.to
        } else {
            DEAD
        }
    }
}
