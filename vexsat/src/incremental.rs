//! Incremental solving: assumptions and the reset protocol between solve calls.
//!
//! Assumptions are unit literals forced true for a single solve call. They are asserted at the
//! root level right before the search starts, so learned clauses derived while they are active
//! keep their negations as ordinary literals and stay sound for later solve calls.
//!
//! After a solve call the trail holds the assumptions and everything derived from them. The first
//! `add` or `assume` that follows schedules a reset: all decisions are undone, the root trail is
//! dropped, the assumption set is cleared and the unary clauses are re-asserted. Learned clauses,
//! activities and saved phases all survive the reset, which is what makes re-solving related
//! formulas fast.
use partial_ref::{partial, PartialRef};

use vexsat_formula::{Lit, Var};

use crate::context::{
    AssignmentP, ClauseDbP, Context, ImplGraphP, IncrementalP, SolverStateP, TrailP, VsidsP,
};
use crate::prop::{backtrack, enqueue_assignment, Reason};
use crate::state::SatState;

/// Assumption set and the reset flag toggled by solve calls.
#[derive(Default)]
pub struct Incremental {
    assumptions: Vec<Lit>,
    needs_reset: bool,
}

impl Incremental {
    /// The assumptions for the next solve call.
    pub fn assumptions(&self) -> &[Lit] {
        &self.assumptions
    }

    /// Whether any assumptions are registered.
    pub fn has_assumptions(&self) -> bool {
        !self.assumptions.is_empty()
    }

    /// Register an assumption for the next solve call.
    pub fn assume(&mut self, lit: Lit) {
        self.assumptions.push(lit);
    }

    /// Make the next `add` or `assume` reset the volatile state of the finished solve call.
    pub fn schedule_reset(&mut self) {
        self.needs_reset = true;
    }
}

/// Reset the volatile state of a previous solve call if one happened.
///
/// Called before any clause or assumption is added.
pub fn check_reset(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut IncrementalP,
        mut SolverStateP,
        mut TrailP,
        mut VsidsP,
        ClauseDbP,
    ),
) {
    if !ctx.part(IncrementalP).needs_reset {
        return;
    }

    let incremental = ctx.part_mut(IncrementalP);
    incremental.needs_reset = false;
    incremental.assumptions.clear();

    match ctx.part(SolverStateP).sat_state {
        // Unsatisfiability of the formula itself is permanent.
        SatState::Unsat => return,
        _ => ctx.part_mut(SolverStateP).sat_state = SatState::Unknown,
    }

    backtrack(ctx.borrow(), 0);

    // Drop the root trail. It contains the previous assumptions and their implications, mixed
    // with unary clause assertions, which get re-asserted below.
    {
        let mut ctx: partial!(Context, mut AssignmentP, mut TrailP, mut VsidsP) = ctx.borrow();
        let (trail, mut ctx) = ctx.split_part_mut(TrailP);
        let (assignment, mut ctx) = ctx.split_part_mut(AssignmentP);
        let vsids = ctx.part_mut(VsidsP);
        for &lit in trail.trail() {
            assignment.unassign_var(lit.var());
            vsids.make_available(lit.var());
        }
        trail.clear();
    }

    assert_unaries(ctx.borrow());
}

/// Assert all unary clauses, learned units included, at the root level.
pub fn assert_unaries(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TrailP,
        ClauseDbP,
    ),
) {
    for index in 0..ctx.part(ClauseDbP).unaries().len() {
        let lit = ctx.part(ClauseDbP).unaries()[index];
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => (),
            Some(false) => {
                ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                return;
            }
            None => enqueue_assignment(ctx.borrow(), lit, Reason::Unit),
        }
    }
}

/// Find a variable that is assumed with both polarities, if there is one.
pub fn find_conflicting_assumption(ctx: partial!(Context, IncrementalP)) -> Option<Var> {
    let mut sorted = ctx.part(IncrementalP).assumptions().to_vec();
    sorted.sort_unstable();
    sorted
        .windows(2)
        .find(|pair| pair[0] == !pair[1])
        .map(|pair| pair[0].var())
}

/// Assert the registered assumptions at the root level.
///
/// Returns `false` when an assumption is already false at the root, which makes the formula
/// unsatisfiable under the assumption set.
pub fn apply_assumptions(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TrailP,
        IncrementalP,
    ),
) -> bool {
    for index in 0..ctx.part(IncrementalP).assumptions().len() {
        let lit = ctx.part(IncrementalP).assumptions()[index];
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => (),
            Some(false) => return false,
            None => enqueue_assignment(ctx.borrow(), lit, Reason::Unit),
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use vexsat_formula::{lit, lits};

    use crate::context::set_var_count;
    use crate::load::load_clause;
    use crate::prop::propagate;

    #[test]
    fn reset_drops_assumptions_and_keeps_unaries() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 4);

        load_clause(ctx.borrow(), &lits![1]);
        load_clause(ctx.borrow(), &lits![-2, 3]);

        ctx.part_mut(IncrementalP).assume(lit![2]);
        assert!(apply_assumptions(ctx.borrow()));
        assert!(propagate(ctx.borrow()).is_ok());

        assert!(ctx.part(AssignmentP).lit_is_true(lit![2]));
        assert!(ctx.part(AssignmentP).lit_is_true(lit![3]));

        ctx.part_mut(IncrementalP).schedule_reset();
        check_reset(ctx.borrow());

        // the assumption and its implication are gone, the unary clause is back
        assert!(ctx.part(AssignmentP).lit_is_true(lit![1]));
        assert!(ctx.part(AssignmentP).lit_is_unk(lit![2]));
        assert!(ctx.part(AssignmentP).lit_is_unk(lit![3]));
        assert!(!ctx.part(IncrementalP).has_assumptions());
    }

    #[test]
    fn detects_conflicting_assumptions() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 3);

        let incremental = ctx.part_mut(IncrementalP);
        incremental.assume(lit![1]);
        incremental.assume(lit![-2]);
        incremental.assume(lit![-1]);

        assert_eq!(
            find_conflicting_assumption(ctx.borrow()),
            Some(lit![1].var())
        );
    }

    #[test]
    fn assumption_false_at_root_is_detected() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 2);

        load_clause(ctx.borrow(), &lits![-1]);
        ctx.part_mut(IncrementalP).assume(lit![1]);

        assert!(!apply_assumptions(ctx.borrow()));
    }
}
