//! Loading a formula into the solver.
use partial_ref::{partial, PartialRef};

use vexsat_formula::Lit;

use crate::clause;
use crate::context::{
    AssignmentP, ClauseDbP, Context, ImplGraphP, SolverStateP, TrailP, VsidsP, WatchlistsP,
};
use crate::prop::{backtrack, enqueue_assignment, Reason};
use crate::state::SatState;

/// Adds a clause to the current formula.
///
/// Removes duplicated literals, ignores tautological clauses (eg. x v -x v y) and clauses
/// satisfied at the root level, drops literals false at the root level, and dispatches among
/// unit and stored clauses. Undoes all decisions first, so the root level simplification is
/// sound. May only be called while no assumptions are asserted.
///
/// Does not adjust the solver's variable count. If necessary that has to be done before calling
/// this.
pub fn load_clause(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
) {
    match ctx.part(SolverStateP).sat_state {
        SatState::Unsat => return,
        SatState::Unknown => (),
        _ => ctx.part_mut(SolverStateP).sat_state = SatState::Unknown,
    }

    // Adding a clause always restarts the search.
    backtrack(ctx.borrow(), 0);

    // The static literal occurrence counts follow the clause as given.
    for &lit in lits {
        ctx.part_mut(VsidsP).bump_lit_score(lit);
    }

    let mut lits = lits.to_vec();
    lits.sort_unstable();
    lits.dedup();

    // Detect tautological clauses
    let mut last = None;

    for &lit in lits.iter() {
        if last == Some(!lit) {
            return;
        }
        last = Some(lit);
    }

    // Remove literals false at the root and skip clauses satisfied at the root
    let mut simplified = Vec::with_capacity(lits.len());

    for &lit in lits.iter() {
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => return,
            Some(false) => (),
            None => simplified.push(lit),
        }
    }

    match simplified[..] {
        [] => ctx.part_mut(SolverStateP).sat_state = SatState::Unsat,
        [lit] => {
            ctx.part_mut(ClauseDbP).add_unary(lit);
            enqueue_assignment(ctx.borrow(), lit, Reason::Unit);
        }
        _ => {
            let _ = clause::add_clause(ctx.borrow(), &simplified);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use vexsat_formula::lits;

    use crate::context::set_var_count;

    #[test]
    fn unsat_on_empty_clause() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &[]);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }

    #[test]
    fn unit_clauses() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &lits![1]);

        assert_eq!(ctx.part(TrailP).trail().len(), 1);

        load_clause(ctx.borrow(), &lits![3, -3]);

        assert_eq!(ctx.part(TrailP).trail().len(), 1);

        load_clause(ctx.borrow(), &lits![-2]);

        assert_eq!(ctx.part(TrailP).trail().len(), 2);

        load_clause(ctx.borrow(), &lits![1, 1]);

        assert_eq!(ctx.part(TrailP).trail().len(), 2);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);

        load_clause(ctx.borrow(), &lits![2]);

        assert_eq!(ctx.part(TrailP).trail().len(), 2);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }

    #[test]
    fn stored_clauses() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &lits![1, 2, 3]);

        assert_eq!(ctx.part(ClauseDbP).len(), 1);

        load_clause(ctx.borrow(), &lits![-2, 3, 3, 4]);

        assert_eq!(ctx.part(ClauseDbP).len(), 2);

        load_clause(ctx.borrow(), &lits![4, -5, 5, 2]);

        assert_eq!(ctx.part(ClauseDbP).len(), 2);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);
    }

    #[test]
    fn root_level_simplification() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 10);

        load_clause(ctx.borrow(), &lits![-1]);

        // 1 is false at the root, so this becomes the unary clause 2
        load_clause(ctx.borrow(), &lits![1, 2]);

        assert_eq!(ctx.part(ClauseDbP).len(), 0);
        assert_eq!(ctx.part(TrailP).trail().len(), 2);
    }
}
