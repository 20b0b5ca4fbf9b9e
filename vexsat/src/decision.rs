//! Decision heuristics.
pub mod vsids;

use partial_ref::{partial, PartialRef};

use vexsat_formula::Lit;

use crate::config::ValueHeuristic;
use crate::context::{
    AssignmentP, Context, ImplGraphP, SolverConfigP, SolverStateP, TrailP, VsidsP,
};
use crate::prop::{enqueue_assignment, Reason};

/// Make a decision and enqueue it.
///
/// Branches on the unassigned variable with the highest activity. The polarity is chosen by the
/// configured value heuristic.
///
/// Returns `false` if no decision was made because all variables are assigned.
pub fn make_decision(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TrailP,
        mut VsidsP,
        SolverConfigP
    ),
) -> bool {
    let decision_var = loop {
        match ctx.part_mut(VsidsP).next() {
            // The heap may still contain variables that were assigned after they were added, skip
            // those.
            Some(var) if ctx.part(AssignmentP).var_value(var).is_none() => break var,
            Some(_) => continue,
            None => return false,
        }
    };

    let value = match ctx.part(SolverConfigP).value_heuristic {
        ValueHeuristic::PhaseSaving => ctx.part(AssignmentP).last_var_value(decision_var),
        ValueHeuristic::LitScore => {
            let vsids = ctx.part(VsidsP);
            vsids.lit_score(Lit::new(decision_var, true))
                > vsids.lit_score(Lit::new(decision_var, false))
        }
    };

    let decision = Lit::new(decision_var, value);

    ctx.part_mut(TrailP).new_decision_level();
    ctx.part_mut(SolverStateP).stats.decisions += 1;

    enqueue_assignment(ctx.borrow(), decision, Reason::Unit);

    true
}
