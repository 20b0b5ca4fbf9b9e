//! Conflict driven clause learning.
use partial_ref::{partial, PartialRef};

use crate::analyze_conflict::analyze_conflict;
use crate::clause;
use crate::context::{
    AnalyzeConflictP, AssignmentP, CallbacksP, ClauseDbP, Context, ImplGraphP, IncrementalP,
    ScheduleP, SolverConfigP, SolverStateP, TrailP, VsidsP, WatchlistsP,
};
use crate::decision::make_decision;
use crate::prop::{backtrack, enqueue_assignment, propagate, Conflict, Reason};
use crate::state::SatState;

/// Find a conflict, learn a clause and backtrack.
///
/// When no conflict is left the solver state becomes satisfiable. A conflict without active
/// decisions makes the formula unsatisfiable, under the active assumptions if there are any.
///
/// When the current decision level accumulated more conflicts than the restart threshold allows,
/// the search restarts instead of backtracking to the asserting level. The learned clause is kept
/// either way.
pub fn conflict_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut CallbacksP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ScheduleP,
        mut SolverStateP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        IncrementalP,
        SolverConfigP,
    ),
) {
    let conflict = match find_conflict(ctx.borrow()) {
        Ok(()) => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
            return;
        }
        Err(conflict) => conflict,
    };

    if ctx.part(TrailP).current_level() == 0 {
        // Assumptions are asserted at the root, so a root conflict with assumptions active is
        // only known to hold under them.
        let sat_state = if ctx.part(IncrementalP).has_assumptions() {
            SatState::UnsatUnderAssumptions
        } else {
            SatState::Unsat
        };
        ctx.part_mut(SolverStateP).sat_state = sat_state;
        return;
    }

    ctx.part_mut(SolverStateP).stats.conflicts += 1;
    let conflicts_at_level = ctx.part_mut(TrailP).count_conflict();
    let restart = conflicts_at_level > ctx.part(ScheduleP).restart_threshold();

    let backtrack_to = analyze_conflict(ctx.borrow(), conflict);

    let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);
    let learned = analyze.clause();

    if let Some(learn) = &mut ctx.part_mut(CallbacksP).learn {
        if learned.len() <= learn.max_len {
            (learn.callback)(learned);
        }
    }

    if restart {
        ctx.part_mut(ScheduleP).advance_restart_schedule();
        ctx.part_mut(SolverStateP).stats.restarts += 1;
    }

    // A restart abandons the asserting level. For a unit learned clause both targets are the
    // root, so restarting changes nothing.
    let target = if restart { 0 } else { backtrack_to };
    backtrack(ctx.borrow(), target);

    match learned.len() {
        1 => {
            // Unit learned clauses are not stored, they become root level facts that every reset
            // re-asserts.
            ctx.part_mut(ClauseDbP).add_unary(learned[0]);
            enqueue_assignment(ctx.borrow(), learned[0], Reason::Unit);
        }
        _ => {
            let cref = clause::add_clause(ctx.borrow(), learned);
            if target == backtrack_to {
                // The clause is asserting at the backtrack level. After a deeper restart it has
                // at least two unassigned literals and needs no immediate propagation.
                enqueue_assignment(ctx.borrow(), learned[0], Reason::Clause(cref));
            }
        }
    }
}

/// Search for a conflict.
///
/// Returns `Err` if a conflict was found and `Ok` if a satisfying assignment was found instead.
fn find_conflict(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> Result<(), Conflict> {
    loop {
        propagate(ctx.borrow())?;

        if !make_decision(ctx.borrow()) {
            return Ok(());
        }
    }
}
