//! Boolean constraint propagation using two watched literals.
use partial_ref::{partial, PartialRef};

use vexsat_formula::Lit;

use crate::clause::ClauseRef;
use crate::context::{
    AssignmentP, ClauseDbP, Context, ImplGraphP, SolverStateP, TrailP, WatchlistsP,
};

use super::enqueue_assignment;
use super::Reason;

/// Propagation that resulted in a conflict.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Conflict {
    /// The clause whose literals are all assigned false.
    pub clause: ClauseRef,
}

/// What to do with a clause whose watched literal was assigned false.
enum Revisit {
    /// The clause is satisfied or became unit, keep the watches unchanged.
    Keep,
    /// Move the falsified watch (given side) to a new position holding a non-false literal.
    MoveWatch { side: usize, pos: usize, lit: Lit },
    /// The clause is unit, propagate the other watched literal.
    Unit { other: Lit },
    /// All literals of the clause are false.
    Conflict,
}

/// Propagate all enqueued assignments.
///
/// Returns a conflict with the offending clause if one is found. On success all clauses are
/// either satisfied or have two non-false watched literals.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TrailP,
        mut WatchlistsP,
    ),
) -> Result<(), Conflict> {
    while let Some(lit) = ctx.part_mut(TrailP).pop_queue() {
        propagate_literal(ctx.borrow(), lit)?;
    }
    Ok(())
}

/// Revisit all clauses watching the negation of a newly assigned literal.
fn propagate_literal(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TrailP,
        mut WatchlistsP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let false_lit = !lit;

    // Detach the bucket so watch moves can push into other buckets. A replacement watch is always
    // non-false while `false_lit` is false, so no entry is added to the detached bucket while it
    // is scanned.
    let mut bucket = ctx.part_mut(WatchlistsP).take_bucket(false_lit);

    let mut conflict = None;
    let mut read = 0;
    let mut write = 0;

    while read < bucket.len() {
        let cref = bucket[read];
        read += 1;

        let revisit = revisit_clause(ctx.borrow(), cref, false_lit);

        match revisit {
            Revisit::Keep => {
                bucket[write] = cref;
                write += 1;
            }
            Revisit::MoveWatch { side, pos, lit } => {
                ctx.part_mut(ClauseDbP).clause_mut(cref).move_watch(side, pos);
                ctx.part_mut(WatchlistsP).add_watch(lit, cref);
            }
            Revisit::Unit { other } => {
                enqueue_assignment(ctx.borrow(), other, Reason::Clause(cref));
                bucket[write] = cref;
                write += 1;
            }
            Revisit::Conflict => {
                bucket[write] = cref;
                write += 1;
                conflict = Some(Conflict { clause: cref });
                break;
            }
        }
    }

    // On a conflict the remaining watches are kept as they are.
    while read < bucket.len() {
        bucket[write] = bucket[read];
        write += 1;
        read += 1;
    }
    bucket.truncate(write);
    ctx.part_mut(WatchlistsP).put_back(false_lit, bucket);

    match conflict {
        Some(conflict) => Err(conflict),
        None => Ok(()),
    }
}

/// Decide how to handle a single clause watching a newly falsified literal.
fn revisit_clause(
    ctx: partial!(Context, AssignmentP, ClauseDbP),
    cref: ClauseRef,
    false_lit: Lit,
) -> Revisit {
    let clause = ctx.part(ClauseDbP).clause(cref);
    let assignment = ctx.part(AssignmentP);

    let side = clause.watch_side(false_lit);
    let other = clause.watched_lit(side ^ 1);

    if assignment.lit_is_true(other) {
        return Revisit::Keep;
    }

    // Scan for a replacement literal, starting just past the falsified watch and wrapping
    // around, skipping the other watch. The first non-false literal found wins, making the
    // watch placement deterministic for identical inputs.
    let len = clause.len();
    let start = clause.watched_pos(side);
    let other_pos = clause.watched_pos(side ^ 1);

    for offset in 1..len {
        let pos = (start + offset) % len;
        if pos == other_pos {
            continue;
        }
        let candidate = clause.lit(pos);
        if !assignment.lit_is_false(candidate) {
            return Revisit::MoveWatch {
                side,
                pos,
                lit: candidate,
            };
        }
    }

    if assignment.lit_is_unk(other) {
        Revisit::Unit { other }
    } else {
        Revisit::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use vexsat_formula::{cnf_formula, lit, lits};

    use crate::context::set_var_count;
    use crate::load::load_clause;
    use crate::prop::backtrack;

    #[test]
    fn propagates_chain_of_units() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            1;
            -1, 2;
            -2, 3;
            -2, -3, 4;
        ];

        set_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        assert!(propagate(ctx.borrow()).is_ok());

        for &expected in lits![1, 2, 3, 4].iter() {
            assert!(ctx.part(AssignmentP).lit_is_true(expected));
        }
        assert!(ctx.part(TrailP).fully_propagated());
    }

    #[test]
    fn detects_conflict() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            -1, 2;
            -1, -2, 3;
            -2, -3;
        ];

        set_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), lit![1], Reason::Unit);

        let conflict = propagate(ctx.borrow()).unwrap_err();

        let lits = ctx
            .part(ClauseDbP)
            .clause(conflict.clause)
            .lits()
            .to_vec();
        for lit in lits {
            assert!(ctx.part(AssignmentP).lit_is_false(lit));
        }
    }

    #[test]
    fn watches_stay_consistent_across_backtracking() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            -1, -2, 3, 4;
            -3, 2;
            -4, -3;
        ];

        set_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), lit![1], Reason::Unit);
        assert!(propagate(ctx.borrow()).is_ok());

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), lit![2], Reason::Unit);
        assert!(propagate(ctx.borrow()).is_ok());

        backtrack(ctx.borrow(), 0);

        // every clause still has its two watched positions in the right buckets
        let db = ctx.part(ClauseDbP);
        let watchlists = ctx.part(WatchlistsP);
        for cref in db.refs() {
            let clause = db.clause(cref);
            for side in 0..2 {
                let lit = clause.watched_lit(side);
                assert!(watchlists.watched_by(lit).contains(&cref));
            }
        }
    }
}
