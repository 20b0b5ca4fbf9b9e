//! Learns a new clause by analyzing a conflict.
use std::mem::swap;

use partial_ref::{partial, PartialRef};

use vexsat_formula::{Lit, Var};

use crate::context::{AnalyzeConflictP, ClauseDbP, Context, ImplGraphP, TrailP, VsidsP};
use crate::prop::{Conflict, Reason};

/// Temporaries for conflict analysis.
#[derive(Default)]
pub struct AnalyzeConflict {
    /// This is the learned clause after analysis finishes.
    clause: Vec<Lit>,
    /// Number of literals of the resolvent assigned at the current level.
    current_level_count: usize,
    /// Variables of the current resolvent.
    var_flags: Vec<bool>,
    /// Entries to clean in `var_flags`.
    to_clean: Vec<Var>,
}

impl AnalyzeConflict {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.var_flags.resize(count, false);
    }

    /// The learned clause.
    ///
    /// The asserting literal is in position 0. For clauses of length at least 2, position 1 holds
    /// the literal with the highest decision level among the rest, which is the literal that first
    /// becomes non-false again on backtracking. Watching positions 0 and 1 is therefore valid.
    pub fn clause(&self) -> &[Lit] {
        &self.clause
    }
}

/// Learns a new clause by analyzing a conflict.
///
/// Uses first-UIP learning: the conflict clause is resolved with the antecedents of its current
/// level literals, in reverse trail order, until a single literal of the current level remains.
///
/// Returns the lowest decision level that makes the learned clause asserting. May only be called
/// with at least one active decision.
pub fn analyze_conflict(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut VsidsP,
        ClauseDbP,
        ImplGraphP,
        TrailP,
    ),
    conflict: Conflict,
) -> usize {
    debug_assert!(ctx.part(TrailP).current_level() > 0);

    {
        let analyze = ctx.part_mut(AnalyzeConflictP);
        analyze.clause.clear();
        analyze.current_level_count = 0;
    }

    // We start with all the literals of the conflicting clause as the resolvent.
    for pos in 0..ctx.part(ClauseDbP).clause(conflict.clause).len() {
        let lit = ctx.part(ClauseDbP).clause(conflict.clause).lit(pos);
        add_literal(ctx.borrow(), lit);
    }

    // To get rid of all but one literal of the current level, we resolve the resolvent with the
    // antecedents of those literals. The correct order for this is reverse chronological, so we
    // walk the trail backwards. All current level literals are on top of the trail, so the walk
    // stops before reaching any lower level.
    let trail_len = ctx.part(TrailP).trail().len();

    'trail: for trail_pos in (0..trail_len).rev() {
        let lit = ctx.part(TrailP).trail()[trail_pos];

        let analyze = ctx.part_mut(AnalyzeConflictP);
        if !analyze.var_flags[lit.index()] {
            continue;
        }
        analyze.var_flags[lit.index()] = false;
        analyze.current_level_count -= 1;

        if analyze.current_level_count == 0 {
            // lit is the single remaining literal of the current level, the first UIP. The
            // resulting clause asserts its negation, which goes into position 0.
            analyze.clause.push(!lit);
            let end = analyze.clause.len() - 1;
            analyze.clause.swap(0, end);
            break 'trail;
        }

        // Resolve the resolvent with the antecedent of lit on lit's variable.
        let reason = *ctx.part(ImplGraphP).reason(lit.var());
        for pos in 0..reason.lits(ctx.part(ClauseDbP)).len() {
            let reason_lit = reason.lits(ctx.part(ClauseDbP))[pos];
            if reason_lit.var() != lit.var() {
                add_literal(ctx.borrow(), reason_lit);
            }
        }
    }

    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);

    for var in analyze.to_clean.drain(..) {
        analyze.var_flags[var.index()] = false;
    }

    // We find the highest level literal besides the asserting one and move it into position 1.
    // Its level is the backtrack target, and watching it keeps the watchlist invariant intact
    // after backtracking.
    let mut backtrack_to = 0;

    if analyze.clause.len() > 1 {
        let (prefix, rest) = analyze.clause.split_at_mut(2);
        let lit_1 = &mut prefix[1];
        backtrack_to = ctx.part(ImplGraphP).level(lit_1.var());
        for lit in rest.iter_mut() {
            let lit_level = ctx.part(ImplGraphP).level(lit.var());
            if lit_level > backtrack_to {
                backtrack_to = lit_level;
                swap(lit_1, lit);
            }
        }
    }

    ctx.part_mut(VsidsP).decay();

    backtrack_to
}

/// Add a literal to the resolvent.
///
/// Literals of the current decision level are only counted, the rest become part of the learned
/// clause. Root level literals are kept as well: assumptions are asserted at the root, so a clause
/// derived from them is only entailed with those literals present.
fn add_literal(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut VsidsP,
        ImplGraphP,
        TrailP
    ),
    lit: Lit,
) {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    if analyze.var_flags[lit.index()] {
        return;
    }

    ctx.part_mut(VsidsP).bump(lit.var());

    analyze.var_flags[lit.index()] = true;

    let lit_level = ctx.part(ImplGraphP).level(lit.var());
    if lit_level == ctx.part(TrailP).current_level() {
        analyze.current_level_count += 1;
    } else {
        analyze.clause.push(lit);
        analyze.to_clean.push(lit.var());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use vexsat_formula::{cnf_formula, lit};

    use crate::context::set_var_count;
    use crate::load::load_clause;
    use crate::prop::{enqueue_assignment, propagate};

    #[test]
    fn learns_asserting_clause_at_first_uip() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        // Deciding 1 and then 2 forces 3 and 4, which together falsify the last clause. The first
        // UIP of the conflict is 2, so the learned clause is (-1 -2) with -2 asserting.
        let formula = cnf_formula![
            -1, -2, 3;
            -2, 4;
            -3, -4, -1;
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
        let conflict = propagate(ctx.borrow()).unwrap_err();

        let backtrack_to = analyze_conflict(ctx.borrow(), conflict);

        let clause = ctx.part(AnalyzeConflictP).clause();
        assert_eq!(clause[0], lit![-2]);
        assert_eq!(clause.len(), 2);
        assert_eq!(clause[1], lit![-1]);
        assert_eq!(backtrack_to, 1);

        // all scratch flags were cleared
        assert!(ctx
            .part(AnalyzeConflictP)
            .var_flags
            .iter()
            .all(|&flag| !flag));
    }
}
