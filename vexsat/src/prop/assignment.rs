//! Partial assignment and backtracking.
use partial_ref::{partial, PartialRef};

use vexsat_formula::{lit::LitIdx, Lit, Var};

use crate::context::{AssignmentP, Context, ImplGraphP, SolverStateP, TrailP, VsidsP};

use super::Reason;

/// Current partial assignment.
#[derive(Default)]
pub struct Assignment {
    assignment: Vec<Option<bool>>,
    /// The last value assigned to each variable, initially false.
    ///
    /// Read by the phase saving heuristic. Updated when a literal is asserted and never cleared on
    /// backtracking.
    last_value: Vec<bool>,
}

impl Assignment {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.assignment.resize(count, None);
        self.last_value.resize(count, false);
    }

    /// Number of variables in the assignment.
    pub fn var_count(&self) -> usize {
        self.assignment.len()
    }

    /// Current partial assignment as slice.
    pub fn assignment(&self) -> &[Option<bool>] {
        &self.assignment
    }

    /// Value assigned to a variable.
    pub fn var_value(&self, var: Var) -> Option<bool> {
        self.assignment[var.index()]
    }

    /// Value last assigned to a variable.
    ///
    /// If the variable is currently assigned this returns the current value. If the variable was
    /// never assigned this returns false.
    pub fn last_var_value(&self, var: Var) -> bool {
        self.last_value[var.index()]
    }

    /// Value assigned to a literal.
    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.assignment[lit.index()].map(|value| value == lit.value())
    }

    pub fn lit_is_true(&self, lit: Lit) -> bool {
        self.assignment[lit.index()] == Some(lit.value())
    }

    pub fn lit_is_false(&self, lit: Lit) -> bool {
        self.assignment[lit.index()] == Some(!lit.value())
    }

    pub fn lit_is_unk(&self, lit: Lit) -> bool {
        self.assignment[lit.index()].is_none()
    }

    /// Assign true to the given literal and save its variable's phase.
    pub fn assign_lit(&mut self, lit: Lit) {
        self.assignment[lit.index()] = Some(lit.value());
        self.last_value[lit.index()] = lit.value();
    }

    /// Unassign a variable, keeping its saved phase.
    pub fn unassign_var(&mut self, var: Var) {
        self.assignment[var.index()] = None;
    }
}

/// Decision and propagation history.
#[derive(Default)]
pub struct Trail {
    /// Stack of all enqueued assignments in assignment order.
    trail: Vec<Lit>,
    /// Next assignment in trail to propagate.
    queue_head_pos: usize,
    /// Decision level separators as trail indices.
    ///
    /// `decisions[k]` is the trail length at the time level `k + 1` was started.
    decisions: Vec<LitIdx>,
    /// Number of conflicts seen at each decision level, drives local restarts.
    ///
    /// Kept in lockstep with `decisions`.
    conflict_counts: Vec<u64>,
}

impl Trail {
    /// Return the next assigned literal to propagate and remove it from the queue.
    pub fn pop_queue(&mut self) -> Option<Lit> {
        let head = self.trail.get(self.queue_head_pos).cloned();
        if head.is_some() {
            self.queue_head_pos += 1;
        }
        head
    }

    /// Assigned literals in assignment order.
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    /// Append an assigned literal.
    fn push(&mut self, lit: Lit) {
        self.trail.push(lit);
    }

    /// Clear the trail.
    ///
    /// This simply removes all entries without unassigning anything. Can only be called with no
    /// active decisions.
    pub fn clear(&mut self) {
        debug_assert!(self.decisions.is_empty());
        self.trail.clear();
        self.queue_head_pos = 0;
    }

    /// Start a new decision level.
    ///
    /// Does not enqueue the decision itself.
    pub fn new_decision_level(&mut self) {
        self.decisions.push(self.trail.len() as LitIdx);
        self.conflict_counts.push(0);
    }

    /// Current decision level.
    pub fn current_level(&self) -> usize {
        self.decisions.len()
    }

    /// Record a conflict at the current decision level and return the new count.
    ///
    /// May only be called with at least one active decision.
    pub fn count_conflict(&mut self) -> u64 {
        let count = self.conflict_counts.last_mut().expect("no active decision");
        *count += 1;
        *count
    }

    /// Whether all assignments are processed.
    pub fn fully_propagated(&self) -> bool {
        self.queue_head_pos == self.trail.len()
    }
}

/// Enqueues the assignment of true to a literal.
///
/// This updates the assignment and trail, but does not perform any propagation. The literal has to
/// be unassigned when calling this.
pub fn enqueue_assignment(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut SolverStateP,
        mut TrailP
    ),
    lit: Lit,
    reason: Reason,
) {
    let assignment = ctx.part_mut(AssignmentP);
    debug_assert!(assignment.lit_value(lit) == None);

    assignment.assign_lit(lit);
    ctx.part_mut(SolverStateP).stats.assignments += 1;

    let (trail, mut ctx) = ctx.split_part_mut(TrailP);

    trail.push(lit);

    let node = &mut ctx.part_mut(ImplGraphP).nodes[lit.index()];
    node.reason = reason;
    node.level = trail.decisions.len() as LitIdx;
}

/// Undo all assignments in decision levels deeper than the given level.
///
/// Unassigned variables become available for decisions again, their saved phases survive.
pub fn backtrack(
    mut ctx: partial!(Context, mut AssignmentP, mut TrailP, mut VsidsP),
    level: usize,
) {
    let (assignment, mut ctx) = ctx.split_part_mut(AssignmentP);
    let (trail, mut ctx) = ctx.split_part_mut(TrailP);

    if level == trail.decisions.len() {
        return;
    }

    let new_trail_len = trail.decisions[level] as usize;

    trail.queue_head_pos = new_trail_len;
    trail.decisions.truncate(level);
    trail.conflict_counts.truncate(level);

    let vsids = ctx.part_mut(VsidsP);
    for &lit in &trail.trail[new_trail_len..] {
        vsids.make_available(lit.var());
        assignment.unassign_var(lit.var());
    }
    trail.trail.truncate(new_trail_len);
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use vexsat_formula::{lit, lits};

    use crate::context::set_var_count;

    #[test]
    fn backtracking_unassigns_and_keeps_phases() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 4);

        for &lit in lits![1, -2].iter() {
            enqueue_assignment(ctx.borrow(), lit, Reason::Unit);
        }
        ctx.part_mut(TrailP).new_decision_level();
        for &lit in lits![3, -4].iter() {
            enqueue_assignment(ctx.borrow(), lit, Reason::Unit);
        }

        backtrack(ctx.borrow(), 0);

        let assignment = ctx.part(AssignmentP);
        assert_eq!(assignment.lit_value(lit![1]), Some(true));
        assert_eq!(assignment.lit_value(lit![-2]), Some(true));
        assert_eq!(assignment.var_value(Var::from_dimacs(3)), None);
        assert_eq!(assignment.var_value(Var::from_dimacs(4)), None);

        // phases of the unassigned variables survive
        assert_eq!(assignment.last_var_value(Var::from_dimacs(3)), true);
        assert_eq!(assignment.last_var_value(Var::from_dimacs(4)), false);

        assert_eq!(ctx.part(TrailP).trail().len(), 2);
        assert_eq!(ctx.part(TrailP).current_level(), 0);
    }
}
