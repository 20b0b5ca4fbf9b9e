//! Boolean satisfiability solver.
use std::io;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use anyhow::Error;
use log::info;
use thiserror::Error;

use vexsat_dimacs::DimacsParser;
use vexsat_formula::{CnfFormula, Lit, Var};

use crate::callbacks::LearnCallback;
use crate::config::SolverConfig;
use crate::context::{
    config_changed, ensure_var_count, AssignmentP, CallbacksP, Context, IncrementalP, ScheduleP,
    SolverConfigP, SolverStateP,
};
use crate::incremental::{
    apply_assumptions, check_reset, find_conflicting_assumption,
};
use crate::load::load_clause;
use crate::schedule::schedule_step;
use crate::state::{SatState, Stats};

/// Outcome of a solve call.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SolveResult {
    Sat,
    Unsat,
    Timeout,
}

impl SolveResult {
    /// The conventional numeric code of the result: 10, 20 or 0.
    pub fn code(self) -> i32 {
        match self {
            SolveResult::Sat => 10,
            SolveResult::Unsat => 20,
            SolveResult::Timeout => 0,
        }
    }
}

/// Errors raised by the incremental API.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("tried to finish an empty clause")]
    EmptyClause,
}

/// An incremental boolean satisfiability solver.
///
/// The solver is an owned value holding all its state, several independent solvers can coexist.
/// Clauses learned during a solve call and the variable activities survive later clause additions,
/// so a sequence of solve calls on a growing formula is faster than solving each formula from
/// scratch.
#[derive(Default)]
pub struct Solver {
    ctx: Box<Context>,
    /// The clause currently being built literal by literal through [`add`](Solver::add).
    staged: Vec<Lit>,
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Solver {
        Solver::default()
    }

    /// Replace the solver configuration.
    pub fn set_config(&mut self, config: SolverConfig) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        *ctx.part_mut(SolverConfigP) = config;
        config_changed(ctx.borrow());
    }

    /// Append an external literal to the staged clause, or finish it.
    ///
    /// A nonzero value is pushed onto the staged clause. Zero finishes the staged clause and adds
    /// it to the formula: a unit clause is asserted at the root level, longer clauses go to the
    /// clause store. Finishing with no staged literals is an error.
    pub fn add(&mut self, lit_or_zero: isize) -> Result<(), SolverError> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        check_reset(ctx.borrow());

        if lit_or_zero == 0 {
            if self.staged.is_empty() {
                return Err(SolverError::EmptyClause);
            }
            load_clause(ctx.borrow(), &self.staged);
            self.staged.clear();
        } else {
            let lit = Lit::from_dimacs(lit_or_zero);
            ensure_var_count(ctx.borrow(), lit.index() + 1);
            self.staged.push(lit);
        }
        Ok(())
    }

    /// Add a clause to the formula.
    pub fn add_clause(&mut self, lits: &[Lit]) -> Result<(), SolverError> {
        if lits.is_empty() {
            return Err(SolverError::EmptyClause);
        }
        let mut ctx = self.ctx.into_partial_ref_mut();
        check_reset(ctx.borrow());

        let var_count = lits.iter().map(|lit| lit.index() + 1).max().unwrap_or(0);
        ensure_var_count(ctx.borrow(), var_count);
        load_clause(ctx.borrow(), lits);
        Ok(())
    }

    /// Add a formula to the solver.
    ///
    /// Unlike [`add_clause`](Solver::add_clause) this accepts empty clauses, which make the
    /// formula unsatisfiable.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        check_reset(ctx.borrow());

        ensure_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }
    }

    /// Reads and adds a formula in DIMACS CNF format.
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        let formula = DimacsParser::parse(input)?;

        info!(
            "Parsed formula with {} variables and {} clauses",
            formula.var_count(),
            formula.len()
        );

        self.add_formula(&formula);

        Ok(())
    }

    /// Assume a unit literal for the next solve call only.
    pub fn assume(&mut self, lit: Lit) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        check_reset(ctx.borrow());

        ensure_var_count(ctx.borrow(), lit.index() + 1);
        ctx.part_mut(IncrementalP).assume(lit);
    }

    /// Check the satisfiability of the current formula under the current assumptions.
    pub fn solve(&mut self) -> SolveResult {
        let mut ctx = self.ctx.into_partial_ref_mut();

        if ctx.part(SolverStateP).sat_state == SatState::Timeout {
            // A solve call right after a timeout resumes the interrupted search, keeping the
            // trail and the active assumptions.
            ctx.part_mut(SolverStateP).sat_state = SatState::Unknown;
        } else {
            // Assumptions of a previous solve call must not leak into this one, even when no add
            // or assume call triggered the reset in between.
            check_reset(ctx.borrow());
        }

        if ctx.part(SolverStateP).sat_state == SatState::Unknown {
            // Contradictory assumption sets are rejected without searching.
            if find_conflicting_assumption(ctx.borrow()).is_some()
                || !apply_assumptions(ctx.borrow())
            {
                ctx.part_mut(SolverStateP).sat_state = SatState::UnsatUnderAssumptions;
            }
        }

        let timeout = ctx.part(SolverConfigP).timeout;
        ctx.part_mut(ScheduleP).start_timer(timeout);

        while schedule_step(ctx.borrow()) {}

        // The next add or assume drops the assumptions and their implications.
        ctx.part_mut(IncrementalP).schedule_reset();

        let stats = ctx.part(SolverStateP).stats;
        info!(
            "Finished with {} conflicts, {} decisions, {} restarts",
            stats.conflicts, stats.decisions, stats.restarts
        );

        match ctx.part(SolverStateP).sat_state {
            SatState::Sat => SolveResult::Sat,
            SatState::Unsat | SatState::UnsatUnderAssumptions => SolveResult::Unsat,
            SatState::Timeout => SolveResult::Timeout,
            SatState::Unknown => unreachable!("search stopped in unknown state"),
        }
    }

    /// The value assigned to a literal by the model of the last solve call.
    pub fn value(&self, lit: Lit) -> Option<bool> {
        let ctx = self.ctx.into_partial_ref();
        if lit.index() < ctx.part(AssignmentP).var_count() {
            ctx.part(AssignmentP).lit_value(lit)
        } else {
            None
        }
    }

    /// The model value of an external literal: `x`, `-x` or 0 when unassigned.
    ///
    /// The sign of the input is ignored, the result reflects the variable's value.
    pub fn val(&self, lit: isize) -> isize {
        let number = lit.abs();
        match self.value(Lit::from_dimacs(number)) {
            Some(true) => number,
            Some(false) => -number,
            None => 0,
        }
    }

    /// Set of literals that satisfy the formula, after a satisfiable solve call.
    pub fn model(&self) -> Option<Vec<Lit>> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            Some(
                ctx.part(AssignmentP)
                    .assignment()
                    .iter()
                    .enumerate()
                    .flat_map(|(index, assignment)| {
                        assignment.map(|value| Lit::new(Var::from_index(index), value))
                    })
                    .collect(),
            )
        } else {
            None
        }
    }

    /// Install a callback polled once per search iteration, stopping the search when it returns
    /// true.
    ///
    /// The callback owns whatever state it captured and receives it on every invocation. A search
    /// stopped this way reports a timeout and can be resumed by calling solve again.
    pub fn set_terminate(&mut self, callback: impl FnMut() -> bool + 'static) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(CallbacksP).terminate = Some(Box::new(callback));
    }

    /// Install a callback receiving every learned clause of length at most `max_len`.
    pub fn set_learn(&mut self, max_len: usize, callback: impl FnMut(&[Lit]) + 'static) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(CallbacksP).learn = Some(LearnCallback {
            max_len,
            callback: Box::new(callback),
        });
    }

    /// Search statistics accumulated over the solver's lifetime.
    pub fn stats(&self) -> Stats {
        let ctx = self.ctx.into_partial_ref();
        ctx.part(SolverStateP).stats
    }

    /// Number of variables the solver has seen.
    pub fn var_count(&self) -> usize {
        let ctx = self.ctx.into_partial_ref();
        ctx.part(AssignmentP).var_count()
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("vars", &self.var_count())
            .field("staged", &self.staged)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use vexsat_formula::{cnf_formula, lits};
    use vexsat_dimacs::write_dimacs;

    use crate::test::{pigeonhole_formula, sat_formula};

    #[test]
    fn simple_sat() {
        let mut solver = Solver::new();

        solver.add_formula(&cnf_formula![
            1, 2;
        ]);

        assert_eq!(solver.solve(), SolveResult::Sat);
        assert!(solver.val(1) == 1 || solver.val(2) == 2);
    }

    #[test]
    fn contradicting_unit_clauses() {
        let mut solver = Solver::new();

        solver.add_clause(&lits![1]).unwrap();
        solver.add_clause(&lits![-1]).unwrap();

        assert_eq!(solver.solve(), SolveResult::Unsat);
    }

    #[test]
    fn empty_staged_clause_is_an_error() {
        let mut solver = Solver::new();

        assert!(matches!(solver.add(0), Err(SolverError::EmptyClause)));

        solver.add(1).unwrap();
        solver.add(-2).unwrap();
        solver.add(0).unwrap();

        assert_eq!(solver.solve(), SolveResult::Sat);
    }

    #[test]
    fn terminate_callback_stops_search() {
        let mut solver = Solver::new();

        solver.add_formula(&unsat_square());
        solver.set_terminate(|| true);

        assert_eq!(solver.solve(), SolveResult::Timeout);

        // resuming without the callback finishes the search
        solver.set_terminate(|| false);
        assert_eq!(solver.solve(), SolveResult::Unsat);
    }

    /// A fixed small unsat instance without unit clauses, so conflicts happen under decisions.
    fn unsat_square() -> CnfFormula {
        cnf_formula![
            1, 2;
            1, -2;
            -1, 2;
            -1, -2;
        ]
    }

    #[test]
    fn learn_callback_receives_clauses() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let learned: Rc<RefCell<Vec<Vec<Lit>>>> = Rc::new(RefCell::new(vec![]));
        let sink = Rc::clone(&learned);

        let mut solver = Solver::new();
        solver.add_formula(&unsat_square());
        solver.set_learn(2, move |clause| {
            sink.borrow_mut().push(clause.to_vec());
        });

        assert_eq!(solver.solve(), SolveResult::Unsat);

        // deriving unsat without unit clauses requires learning at least one unit
        assert!(!learned.borrow().is_empty());
        for clause in learned.borrow().iter() {
            assert!(clause.len() <= 2);
        }
    }

    proptest! {
        #[test]
        fn pigeonhole_unsat(formula in pigeonhole_formula(1..5usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), SolveResult::Unsat);
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), SolveResult::Sat);

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sat_via_dimacs(formula in sat_formula(4..20usize, 10..100usize)) {
            let mut solver = Solver::new();

            let mut dimacs = vec![];

            write_dimacs(&mut dimacs, &formula).unwrap();

            solver.add_dimacs_cnf(&mut &dimacs[..]).unwrap();

            prop_assert_eq!(solver.solve(), SolveResult::Sat);

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn unsat_stays_unsat_with_more_clauses(formula in pigeonhole_formula(1..4usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);
            prop_assert_eq!(solver.solve(), SolveResult::Unsat);

            solver.add_clause(&lits![1, 2]).unwrap();
            prop_assert_eq!(solver.solve(), SolveResult::Unsat);
        }

        #[test]
        fn assumptions_only_affect_one_solve(formula in sat_formula(4..15usize, 10..80usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);
            prop_assert_eq!(solver.solve(), SolveResult::Sat);

            let model = solver.model().unwrap();

            // solve with every model literal assumed flipped
            for &lit in model.iter() {
                solver.assume(!lit);
            }
            match solver.solve() {
                SolveResult::Sat => {
                    // a model found under assumptions has to honor all of them
                    for &lit in model.iter() {
                        prop_assert_eq!(solver.value(!lit), Some(true));
                    }
                }
                SolveResult::Unsat => (),
                SolveResult::Timeout => prop_assert!(false, "unexpected timeout"),
            }

            // the assumptions are gone for the next call
            prop_assert_eq!(solver.solve(), SolveResult::Sat);
        }
    }
}
