//! vexsat is an incremental CDCL based SAT solver.
//!
//! The solver is used through the [`Solver`](crate::solver::Solver) type, which supports adding
//! clauses, assuming unit literals for a single solve call and querying the model after a
//! satisfiable result. Clauses and learned facts are kept across solve calls, so solving a
//! sequence of related formulas is faster than solving each from scratch.
pub mod config;
pub mod solver;

mod analyze_conflict;
mod callbacks;
mod cdcl;
mod clause;
mod context;
mod decision;
mod incremental;
mod load;
mod prop;
mod schedule;
mod state;

pub use vexsat_formula::{CnfFormula, Lit, Var};

pub use crate::config::{SolverConfig, ValueHeuristic};
pub use crate::solver::{SolveResult, Solver, SolverError};

#[cfg(test)]
mod test;
