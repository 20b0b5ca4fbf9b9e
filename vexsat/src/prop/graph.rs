//! The implication graph.
use vexsat_formula::{lit::LitIdx, Lit, Var};

use crate::clause::{ClauseDb, ClauseRef};

/// Assignment that caused a propagation.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Reason {
    /// No antecedent clause: decisions, assumptions and root level facts.
    Unit,
    /// The clause that became unit and forced the assignment.
    Clause(ClauseRef),
}

impl Reason {
    /// The literals of the antecedent clause.
    ///
    /// This includes the propagated literal itself, callers resolving on a variable skip it by
    /// variable index.
    pub fn lits<'a>(&self, db: &'a ClauseDb) -> &'a [Lit] {
        match self {
            Reason::Unit => &[],
            Reason::Clause(cref) => db.clause(*cref).lits(),
        }
    }
}

/// Node and incoming edges of the implication graph.
#[derive(Copy, Clone)]
pub struct ImplNode {
    pub reason: Reason,
    pub level: LitIdx,
}

/// The implication graph.
///
/// This is a DAG having all assigned variables as nodes. Unit clauses, assumptions and decisions
/// are sources. For each propagated assignment it has incoming edges from the literals whose
/// assignment caused the propagation to happen.
#[derive(Default)]
pub struct ImplGraph {
    /// Contains only valid data for indices of assigned variables.
    pub nodes: Vec<ImplNode>,
}

impl ImplGraph {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.nodes.resize(
            count,
            ImplNode {
                reason: Reason::Unit,
                level: 0,
            },
        );
    }

    /// Get the reason for an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn reason(&self, var: Var) -> &Reason {
        &self.nodes[var.index()].reason
    }

    /// Get the decision level of an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn level(&self, var: Var) -> usize {
        self.nodes[var.index()].level as usize
    }
}
