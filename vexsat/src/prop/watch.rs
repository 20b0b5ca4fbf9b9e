//! Watchlists to detect clauses that became unit.
//!
//! Every stored clause watches two of its literals. The watchlist bucket of a literal holds the
//! references of all clauses currently watching that literal. While both watched literals of a
//! clause are non-false the clause can neither be unit nor conflicting, so propagation only has to
//! revisit a clause when one of its watched literals is assigned false.
//!
//! When that happens the watch is moved to another non-false literal of the clause if possible.
//! If no replacement exists the clause is unit (propagating the other watched literal) or, when
//! the other watched literal is false as well, conflicting. There is no need to update watchlists
//! on backtracking, as unassigning variables cannot invalidate the invariant.
//!
//! See [Section 4.5.1 of the "Handbook of Satisfiability"][handbook-ch4] for more details and
//! references.
//!
//! [handbook-ch4]: https://www.satassociation.org/articles/FAIA185-0131.pdf
use vexsat_formula::Lit;

use crate::clause::ClauseRef;

/// Watchlists to detect clauses that became unit.
#[derive(Default)]
pub struct Watchlists {
    /// For each literal, the clauses watching that literal.
    watches: Vec<Vec<ClauseRef>>,
}

impl Watchlists {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.watches.resize(count * 2, vec![]);
    }

    /// Start watching a clause.
    ///
    /// `lits` have to be the two watched literals of the given clause.
    pub fn watch_clause(&mut self, cref: ClauseRef, lits: [Lit; 2]) {
        debug_assert_ne!(lits[0], lits[1]);
        for &lit in lits.iter() {
            self.add_watch(lit, cref);
        }
    }

    /// Make a literal watch a clause.
    pub fn add_watch(&mut self, lit: Lit, cref: ClauseRef) {
        self.watches[lit.code()].push(cref)
    }

    /// Take the bucket of clauses watching a literal, leaving an empty bucket.
    ///
    /// Used by propagation to scan a bucket while moving watches into other buckets. The retained
    /// references are put back with [`put_back`](Watchlists::put_back).
    pub fn take_bucket(&mut self, lit: Lit) -> Vec<ClauseRef> {
        std::mem::replace(&mut self.watches[lit.code()], vec![])
    }

    /// Put a drained bucket back for a literal.
    pub fn put_back(&mut self, lit: Lit, bucket: Vec<ClauseRef>) {
        debug_assert!(self.watches[lit.code()].is_empty());
        self.watches[lit.code()] = bucket;
    }

    /// The clauses currently watching a literal.
    pub fn watched_by(&self, lit: Lit) -> &[ClauseRef] {
        &self.watches[lit.code()]
    }
}
