//! Clause storage.
use partial_ref::{partial, PartialRef};

use vexsat_formula::{lit::LitIdx, Lit};

use crate::context::{ClauseDbP, Context, WatchlistsP};

/// Compact reference to a clause in the clause store.
///
/// Clauses are never deleted, so a reference stays valid while the backing store grows and can be
/// kept in watchlists and antecedents without invalidation.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ClauseRef(LitIdx);

impl ClauseRef {
    fn from_index(index: usize) -> ClauseRef {
        debug_assert!(index <= LitIdx::max_value() as usize);
        ClauseRef(index as LitIdx)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A stored clause of length at least 2 with its two watched positions.
///
/// The literal order is fixed at insertion. Moving a watch only updates the watched position, so
/// the positions recorded in antecedents and the deterministic scan order stay meaningful.
pub struct Clause {
    lits: Vec<Lit>,
    watches: [LitIdx; 2],
}

impl Clause {
    /// Create a clause watching its first two literals.
    pub fn new(lits: Vec<Lit>) -> Clause {
        debug_assert!(lits.len() >= 2);
        Clause {
            lits,
            watches: [0, 1],
        }
    }

    /// The clause's literals in insertion order.
    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    /// Number of literals in the clause.
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    /// The literal at the given position.
    pub fn lit(&self, pos: usize) -> Lit {
        self.lits[pos]
    }

    /// The position watched by the given side (0 or 1).
    pub fn watched_pos(&self, side: usize) -> usize {
        self.watches[side] as usize
    }

    /// The literal watched by the given side (0 or 1).
    pub fn watched_lit(&self, side: usize) -> Lit {
        self.lits[self.watches[side] as usize]
    }

    /// The side (0 or 1) whose watch is on the given literal.
    pub fn watch_side(&self, lit: Lit) -> usize {
        debug_assert!(self.watched_lit(0) == lit || self.watched_lit(1) == lit);
        (self.watched_lit(1) == lit) as usize
    }

    /// Move the given side's watch to a new position.
    pub fn move_watch(&mut self, side: usize, pos: usize) {
        debug_assert!(pos != self.watched_pos(side ^ 1));
        self.watches[side] = pos as LitIdx;
    }
}

/// Append only store of all clauses of length at least 2.
///
/// Unit clauses are not stored as clause records. Their literals are collected in `unaries` and
/// asserted at the root level, also after every reset between solve calls.
#[derive(Default)]
pub struct ClauseDb {
    clauses: Vec<Clause>,
    unaries: Vec<Lit>,
}

impl ClauseDb {
    /// The clause referenced by `cref`.
    pub fn clause(&self, cref: ClauseRef) -> &Clause {
        &self.clauses[cref.index()]
    }

    /// Mutable access to the clause referenced by `cref`.
    pub fn clause_mut(&mut self, cref: ClauseRef) -> &mut Clause {
        &mut self.clauses[cref.index()]
    }

    /// Number of stored clauses, learned clauses included.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Iterator over the references of all stored clauses in insertion order.
    pub fn refs(&self) -> impl Iterator<Item = ClauseRef> {
        (0..self.clauses.len()).map(ClauseRef::from_index)
    }

    /// Record a unary clause.
    pub fn add_unary(&mut self, lit: Lit) {
        self.unaries.push(lit);
    }

    /// Literals of all unary clauses, learned units included.
    pub fn unaries(&self) -> &[Lit] {
        &self.unaries
    }
}

/// Add a clause of length at least 2 to the store and the watchlists.
///
/// The clause watches its first two literals. Learned clauses arrange the asserting literal at
/// position 0 and the literal of the highest remaining decision level at position 1 before calling
/// this.
pub fn add_clause(
    mut ctx: partial!(Context, mut ClauseDbP, mut WatchlistsP),
    lits: &[Lit],
) -> ClauseRef {
    let watched = [lits[0], lits[1]];

    let db = ctx.part_mut(ClauseDbP);
    let cref = ClauseRef::from_index(db.clauses.len());
    db.clauses.push(Clause::new(lits.to_vec()));

    ctx.part_mut(WatchlistsP).watch_clause(cref, watched);

    cref
}
