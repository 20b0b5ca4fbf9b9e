//! User provided callbacks.
use vexsat_formula::Lit;

/// Callback invoked for learned clauses up to a maximum length.
pub struct LearnCallback {
    /// Learned clauses longer than this are not delivered.
    pub max_len: usize,
    pub callback: Box<dyn FnMut(&[Lit])>,
}

/// User provided callbacks.
///
/// The callbacks are owned by the solver and keep whatever state they need captured. They are not
/// allowed to re-enter the solver, which the borrow checker enforces.
#[derive(Default)]
pub struct Callbacks {
    /// Polled once per search iteration, a `true` result stops the search with a timeout.
    pub terminate: Option<Box<dyn FnMut() -> bool>>,
    /// Invoked for every learned clause of length at most the registered maximum.
    pub learn: Option<LearnCallback>,
}
