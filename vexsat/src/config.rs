//! Solver configuration.
use std::time::Duration;

/// Heuristic used to pick the polarity of a decision variable.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ValueHeuristic {
    /// Reuse the last value the variable was assigned, initially false.
    PhaseSaving,
    /// Pick the polarity whose literal occurs more often in the original clauses, ties negative.
    LitScore,
}

/// Configurable parameters used during solving.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Decay factor for variable activities. (Default: 0.99)
    ///
    /// Instead of decaying all activities on every conflict, the activity increment is divided by
    /// this factor, which is equivalent up to a uniform scaling factor.
    pub var_decay: f64,

    /// Heuristic used to pick the polarity of a decision variable. (Default: phase saving)
    pub value_heuristic: ValueHeuristic,

    /// Initial conflict budget of a decision level before a local restart. (Default: 100)
    pub restart_lower: u64,

    /// Initial cap of the restart budget schedule. (Default: 1000)
    pub restart_upper: u64,

    /// Growth factor applied to the restart budget and its cap. (Default: 1.1)
    pub restart_multiplier: f64,

    /// Time limit for a single solve call. (Default: none)
    pub timeout: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            var_decay: 0.99,
            value_heuristic: ValueHeuristic::PhaseSaving,
            restart_lower: 100,
            restart_upper: 1000,
            restart_multiplier: 1.1,
            timeout: None,
        }
    }
}
