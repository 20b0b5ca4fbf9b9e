//! Scheduling of restarts, cancellation and progress reporting.
use std::time::{Duration, Instant};

use log::info;

use partial_ref::{partial, PartialRef};

use crate::cdcl::conflict_step;
use crate::config::SolverConfig;
use crate::context::{
    AnalyzeConflictP, AssignmentP, CallbacksP, ClauseDbP, Context, ImplGraphP, IncrementalP,
    ScheduleP, SolverConfigP, SolverStateP, TrailP, VsidsP, WatchlistsP,
};
use crate::state::SatState;

/// Restart policy state and the deadline of the running solve call.
///
/// Restarts are local: a restart is triggered when the number of conflicts at a single decision
/// level exceeds the current threshold. The threshold follows a geometric schedule with an outer
/// reset: each restart multiplies the threshold, and when it outgrows the upper bound, the
/// threshold starts over at the lower bound while the upper bound is multiplied instead.
pub struct Schedule {
    restart_threshold: u64,
    restart_lower: u64,
    restart_upper: u64,
    restart_multiplier: f64,
    started: Option<Instant>,
    timeout: Option<Duration>,
}

impl Default for Schedule {
    fn default() -> Schedule {
        let config = SolverConfig::default();
        Schedule {
            restart_threshold: config.restart_lower,
            restart_lower: config.restart_lower,
            restart_upper: config.restart_upper,
            restart_multiplier: config.restart_multiplier,
            started: None,
            timeout: None,
        }
    }
}

impl Schedule {
    /// Conflicts a single decision level may accumulate before a restart.
    pub fn restart_threshold(&self) -> u64 {
        self.restart_threshold
    }

    /// Reconfigure the restart schedule.
    ///
    /// Takes effect for the thresholds computed from here on.
    pub fn set_restart_schedule(&mut self, lower: u64, upper: u64, multiplier: f64) {
        self.restart_threshold = lower;
        self.restart_lower = lower;
        self.restart_upper = upper;
        self.restart_multiplier = multiplier;
    }

    /// Advance the restart schedule after a restart was triggered.
    pub fn advance_restart_schedule(&mut self) {
        self.restart_threshold = (self.restart_threshold as f64 * self.restart_multiplier) as u64;
        if self.restart_threshold > self.restart_upper {
            self.restart_threshold = self.restart_lower;
            self.restart_upper = (self.restart_upper as f64 * self.restart_multiplier) as u64;
        }
    }

    /// Start the clock for a solve call.
    pub fn start_timer(&mut self, timeout: Option<Duration>) {
        self.started = Some(Instant::now());
        self.timeout = timeout;
    }

    /// Whether the running solve call exceeded its time limit.
    pub fn deadline_exceeded(&self) -> bool {
        match (self.started, self.timeout) {
            (Some(started), Some(timeout)) => started.elapsed() > timeout,
            _ => false,
        }
    }
}

/// Perform one step of the search schedule.
///
/// Cancellation is polled here, once per conflict cycle: first the user's terminate callback,
/// then the deadline. Neither can interrupt an ongoing propagation or analysis.
///
/// Returns `false` when the search is done.
pub fn schedule_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut CallbacksP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ScheduleP,
        mut SolverStateP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        IncrementalP,
        SolverConfigP,
    ),
) -> bool {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return false;
    }

    let terminate = match &mut ctx.part_mut(CallbacksP).terminate {
        Some(callback) => callback(),
        None => false,
    };
    if terminate || ctx.part(ScheduleP).deadline_exceeded() {
        ctx.part_mut(SolverStateP).sat_state = SatState::Timeout;
        return false;
    }

    conflict_step(ctx.borrow());

    let stats = ctx.part(SolverStateP).stats;
    if stats.conflicts > 0 && stats.conflicts % 1000 == 0 {
        info!(
            "confl: {}k restarts: {} decisions: {} implications: {}",
            stats.conflicts / 1000,
            stats.restarts,
            stats.decisions,
            stats.implications(),
        );
    }

    true
}
