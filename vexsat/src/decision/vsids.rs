//! The VSIDS branching heuristic.
//!
//! The VSIDS (Variable State Independent Decaying Sum) branching heuristic keeps an activity value
//! for each variable. During each conflict analysis the variables involved are bumped, which means
//! that their activity is increased by an increment. After each analysis the increment grows,
//! which is equivalent to decaying the activity of all variables by a constant factor below 1,
//! up to a uniform scaling factor that does not affect the activity order.
//!
//! When a decision is made, it branches on the variable with the highest activity among the
//! unassigned variables. Ties are broken by the heap order, which only depends on the sequence of
//! operations performed, keeping decisions reproducible for identical inputs.
//!
//! The activities are kept in an indexed binary max-heap. Assigned variables stay in the heap
//! until they are popped and are re-inserted on backtracking, so every unassigned variable is
//! present at all times.
//!
//! This module also keeps the static literal occurrence counts used by the literal-score value
//! heuristic. They are accumulated while original clauses are loaded and are not updated for
//! learned clauses.
use ordered_float::OrderedFloat;

use vexsat_formula::{Lit, Var};

use crate::config::SolverConfig;

/// When an activity exceeds this, all activities and the increment are scaled down.
///
/// Scaling down preserves the relative order of all activities.
const RESCALE_LIMIT: f64 = 1e100;

/// The VSIDS branching heuristic.
pub struct Vsids {
    /// The activity of each variable.
    activity: Vec<OrderedFloat<f64>>,
    /// A binary max-heap of variables, ordered by activity.
    heap: Vec<Var>,
    /// The position in the binary heap for each variable.
    position: Vec<Option<usize>>,
    /// The value to add on bumping.
    var_inc: f64,
    /// The inverse of the decay factor.
    inv_decay: f64,
    /// Number of occurrences of each literal in the original clauses.
    lit_score: Vec<u32>,
}

impl Default for Vsids {
    fn default() -> Vsids {
        Vsids {
            activity: vec![],
            heap: vec![],
            position: vec![],
            var_inc: 1.0,
            inv_decay: 1.0 / SolverConfig::default().var_decay,
            lit_score: vec![],
        }
    }
}

impl Vsids {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        let old_count = self.activity.len();
        self.activity.resize(count, OrderedFloat(0.0));
        self.position.resize(count, None);
        self.lit_score.resize(count * 2, 0);

        for index in old_count..count {
            self.make_available(Var::from_index(index));
        }
    }

    /// Change the decay factor.
    pub fn set_decay(&mut self, decay: f64) {
        assert!(decay > 0.0 && decay < 1.0);
        self.inv_decay = 1.0 / decay;
    }

    /// Bump a variable by increasing its activity by the current increment.
    pub fn bump(&mut self, var: Var) {
        let rescale = {
            let value = &mut self.activity[var.index()];
            value.0 += self.var_inc;
            value.0 >= RESCALE_LIMIT
        };
        if rescale {
            self.rescale();
        }
        if let Some(pos) = self.position[var.index()] {
            self.sift_up(pos);
        }
    }

    /// Decay all variable activities.
    ///
    /// Instead of scaling every activity down, the increment is scaled up.
    pub fn decay(&mut self) {
        self.var_inc *= self.inv_decay;
        if self.var_inc >= RESCALE_LIMIT {
            self.rescale();
        }
    }

    /// Scale all activities and the increment down to avoid overflowing.
    fn rescale(&mut self) {
        for activity in &mut self.activity {
            activity.0 /= RESCALE_LIMIT;
        }
        self.var_inc /= RESCALE_LIMIT;
    }

    /// The activity of a variable.
    pub fn activity(&self, var: Var) -> f64 {
        self.activity[var.index()].0
    }

    /// Count an occurrence of a literal in an original clause.
    pub fn bump_lit_score(&mut self, lit: Lit) {
        self.lit_score[lit.code()] += 1;
    }

    /// Number of occurrences of a literal in the original clauses.
    pub fn lit_score(&self, lit: Lit) -> u32 {
        self.lit_score[lit.code()]
    }

    /// Insert a variable into the heap if not already present.
    pub fn make_available(&mut self, var: Var) {
        if self.position[var.index()].is_none() {
            let position = self.heap.len();
            self.position[var.index()] = Some(position);
            self.heap.push(var);
            self.sift_up(position);
        }
    }

    /// Move a variable closer to the root until the heap property is satisfied.
    fn sift_up(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        loop {
            if pos == 0 {
                return;
            }
            let parent_pos = (pos - 1) / 2;
            let parent_var = self.heap[parent_pos];
            if self.activity[parent_var.index()] >= self.activity[var.index()] {
                return;
            }
            self.position[var.index()] = Some(parent_pos);
            self.heap[parent_pos] = var;
            self.position[parent_var.index()] = Some(pos);
            self.heap[pos] = parent_var;
            pos = parent_pos;
        }
    }

    /// Move a variable away from the root until the heap property is satisfied.
    fn sift_down(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        loop {
            let mut largest_pos = pos;
            let mut largest_var = var;

            let left_pos = pos * 2 + 1;
            if left_pos < self.heap.len() {
                let left_var = self.heap[left_pos];

                if self.activity[largest_var.index()] < self.activity[left_var.index()] {
                    largest_pos = left_pos;
                    largest_var = left_var;
                }
            }

            let right_pos = pos * 2 + 2;
            if right_pos < self.heap.len() {
                let right_var = self.heap[right_pos];

                if self.activity[largest_var.index()] < self.activity[right_var.index()] {
                    largest_pos = right_pos;
                    largest_var = right_var;
                }
            }

            if largest_pos == pos {
                return;
            }

            self.position[var.index()] = Some(largest_pos);
            self.heap[largest_pos] = var;
            self.position[largest_var.index()] = Some(pos);
            self.heap[pos] = largest_var;
            pos = largest_pos;
        }
    }
}

/// Yields variables in order of decreasing activity.
impl Iterator for Vsids {
    type Item = Var;

    fn next(&mut self) -> Option<Var> {
        if self.heap.is_empty() {
            None
        } else {
            let var = self.heap.swap_remove(0);
            if !self.heap.is_empty() {
                let top_var = self.heap[0];
                self.position[top_var.index()] = Some(0);
                self.sift_down(0);
            }
            self.position[var.index()] = None;
            Some(var)
        }
    }
}
