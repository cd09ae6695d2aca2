use strider_nav::{sqr, Vec2};

use crate::goal::Plan;
use crate::spatial::NeighborId;

/// One simulated agent: a mobile circle following a plan of goal segments.
///
/// Fields are plain data; the driver orchestrates the per-tick phases.
#[derive(Debug)]
pub struct Agent {
    pub position: Vec2,
    pub radius: f32,
    pub velocity: Vec2,
    /// Output of the velocity solver, applied by [`Agent::update`].
    pub new_velocity: Vec2,
    pub pref_velocity: Vec2,
    pub max_speed: f32,
    pub pref_speed: f32,
    pub max_accel: f32,
    /// Radius of the neighborhood query.
    pub neighbor_dist: f32,
    pub max_neighbors: usize,
    /// Immobile agents still occupy space but never take avoidance upon
    /// themselves; neighbors treat them as static circles.
    pub is_mobile: bool,
    pub plan: Plan,
    index_in_plan: usize,
    cur_goal: usize,
    /// Nearest neighbors by squared surface distance, ascending.
    neighbors: Vec<(f32, NeighborId)>,
}

impl Agent {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            radius: 0.5,
            velocity: Vec2::ZERO,
            new_velocity: Vec2::ZERO,
            pref_velocity: Vec2::ZERO,
            max_speed: 4.0,
            pref_speed: 4.0,
            max_accel: f32::INFINITY,
            neighbor_dist: 15.0,
            max_neighbors: 10,
            is_mobile: true,
            plan: Plan::new(),
            index_in_plan: 1,
            cur_goal: 0,
            neighbors: Vec::new(),
        }
    }

    /// Replace the plan and restart it from its first segment.
    pub fn set_plan(&mut self, plan: Plan) {
        self.plan = plan;
        self.cur_goal = 0;
        self.index_in_plan = 1;
    }

    /// Index of the active goal segment.
    pub fn current_goal(&self) -> usize {
        self.cur_goal
    }

    pub fn neighbors(&self) -> &[(f32, NeighborId)] {
        &self.neighbors
    }

    /// Drop the neighborhood ahead of a rebuild. Drivers call this, then
    /// feed every index hit through [`Agent::insert_neighbor`].
    pub fn clear_neighbors(&mut self) {
        self.neighbors.clear();
    }

    /// Bounded nearest-by-surface insertion.
    ///
    /// `range_sq` starts at `neighbor_dist²`; once the neighborhood is full
    /// it tightens to the worst kept key, so later, farther candidates are
    /// rejected cheaply.
    pub fn insert_neighbor(&mut self, dist_sq: f32, id: NeighborId, range_sq: &mut f32) {
        if dist_sq >= *range_sq {
            return;
        }
        if self.neighbors.len() == self.max_neighbors {
            self.neighbors.pop();
        }
        let at = self
            .neighbors
            .partition_point(|&(d, n)| (d, n) < (dist_sq, id));
        self.neighbors.insert(at, (dist_sq, id));
        if self.neighbors.len() == self.max_neighbors {
            *range_sq = self.neighbors[self.neighbors.len() - 1].0;
        }
    }

    /// The velocity the agent would take absent any neighbors.
    ///
    /// When the active goal tapers and one tick at `pref_speed` would
    /// overshoot it, aim for exact arrival instead.
    pub fn compute_preferred_velocity(&mut self, dt: f32) {
        let Some(goal) = self.plan.get(self.cur_goal) else {
            self.pref_velocity = Vec2::ZERO;
            return;
        };
        let (dest, taper) = (goal.dest(self.position), goal.should_taper());

        let to_goal = dest - self.position;
        let dist_sq = to_goal.length_squared();

        if taper && sqr(self.pref_speed * dt) > dist_sq {
            self.pref_velocity = to_goal / dt;
        } else if dist_sq <= f32::EPSILON {
            self.pref_velocity = Vec2::ZERO;
        } else {
            self.pref_velocity = to_goal * (self.pref_speed / dist_sq.sqrt());
        }
    }

    /// Integrate one tick: blend toward `new_velocity` under the
    /// acceleration limit, move, and advance the plan past any goal the new
    /// position satisfies.
    ///
    /// Returns `true` once the plan is exhausted (trivially so for an empty
    /// plan).
    pub fn update(&mut self, dt: f32) -> bool {
        let dv = (self.new_velocity - self.velocity).length();
        let max_dv = self.max_accel * dt;
        if !max_dv.is_finite() || dv <= max_dv {
            self.velocity = self.new_velocity;
        } else {
            let blend = max_dv / dv;
            self.velocity = self.velocity * (1.0 - blend) + self.new_velocity * blend;
        }
        self.position = self.position + self.velocity * dt;

        let passed = match self.plan.get(self.cur_goal) {
            Some(goal) => goal.is_passed(self.position),
            None => return true,
        };
        if passed {
            if self.index_in_plan < self.plan.len() {
                self.cur_goal = self.index_in_plan;
                self.index_in_plan += 1;
            } else {
                return true;
            }
        }
        false
    }
}
