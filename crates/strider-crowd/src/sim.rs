use strider_nav::{sqr, Vec2};

use crate::agent::Agent;
use crate::obstacle::{circle_surface_dist_sq, Obstacle};
use crate::spatial::{GridIndex, NeighborId, SpatialIndex};
use crate::vo::{
    build_velocity_obstacles, choose_velocity, AgentSnapshot, NeighborKind, VelocityObstacle,
    VoDump,
};

/// Tuning knobs for the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Bucket size of the per-tick spatial index.
    pub cell_size: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { cell_size: 4.0 }
    }
}

/// The tick driver: owns agents and obstacles and runs the simulation
/// phases in order.
///
/// Phases 1-3 (neighborhoods, preferred velocities, velocity selection)
/// read the pre-tick state of every agent; new velocities are collected in
/// a scratch buffer and applied together, so phase 4 (integration) never
/// observes a half-updated tick.
pub struct Simulation {
    config: SimConfig,
    agents: Vec<Agent>,
    obstacles: Vec<Obstacle>,
    index: GridIndex,
    debug_agent: Option<usize>,
    dump: Option<VoDump>,
    query_buf: Vec<NeighborId>,
    vo_buf: Vec<VelocityObstacle>,
    new_velocities: Vec<Vec2>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            agents: Vec::new(),
            obstacles: Vec::new(),
            index: GridIndex::new(config.cell_size),
            debug_agent: None,
            dump: None,
            query_buf: Vec::new(),
            vo_buf: Vec::new(),
            new_velocities: Vec::new(),
        }
    }

    pub fn config(&self) -> SimConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SimConfig) {
        self.config = config;
        self.index = GridIndex::new(config.cell_size);
    }

    pub fn add_agent(&mut self, agent: Agent) -> usize {
        self.agents.push(agent);
        self.agents.len() - 1
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> usize {
        self.obstacles.push(obstacle);
        self.obstacles.len() - 1
    }

    pub fn clear_obstacles(&mut self) {
        self.obstacles.clear();
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent_mut(&mut self, index: usize) -> &mut Agent {
        &mut self.agents[index]
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Record the velocity-obstacle set and selection of one agent per tick.
    pub fn set_debug_agent(&mut self, agent: Option<usize>) {
        self.debug_agent = agent;
        self.dump = None;
    }

    /// The dump captured on the most recent tick, if a debug agent is set.
    pub fn last_dump(&self) -> Option<&VoDump> {
        self.dump.as_ref()
    }

    /// Advance one tick.
    ///
    /// With `do_update` false the tick stops after velocity selection:
    /// neighborhoods, preferred velocities and `new_velocity` are fresh but
    /// nothing moves. Returns whether every agent has reached the end of
    /// its plan (always `false` without the update phase).
    pub fn do_step(&mut self, dt: f32, do_update: bool) -> bool {
        self.rebuild_index();
        self.compute_neighbors();
        for agent in &mut self.agents {
            agent.compute_preferred_velocity(dt);
        }
        self.compute_new_velocities();

        if !do_update {
            return false;
        }

        let mut all_reached = true;
        for agent in &mut self.agents {
            all_reached &= agent.update(dt);
        }
        tracing::trace!(
            agents = self.agents.len(),
            dt,
            all_reached,
            "crowd step"
        );
        all_reached
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, agent) in self.agents.iter().enumerate() {
            self.index
                .insert(NeighborId::Agent(i), agent.position, agent.radius);
        }
        for (k, obstacle) in self.obstacles.iter().enumerate() {
            self.index.insert(
                NeighborId::Obstacle(k),
                obstacle.position(),
                obstacle.bound_radius(),
            );
        }
    }

    /// Phase 1: rebuild each agent's bounded nearest-neighbor set from the
    /// spatial index, filtered by exact surface distance.
    fn compute_neighbors(&mut self) {
        let Self {
            agents,
            obstacles,
            index,
            query_buf,
            ..
        } = self;

        for i in 0..agents.len() {
            let position = agents[i].position;
            let neighbor_dist = agents[i].neighbor_dist;

            query_buf.clear();
            index.query(position, neighbor_dist, &mut |id| query_buf.push(id));

            agents[i].clear_neighbors();
            let mut range_sq = sqr(neighbor_dist);
            for k in 0..query_buf.len() {
                let id = query_buf[k];
                if id == NeighborId::Agent(i) {
                    continue;
                }
                let dist_sq = match id {
                    NeighborId::Agent(j) => {
                        circle_surface_dist_sq(agents[j].position, agents[j].radius, position)
                    }
                    NeighborId::Obstacle(o) => obstacles[o].dist_sq_to_surface(position),
                };
                agents[i].insert_neighbor(dist_sq, id, &mut range_sq);
            }
        }
    }

    /// Phase 3: build each agent's velocity-obstacle set and search it for
    /// the velocity closest to the preferred one. Results go to a scratch
    /// buffer first so every agent sees the same pre-tick state.
    fn compute_new_velocities(&mut self) {
        let Self {
            agents,
            obstacles,
            vo_buf,
            new_velocities,
            debug_agent,
            dump,
            ..
        } = self;

        new_velocities.clear();
        new_velocities.resize(agents.len(), Vec2::ZERO);

        for i in 0..agents.len() {
            let agent = &agents[i];
            let snapshot = AgentSnapshot {
                position: agent.position,
                radius: agent.radius,
                velocity: agent.velocity,
                pref_velocity: agent.pref_velocity,
            };
            build_velocity_obstacles(
                snapshot,
                agent
                    .neighbors()
                    .iter()
                    .map(|&(_, id)| resolve(agents, obstacles, id)),
                vo_buf,
            );
            let selected = choose_velocity(agent.pref_velocity, agent.max_speed, vo_buf);

            if *debug_agent == Some(i) {
                *dump = Some(VoDump {
                    vos: vo_buf.clone(),
                    selected,
                });
            }
            new_velocities[i] = selected;
        }

        for (agent, v) in agents.iter_mut().zip(new_velocities.iter().copied()) {
            agent.new_velocity = v;
        }
    }
}

fn resolve<'a>(agents: &'a [Agent], obstacles: &'a [Obstacle], id: NeighborId) -> NeighborKind<'a> {
    match id {
        NeighborId::Agent(j) => {
            let other = &agents[j];
            if other.is_mobile {
                NeighborKind::MobileCircle {
                    center: other.position,
                    radius: other.radius,
                    velocity: other.velocity,
                    pref_velocity: other.pref_velocity,
                }
            } else {
                NeighborKind::StaticCircle {
                    center: other.position,
                    radius: other.radius,
                }
            }
        }
        NeighborId::Obstacle(k) => match &obstacles[k] {
            Obstacle::Circle { center, radius } => NeighborKind::StaticCircle {
                center: *center,
                radius: *radius,
            },
            Obstacle::Convex(hull) => NeighborKind::Convex(hull),
        },
    }
}
