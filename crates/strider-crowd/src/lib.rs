//! Deterministic multi-agent crowd simulation: reciprocal velocity obstacles
//! over heterogeneous neighbors, plan following, and a tick driver.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod goal;
pub mod obstacle;
pub mod sim;
pub mod spatial;
pub mod vo;

pub use agent::Agent;
pub use goal::{GateGoal, GoalSegment, Plan, PointGoal, SubGoalMaker};
pub use obstacle::{ConvexObstacle, Obstacle};
pub use sim::{SimConfig, Simulation};
pub use spatial::{GridIndex, NeighborId, SpatialIndex};
pub use vo::{
    build_velocity_obstacles, choose_velocity, AgentSnapshot, NeighborKind, VelocityObstacle,
    VoDump,
};
