use strider_nav::{normal, sqr, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::obstacle::ConvexObstacle;

/// A truncated cone in velocity space: any velocity strictly between the two
/// rays from `apex` leads to a collision with the neighbor it was built for.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VelocityObstacle {
    pub apex: Vec2,
    pub side1: Vec2,
    pub side2: Vec2,
}

impl VelocityObstacle {
    /// Strict interior test; points on either ray count as outside.
    pub fn contains(&self, v: Vec2) -> bool {
        self.side2.det(v - self.apex) < 0.0 && self.side1.det(v - self.apex) > 0.0
    }
}

/// Per-tick record of the velocity-obstacle set and the selected velocity
/// for one observed agent.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoDump {
    pub vos: Vec<VelocityObstacle>,
    pub selected: Vec2,
}

/// One neighbor as the solver sees it; the three shapes select the three
/// construction rules.
#[derive(Debug, Clone, Copy)]
pub enum NeighborKind<'a> {
    MobileCircle {
        center: Vec2,
        radius: f32,
        velocity: Vec2,
        pref_velocity: Vec2,
    },
    StaticCircle {
        center: Vec2,
        radius: f32,
    },
    Convex(&'a ConvexObstacle),
}

/// Kinematic state of the agent whose velocity-obstacle set is being built.
#[derive(Debug, Clone, Copy)]
pub struct AgentSnapshot {
    pub position: Vec2,
    pub radius: f32,
    pub velocity: Vec2,
    pub pref_velocity: Vec2,
}

/// Build the velocity-obstacle set for `agent` from its neighbors.
///
/// Degenerate constructions (coincident centers, collapsed silhouettes) are
/// dropped rather than aborting the tick.
pub fn build_velocity_obstacles<'a>(
    agent: AgentSnapshot,
    neighbors: impl Iterator<Item = NeighborKind<'a>>,
    out: &mut Vec<VelocityObstacle>,
) {
    out.clear();
    for neighbor in neighbors {
        let vo = match neighbor {
            NeighborKind::MobileCircle {
                center,
                radius,
                velocity,
                pref_velocity,
            } => circle_vo(agent, center, radius, Some((velocity, pref_velocity))),
            NeighborKind::StaticCircle { center, radius } => circle_vo(agent, center, radius, None),
            NeighborKind::Convex(hull) => convex_vo(agent, hull),
        };
        if let Some(vo) = vo {
            out.push(vo);
        }
    }
}

/// Cone for a circular neighbor. `mobile` carries the neighbor's current and
/// preferred velocities when it takes part in reciprocal avoidance.
fn circle_vo(
    agent: AgentSnapshot,
    center: Vec2,
    radius: f32,
    mobile: Option<(Vec2, Vec2)>,
) -> Option<VelocityObstacle> {
    let to_other = center - agent.position;
    let dist_sq = to_other.length_squared();
    let combined = radius + agent.radius;

    if dist_sq > sqr(combined) {
        // Disjoint circles: the cone spanned by the two tangents.
        let angle = to_other.angle();
        let opening = (combined / dist_sq.sqrt()).asin();
        let side1 = Vec2::new((angle - opening).cos(), (angle - opening).sin());
        let side2 = Vec2::new((angle + opening).cos(), (angle + opening).sin());

        let apex = match mobile {
            Some((velocity, pref_velocity)) => {
                // Hybrid-reciprocal apex: whichever agent is on the passing
                // side of its counterpart cedes the larger share, so the
                // pair never mirrors each other's dodge.
                let d = 2.0 * opening.sin() * opening.cos();
                if to_other.det(agent.pref_velocity - pref_velocity) > 0.0 {
                    let s = 0.5 * (agent.velocity - velocity).det(side2) / d;
                    velocity + side1 * s
                } else {
                    let s = 0.5 * (agent.velocity - velocity).det(side1) / d;
                    velocity + side2 * s
                }
            }
            None => Vec2::ZERO,
        };

        Some(VelocityObstacle { apex, side1, side2 })
    } else {
        // Overlapping: a half-plane forbidding any motion with a positive
        // component toward the neighbor.
        if dist_sq <= f32::EPSILON {
            return None;
        }
        let side1 = normal(agent.position, center);
        let apex = match mobile {
            Some((velocity, _)) => (velocity + agent.velocity) * 0.5,
            None => Vec2::ZERO,
        };
        Some(VelocityObstacle {
            apex,
            side1,
            side2: -side1,
        })
    }
}

/// Cone for a convex obstacle, spanned by its silhouette as seen from the
/// agent with its radius as clearance.
fn convex_vo(agent: AgentSnapshot, hull: &ConvexObstacle) -> Option<VelocityObstacle> {
    let (p1, p2, outside) = hull.spanning_points(agent.position, agent.radius);
    let d1 = p1 - agent.position;
    let d2 = p2 - agent.position;
    if d1.length_squared() <= f32::EPSILON || d2.length_squared() <= f32::EPSILON {
        return None;
    }
    let side1 = d1.normalize();
    let side2 = d2.normalize();
    if outside && side1.det(side2) < 0.0 {
        // Collapsed silhouette: the obstacle is seen from behind itself.
        return None;
    }
    // Inside the inflated hull the silhouette sides are kept as-is; the
    // overlap rules of the circle case do not apply here.
    Some(VelocityObstacle {
        apex: Vec2::ZERO,
        side1,
        side2,
    })
}

const NO_VO: usize = usize::MAX;

struct Search<'a> {
    pref: Vec2,
    vos: &'a [VelocityObstacle],
    best: Vec2,
    best_score: f32,
}

impl Search<'_> {
    /// Score the candidate and keep it when it beats the best so far and no
    /// velocity obstacle other than the two it was derived from contains it.
    ///
    /// The exemption matters: a candidate sitting exactly on a ray of its
    /// own obstacle may test as interior under floating-point noise.
    fn consider(&mut self, v: Vec2, vo1: usize, vo2: usize) {
        let score = (self.pref - v).length_squared();
        if score >= self.best_score {
            return;
        }
        for (k, vo) in self.vos.iter().enumerate() {
            if k != vo1 && k != vo2 && vo.contains(v) {
                return;
            }
        }
        self.best = v;
        self.best_score = score;
    }
}

/// Choose the feasible velocity closest to `pref` within the `max_speed`
/// disk, or zero when every candidate is blocked.
///
/// The optimum must lie on the boundary of the feasible region, so a finite
/// candidate set suffices: the (capped) preferred velocity, its feet on
/// every obstacle ray, ray intersections with the speed circle, and
/// pairwise ray intersections.
pub fn choose_velocity(pref: Vec2, max_speed: f32, vos: &[VelocityObstacle]) -> Vec2 {
    let mut search = Search {
        pref,
        vos,
        best: Vec2::ZERO,
        best_score: f32::INFINITY,
    };

    let anchor = if pref.length_squared() < sqr(max_speed) || pref.length_squared() <= f32::EPSILON
    {
        pref
    } else {
        pref.normalize() * max_speed
    };
    search.consider(anchor, NO_VO, NO_VO);

    // Feet of the preferred velocity on each ray.
    for (i, vo) in vos.iter().enumerate() {
        let rel = pref - vo.apex;

        let along1 = rel.dot(vo.side1);
        if along1 > 0.0 && vo.side1.det(rel) > 0.0 {
            let v = vo.apex + vo.side1 * along1;
            if v.length_squared() < sqr(max_speed) {
                search.consider(v, i, i);
            }
        }

        let along2 = rel.dot(vo.side2);
        if along2 > 0.0 && vo.side2.det(rel) < 0.0 {
            let v = vo.apex + vo.side2 * along2;
            if v.length_squared() < sqr(max_speed) {
                search.consider(v, i, i);
            }
        }
    }

    // Ray intersections with the maximum-speed circle.
    for (j, vo) in vos.iter().enumerate() {
        for side in [vo.side1, vo.side2] {
            let disc = sqr(max_speed) - sqr(vo.apex.det(side));
            if disc <= 0.0 {
                continue;
            }
            let mid = -vo.apex.dot(side);
            let root = disc.sqrt();
            for t in [mid + root, mid - root] {
                if t >= 0.0 {
                    search.consider(vo.apex + side * t, NO_VO, j);
                }
            }
        }
    }

    // Pairwise ray intersections over unordered obstacle pairs; the four
    // side combinations cover both orientations.
    for i in 0..vos.len() {
        for j in (i + 1)..vos.len() {
            let apex_delta = vos[j].apex - vos[i].apex;
            for side_i in [vos[i].side1, vos[i].side2] {
                for side_j in [vos[j].side1, vos[j].side2] {
                    let d = side_i.det(side_j);
                    if d == 0.0 {
                        continue; // parallel rays
                    }
                    let s = apex_delta.det(side_j) / d;
                    let t = apex_delta.det(side_i) / d;
                    if s >= 0.0 && t >= 0.0 {
                        let v = vos[i].apex + side_i * s;
                        if v.length_squared() < sqr(max_speed) {
                            search.consider(v, i, j);
                        }
                    }
                }
            }
        }
    }

    if search.best_score.is_finite() {
        search.best
    } else {
        Vec2::ZERO
    }
}
