use strider_nav::{closest_point_on_segment, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A static obstacle owned by the simulation.
///
/// Agents are circles as well but carry kinematic state of their own; the
/// solver sees both through [`crate::vo::NeighborKind`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Obstacle {
    Circle { center: Vec2, radius: f32 },
    Convex(ConvexObstacle),
}

impl Obstacle {
    pub fn position(&self) -> Vec2 {
        match self {
            Obstacle::Circle { center, .. } => *center,
            Obstacle::Convex(hull) => hull.centroid(),
        }
    }

    /// Squared distance from `p` to the nearest point on the surface, zero
    /// when `p` is inside.
    pub fn dist_sq_to_surface(&self, p: Vec2) -> f32 {
        match self {
            Obstacle::Circle { center, radius } => circle_surface_dist_sq(*center, *radius, p),
            Obstacle::Convex(hull) => hull.dist_sq_to_surface(p),
        }
    }

    /// Radius of a circle around [`Self::position`] covering the whole
    /// obstacle; used by the spatial index for superset queries.
    pub(crate) fn bound_radius(&self) -> f32 {
        match self {
            Obstacle::Circle { radius, .. } => *radius,
            Obstacle::Convex(hull) => {
                let c = hull.centroid();
                hull.verts
                    .iter()
                    .map(|&v| c.distance(v))
                    .fold(0.0_f32, f32::max)
            }
        }
    }
}

pub(crate) fn circle_surface_dist_sq(center: Vec2, radius: f32, p: Vec2) -> f32 {
    let d = p.distance(center) - radius;
    if d > 0.0 {
        d * d
    } else {
        0.0
    }
}

/// A convex polygon with vertices in counterclockwise order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConvexObstacle {
    verts: Vec<Vec2>,
}

impl ConvexObstacle {
    /// The vertices must form a convex polygon in counterclockwise order.
    pub fn new(verts: Vec<Vec2>) -> Self {
        debug_assert!(verts.len() >= 3);
        debug_assert!(
            verts.iter().enumerate().all(|(i, &a)| {
                let b = verts[(i + 1) % verts.len()];
                let c = verts[(i + 2) % verts.len()];
                (b - a).det(c - b) >= 0.0
            }),
            "vertices are not convex counterclockwise"
        );
        Self { verts }
    }

    pub fn verts(&self) -> &[Vec2] {
        &self.verts
    }

    pub fn centroid(&self) -> Vec2 {
        let sum = self
            .verts
            .iter()
            .fold(Vec2::ZERO, |acc, &v| acc + v);
        sum / self.verts.len() as f32
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.verts.iter().enumerate().all(|(i, &a)| {
            let b = self.verts[(i + 1) % self.verts.len()];
            (b - a).det(p - a) >= 0.0
        })
    }

    pub fn dist_sq_to_surface(&self, p: Vec2) -> f32 {
        if self.contains(p) {
            return 0.0;
        }
        let mut best = f32::INFINITY;
        for (i, &a) in self.verts.iter().enumerate() {
            let b = self.verts[(i + 1) % self.verts.len()];
            let q = closest_point_on_segment(p, a, b);
            best = best.min(p.distance_squared(q));
        }
        best
    }

    /// The two silhouette points of the polygon as seen from `p`, inflated
    /// by `clearance`, and whether `p` is outside the inflated obstacle.
    ///
    /// The first point is the clockwise-most tangent: for a proper external
    /// silhouette `det(p1 - p, p2 - p) > 0`. Each tangent point is pushed
    /// outward perpendicular to its sight line so the span also clears a
    /// disk of radius `clearance` around the viewer's path.
    pub fn spanning_points(&self, p: Vec2, clearance: f32) -> (Vec2, Vec2, bool) {
        let mut t1 = self.verts[0];
        let mut t2 = self.verts[0];
        for &v in &self.verts[1..] {
            if (v - p).det(t1 - p) > 0.0 {
                t1 = v;
            }
            if (v - p).det(t2 - p) < 0.0 {
                t2 = v;
            }
        }

        let outside = self.dist_sq_to_surface(p) > clearance * clearance;

        let mut p1 = t1;
        let mut p2 = t2;
        let d1 = t1 - p;
        if d1.length_squared() > f32::EPSILON {
            let dir = d1.normalize();
            // Clockwise perpendicular: away from the polygon, which lies
            // counterclockwise of the sight line to the clockwise tangent.
            p1 = t1 + Vec2::new(dir.y, -dir.x) * clearance;
        }
        let d2 = t2 - p;
        if d2.length_squared() > f32::EPSILON {
            let dir = d2.normalize();
            p2 = t2 + Vec2::new(-dir.y, dir.x) * clearance;
        }

        (p1, p2, outside)
    }
}
