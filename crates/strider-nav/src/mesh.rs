use core::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use thiserror::Error;

use crate::math::{project, tri_area2, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fatal mesh construction failures.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("triangle {0} is not clockwise")]
    NotClockwise(usize),
    #[error("triangle {tri} references vertex {vertex} out of range")]
    InvalidVertex { tri: usize, vertex: usize },
    #[error("duplicate half-edge orientation {from} -> {to}")]
    DuplicateEdge { from: usize, to: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub p: Vec2,
}

#[derive(Debug, Clone)]
pub struct Triangle {
    /// Vertex indices in clockwise order.
    pub v: [usize; 3],
    /// `h[i]` is the half-edge from `v[i]` to `v[(i + 1) % 3]`.
    pub h: [usize; 3],
    /// `nei[i]` is the triangle across `h[i]`, if any.
    pub nei: [Option<usize>; 3],
}

/// One directed representative of an edge. All links are indices into the
/// owning mesh's arenas.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    pub from: usize,
    pub to: usize,
    pub tri: usize,
    pub next: usize,
    pub opposite: Option<usize>,
    /// Edge midpoint. Temporarily replaced by endpoint projections while a
    /// corridor search runs and restored before it returns.
    pub mid: Vec2,
    cost_so_far: f32,
    came_from: Came,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Came {
    None,
    /// Entered the search as a seed next to the end triangle.
    Seed,
    Edge(usize),
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    prio: f32,
    cost: f32,
    edge: usize,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap behave like a min-heap.
        other
            .prio
            .total_cmp(&self.prio)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A triangulated planar subdivision with half-edge connectivity.
///
/// Triangles must be wound clockwise. Interior edges carry exactly one pair
/// of mutually-opposite half-edges; boundary edges have no opposite. The
/// topology is immutable after construction; corridor searches only touch
/// per-half-edge scratch state.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
    half_edges: Vec<HalfEdge>,
}

impl Mesh {
    pub fn new(points: Vec<Vec2>, tris: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        let vertices: Vec<Vertex> = points.into_iter().map(|p| Vertex { p }).collect();

        let mut triangles = Vec::with_capacity(tris.len());
        for (idx, v) in tris.iter().enumerate() {
            for &vi in v {
                if vi >= vertices.len() {
                    return Err(MeshError::InvalidVertex { tri: idx, vertex: vi });
                }
            }
            let [a, b, c] = v.map(|i| vertices[i].p);
            if tri_area2(a, b, c) >= 0.0 {
                return Err(MeshError::NotClockwise(idx));
            }
            triangles.push(Triangle {
                v: *v,
                h: [0; 3],
                nei: [None; 3],
            });
        }

        let mut mesh = Self {
            vertices,
            triangles,
            half_edges: Vec::new(),
        };
        mesh.connect_tris()?;
        Ok(mesh)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn half_edges(&self) -> &[HalfEdge] {
        &self.half_edges
    }

    /// Create the half-edges of every triangle and pair up opposites.
    ///
    /// Pairing is keyed by the ordered `(from, to)` vertex pair: the opposite
    /// of an edge is the one traversing the same vertices in reverse. Seeing
    /// the same orientation twice means a neighboring triangle is wound the
    /// wrong way.
    fn connect_tris(&mut self) -> Result<(), MeshError> {
        self.half_edges.clear();
        let mut unpaired: BTreeMap<(usize, usize), usize> = BTreeMap::new();

        for t in 0..self.triangles.len() {
            let base = self.half_edges.len();
            let v = self.triangles[t].v;
            for i in 0..3 {
                let from = v[i];
                let to = v[(i + 1) % 3];
                let h = base + i;
                self.half_edges.push(HalfEdge {
                    from,
                    to,
                    tri: t,
                    next: base + (i + 1) % 3,
                    opposite: None,
                    mid: (self.vertices[from].p + self.vertices[to].p) * 0.5,
                    cost_so_far: f32::INFINITY,
                    came_from: Came::None,
                });
                self.triangles[t].h[i] = h;

                if let Some(p) = unpaired.remove(&(to, from)) {
                    self.half_edges[p].opposite = Some(h);
                    self.half_edges[h].opposite = Some(p);
                }
                if unpaired.insert((from, to), h).is_some() {
                    return Err(MeshError::DuplicateEdge { from, to });
                }
            }
        }

        for t in 0..self.triangles.len() {
            for i in 0..3 {
                let h = self.triangles[t].h[i];
                self.triangles[t].nei[i] =
                    self.half_edges[h].opposite.map(|o| self.half_edges[o].tri);
            }
        }
        Ok(())
    }

    /// Linear-scan point location.
    pub fn find_containing(&self, p: Vec2) -> Option<usize> {
        (0..self.triangles.len()).find(|&t| self.point_in_tri(p, t))
    }

    fn point_in_tri(&self, p: Vec2, t: usize) -> bool {
        let [a, b, c] = self.triangles[t].v.map(|i| self.vertices[i].p);
        let b1 = (p - b).det(a - b) < 0.0;
        let b2 = (p - c).det(b - c) < 0.0;
        let b3 = (p - a).det(c - a) < 0.0;
        b1 == b2 && b2 == b3
    }

    /// Search the half-edge graph for a corridor of triangles from
    /// `start_tri` to `end_tri`, both inclusive.
    ///
    /// The search runs backwards: it seeds the half-edges entering the end
    /// triangle and treats the start triangle's own half-edges as goals, so
    /// walking the `came_from` chain yields the corridor in forward order.
    /// Half-edge midpoints at both endpoints are pulled onto the projections
    /// of the actual start/end positions for the duration of the search so
    /// edge-to-edge distances approximate the real path length.
    ///
    /// Returns `false` when both triangles coincide or no route exists.
    pub fn astar_corridor(
        &mut self,
        start: Vec2,
        end: Vec2,
        start_tri: usize,
        end_tri: usize,
        corridor: &mut Vec<usize>,
    ) -> bool {
        corridor.clear();
        if start_tri == end_tri {
            return false;
        }

        for h in &mut self.half_edges {
            h.cost_so_far = f32::INFINITY;
            h.came_from = Came::None;
        }

        // Original midpoints of every edge we touch, restored on return.
        let mut touched: Vec<(usize, Vec2)> = Vec::with_capacity(12);
        let mut queue: BinaryHeap<OpenNode> = BinaryHeap::new();
        let dest_edges = self.triangles[start_tri].h;
        let mut dest_cost = [f32::INFINITY; 3];

        for sh in dest_edges {
            let mid = self.project_onto_edge(start, sh);
            touched.push((sh, self.half_edges[sh].mid));
            self.half_edges[sh].mid = mid;
            if let Some(op) = self.half_edges[sh].opposite {
                touched.push((op, self.half_edges[op].mid));
                self.half_edges[op].mid = mid;
            }
        }
        for eh in self.triangles[end_tri].h {
            let Some(h) = self.half_edges[eh].opposite else {
                continue;
            };
            let mid = self.project_onto_edge(end, h);
            touched.push((h, self.half_edges[h].mid));
            self.half_edges[h].mid = mid;
            touched.push((eh, self.half_edges[eh].mid));
            self.half_edges[eh].mid = mid;

            let cost = end.distance(mid);
            self.half_edges[h].cost_so_far = cost;
            self.half_edges[h].came_from = Came::Seed;
            queue.push(OpenNode {
                prio: cost + mid.distance(start),
                cost,
                edge: h,
            });
        }

        let mut reached = 0usize;
        while let Some(OpenNode { prio, cost, edge }) = queue.pop() {
            if cost > self.half_edges[edge].cost_so_far {
                continue; // stale entry, a cheaper one was processed already
            }

            if let Some(d) = dest_edges.iter().position(|&e| e == edge) {
                if dest_cost[d].is_infinite() {
                    dest_cost[d] = prio;
                    reached += 1;
                    if reached == dest_edges.len() {
                        break;
                    }
                }
                continue; // keep searching for the remaining goal edges
            }

            let next = self.half_edges[edge].next;
            let next2 = self.half_edges[next].next;
            let successors = [self.half_edges[next].opposite, self.half_edges[next2].opposite];
            for n in successors.into_iter().flatten() {
                let cost_to_n = self.half_edges[edge].cost_so_far
                    + self.half_edges[edge].mid.distance(self.half_edges[n].mid);
                if cost_to_n >= self.half_edges[n].cost_so_far {
                    continue;
                }
                self.half_edges[n].cost_so_far = cost_to_n;
                self.half_edges[n].came_from = Came::Edge(edge);
                queue.push(OpenNode {
                    prio: cost_to_n + self.half_edges[n].mid.distance(start),
                    cost: cost_to_n,
                    edge: n,
                });
            }
        }

        for &(h, mid) in touched.iter().rev() {
            self.half_edges[h].mid = mid;
        }

        if reached == 0 {
            tracing::debug!(start_tri, end_tri, "corridor search found no route");
            return false;
        }

        let mut best = 0;
        for d in 1..3 {
            if dest_cost[d] < dest_cost[best] {
                best = d;
            }
        }
        let mut h = dest_edges[best];
        loop {
            corridor.push(self.half_edges[h].tri);
            let Came::Edge(prev) = self.half_edges[h].came_from else {
                break;
            };
            h = prev;
        }
        corridor.push(end_tri);
        true
    }

    fn project_onto_edge(&self, p: Vec2, h: usize) -> Vec2 {
        let e = &self.half_edges[h];
        project(p, self.vertices[e.from].p, self.vertices[e.to].p)
    }

    /// Shared half-edge of `a` facing `b`, as `(left, right)` vertex
    /// positions seen when crossing from `a` into `b`.
    fn portal(&self, a: usize, b: usize) -> Option<(Vec2, Vec2)> {
        for i in 0..3 {
            if self.triangles[a].nei[i] == Some(b) {
                let h = &self.half_edges[self.triangles[a].h[i]];
                return Some((self.vertices[h.from].p, self.vertices[h.to].p));
            }
        }
        None
    }

    /// Pull the shortest polyline through a corridor of adjacent triangles.
    ///
    /// Returns `false` (leaving `out` empty) if consecutive corridor entries
    /// are not neighbors.
    pub fn make_path(&self, corridor: &[usize], start: Vec2, end: Vec2, out: &mut Vec<Vec2>) -> bool {
        out.clear();

        let mut left = Vec::with_capacity(corridor.len() + 1);
        let mut right = Vec::with_capacity(corridor.len() + 1);
        left.push(start);
        right.push(start);
        for w in corridor.windows(2) {
            let Some((l, r)) = self.portal(w[0], w[1]) else {
                return false;
            };
            left.push(l);
            right.push(r);
        }
        left.push(end);
        right.push(end);

        string_pull(&left, &right, out);
        true
    }

    /// Locate both endpoints and produce the pulled path between them.
    ///
    /// When both points share a triangle the path is the straight segment.
    pub fn find_path(&mut self, start: Vec2, end: Vec2, out: &mut Vec<Vec2>) -> bool {
        out.clear();
        let (Some(start_tri), Some(end_tri)) =
            (self.find_containing(start), self.find_containing(end))
        else {
            return false;
        };
        if start_tri == end_tri {
            out.push(start);
            out.push(end);
            return true;
        }
        let mut corridor = Vec::new();
        if !self.astar_corridor(start, end, start_tri, end_tri, &mut corridor) {
            return false;
        }
        self.make_path(&corridor, start, end, out)
    }
}

fn vequal(a: Vec2, b: Vec2) -> bool {
    a.distance_squared(b) < 1e-6
}

/// Funnel string-pulling over `(left, right)` portal sequences whose first
/// and last entries are the doubled start and end points.
fn string_pull(left: &[Vec2], right: &[Vec2], out: &mut Vec<Vec2>) {
    out.clear();

    let mut apex = left[0];
    let mut portal_left = left[0];
    let mut portal_right = right[0];
    let mut left_index = 0usize;
    let mut right_index = 0usize;

    out.push(apex);

    let mut i = 1;
    while i < right.len() {
        let (l, r) = (left[i], right[i]);

        // Advance the right side.
        if tri_area2(apex, portal_right, r) >= 0.0 {
            if vequal(apex, portal_right) || tri_area2(apex, portal_left, r) < 0.0 {
                // Tighten the funnel.
                portal_right = r;
                right_index = i;
            } else {
                // Right crossed over left: the left vertex becomes a corner,
                // then the scan restarts from it.
                out.push(portal_left);
                apex = portal_left;
                portal_left = apex;
                portal_right = apex;
                right_index = left_index;
                i = left_index + 1;
                continue;
            }
        }

        // Advance the left side.
        if tri_area2(apex, portal_left, l) <= 0.0 {
            if vequal(apex, portal_left) || tri_area2(apex, portal_right, l) > 0.0 {
                portal_left = l;
                left_index = i;
            } else {
                out.push(portal_right);
                apex = portal_right;
                portal_left = apex;
                portal_right = apex;
                left_index = right_index;
                i = right_index + 1;
                continue;
            }
        }

        i += 1;
    }

    let end = right[right.len() - 1];
    if out.last().map_or(true, |&p| !vequal(p, end)) {
        out.push(end);
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct MeshSerde {
    vertices: Vec<Vec2>,
    triangles: Vec<[usize; 3]>,
}

#[cfg(feature = "serde")]
impl Serialize for Mesh {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        MeshSerde {
            vertices: self.vertices.iter().map(|v| v.p).collect(),
            triangles: self.triangles.iter().map(|t| t.v).collect(),
        }
        .serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Mesh {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = MeshSerde::deserialize(deserializer)?;
        Mesh::new(data.vertices, data.triangles).map_err(serde::de::Error::custom)
    }
}
