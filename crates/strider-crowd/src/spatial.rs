use std::collections::BTreeMap;

use strider_nav::{sqr, Vec2};

/// Identifies one object owned by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NeighborId {
    Agent(usize),
    Obstacle(usize),
}

/// Radius query over the simulation's objects.
///
/// `query` must invoke `visit` at least once for every object whose surface
/// lies within `radius` of `center`. Over-reporting is allowed (callers
/// filter by exact surface distance); no ordering is guaranteed.
pub trait SpatialIndex {
    fn query(&self, center: Vec2, radius: f32, visit: &mut dyn FnMut(NeighborId));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Cell(i32, i32);

fn cell_for(p: Vec2, cell_size: f32) -> Cell {
    let cs = cell_size.max(1e-6);
    Cell((p.x / cs).floor() as i32, (p.y / cs).floor() as i32)
}

/// Uniform bucket index, rebuilt once per tick.
///
/// Entries carry a bounding radius; a query sweeps the cell range expanded
/// by the largest bound seen, so the result is a superset of every object
/// whose surface could fall inside the query radius.
#[derive(Debug)]
pub struct GridIndex {
    cell_size: f32,
    max_bound: f32,
    entries: Vec<(NeighborId, Vec2, f32)>,
    buckets: BTreeMap<Cell, Vec<usize>>,
}

impl GridIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1e-3),
            max_bound: 0.0,
            entries: Vec::new(),
            buckets: BTreeMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.max_bound = 0.0;
        self.entries.clear();
        self.buckets.clear();
    }

    pub fn insert(&mut self, id: NeighborId, center: Vec2, bound_radius: f32) {
        let idx = self.entries.len();
        self.entries.push((id, center, bound_radius));
        self.max_bound = self.max_bound.max(bound_radius);
        self.buckets
            .entry(cell_for(center, self.cell_size))
            .or_default()
            .push(idx);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SpatialIndex for GridIndex {
    fn query(&self, center: Vec2, radius: f32, visit: &mut dyn FnMut(NeighborId)) {
        let reach = radius + self.max_bound;
        let r_cells = (reach / self.cell_size).ceil() as i32 + 1;
        let c = cell_for(center, self.cell_size);
        for dy in -r_cells..=r_cells {
            for dx in -r_cells..=r_cells {
                let Some(bucket) = self.buckets.get(&Cell(c.0 + dx, c.1 + dy)) else {
                    continue;
                };
                for &i in bucket {
                    let (id, p, bound) = self.entries[i];
                    // Center-distance cut: a superset of surface-in-radius.
                    if p.distance_squared(center) < sqr(radius + bound) {
                        visit(id);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_reports_every_object_with_surface_in_radius() {
        let mut index = GridIndex::new(2.0);
        index.insert(NeighborId::Agent(0), Vec2::new(0.0, 0.0), 0.5);
        index.insert(NeighborId::Agent(1), Vec2::new(3.0, 0.0), 0.5);
        // Large obstacle whose center is far but whose surface is close.
        index.insert(NeighborId::Obstacle(0), Vec2::new(10.0, 0.0), 8.0);
        index.insert(NeighborId::Agent(2), Vec2::new(40.0, 40.0), 0.5);

        let mut seen = Vec::new();
        index.query(Vec2::ZERO, 4.0, &mut |id| seen.push(id));

        assert!(seen.contains(&NeighborId::Agent(0)));
        assert!(seen.contains(&NeighborId::Agent(1)));
        assert!(seen.contains(&NeighborId::Obstacle(0)));
        assert!(!seen.contains(&NeighborId::Agent(2)));
    }
}
