//! Navigation mesh primitives (half-edge topology, corridor search, funnel paths).

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod math;
pub mod mesh;

pub use math::{closest_point_on_segment, normal, project, sqr, tri_area2, Vec2};
pub use mesh::{HalfEdge, Mesh, MeshError, Triangle, Vertex};
