use glam::{DVec2, Vec3};
use tracing::warn;
use crate::bounding_box::Aabb;
use crate::polygon::Ring;

/// Wall height of the generated models (metres)
pub const WALL_HEIGHT: f32 = 2.8;

/// Thickness of the hover highlight slab
pub const HIGHLIGHT_HEIGHT: f32 = 0.1;

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| {
            [
                self.positions[t[0] as usize],
                self.positions[t[1] as usize],
                self.positions[t[2] as usize],
            ]
        })
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }
}

/// Triangulate a simple polygon. Degenerate input yields no triangles.
pub fn triangulate(points: &[DVec2]) -> Vec<[usize; 3]> {
    if points.len() < 3 {
        return Vec::new();
    }

    let vertices: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    match earcutr::earcut(&vertices, &[], 2) {
        Ok(indices) => indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect(),
        Err(e) => {
            warn!("Failed to triangulate room footprint: {:?}", e);
            Vec::new()
        }
    }
}

/// A point guaranteed to lie inside the footprint (centroid of its largest triangle)
pub fn interior_point(ring: &Ring) -> Option<DVec2> {
    let points = ring.open_points();

    triangulate(points)
        .into_iter()
        .map(|[a, b, c]| {
            let (a, b, c) = (points[a], points[b], points[c]);
            let area = (b - a).perp_dot(c - a).abs();
            (area, (a + b + c) / 3.0)
        })
        .max_by(|x, y| x.0.total_cmp(&y.0))
        .map(|(_, centroid)| centroid)
}

/// Extrude a footprint into a closed prism between `base` and `base + height`.
///
/// Plan coordinates map to world X/Y, the extrusion runs along Z.
pub fn extrude_ring(ring: &Ring, base: f32, height: f32) -> Mesh {
    let points = ring.open_points();
    let caps = triangulate(points);
    if caps.is_empty() {
        return Mesh::default();
    }

    let n = points.len();
    let top = base + height;

    let mut positions = Vec::with_capacity(n * 2);
    positions.extend(points.iter().map(|p| Vec3::new(p.x as f32, p.y as f32, base)));
    positions.extend(points.iter().map(|p| Vec3::new(p.x as f32, p.y as f32, top)));

    let mut indices = Vec::with_capacity(caps.len() * 6 + n * 6);
    for [a, b, c] in &caps {
        // Bottom faces down, top faces up
        indices.extend([*c as u32, *b as u32, *a as u32]);
        indices.extend([(a + n) as u32, (b + n) as u32, (c + n) as u32]);
    }

    for i in 0..n {
        let j = (i + 1) % n;
        let (bi, bj, ti, tj) = (i as u32, j as u32, (i + n) as u32, (j + n) as u32);
        indices.extend([bi, bj, tj, bi, tj, ti]);
    }

    Mesh { positions, indices }
}
