use glam::Vec3;
use crate::bounding_box::Aabb;
use crate::mesh::{extrude_ring, Mesh};
use crate::polygon::Ring;

const RAY_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Two-sided Möller–Trumbore test, returns the distance along the ray
    pub fn intersect_triangle(&self, [a, b, c]: [Vec3; 3]) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < RAY_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t > RAY_EPSILON).then_some(t)
    }

    /// Nearest hit against any triangle of the mesh
    pub fn intersect_mesh(&self, mesh: &Mesh) -> Option<f32> {
        mesh.triangles()
            .filter_map(|tri| self.intersect_triangle(tri))
            .min_by(f32::total_cmp)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomHit {
    pub room_id: String,
    /// World-space contact point
    pub point: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone)]
struct HitSurface {
    room_id: String,
    mesh: Mesh,
}

/// One invisible prism per room, extruded to the model's wall height
#[derive(Debug, Clone, Default)]
pub struct RoomHitLayer {
    surfaces: Vec<HitSurface>,
}

impl RoomHitLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rooms with degenerate footprints get no surface and can never be hovered
    pub fn from_rooms<'a, I>(rooms: I, height: f32) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Ring)>,
    {
        let surfaces = rooms
            .into_iter()
            .map(|(room_id, ring)| HitSurface {
                room_id: room_id.to_string(),
                mesh: extrude_ring(ring, 0.0, height),
            })
            .filter(|surface| !surface.mesh.is_empty())
            .collect();

        Self { surfaces }
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.surfaces.iter().any(|s| s.room_id == room_id)
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.surfaces
            .iter()
            .filter_map(|s| s.mesh.bounds())
            .reduce(|a, b| a.union(&b))
    }

    /// Closest room surface under the ray
    pub fn pick(&self, ray: &Ray) -> Option<RoomHit> {
        self.surfaces
            .iter()
            .filter_map(|surface| {
                ray.intersect_mesh(&surface.mesh)
                    .map(|t| (surface, t))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(surface, t)| RoomHit {
                room_id: surface.room_id.clone(),
                point: ray.at(t),
                distance: t,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverChange {
    Entered {
        room_id: String,
        previous: Option<String>,
    },
    Left(String),
}

/// Room currently under the pointer.
///
/// Only the hovered room may clear the state, so a late leave event from a
/// room the pointer already moved off is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverState {
    hovered: Option<String>,
    contact: Option<Vec3>,
}

impl HoverState {
    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Contact point recorded on enter, used to anchor the tooltip
    pub fn contact(&self) -> Option<Vec3> {
        self.contact
    }

    pub fn is_hovered(&self, room_id: &str) -> bool {
        self.hovered.as_deref() == Some(room_id)
    }

    pub fn pointer_enter(&mut self, room_id: &str, point: Vec3) {
        self.hovered = Some(room_id.to_string());
        self.contact = Some(point);
    }

    /// Returns `true` when this leave actually cleared the state
    pub fn pointer_leave(&mut self, room_id: &str) -> bool {
        if !self.is_hovered(room_id) {
            return false;
        }
        self.hovered = None;
        self.contact = None;
        true
    }

    /// Feed the latest pick result and report the resulting transition
    pub fn update(&mut self, hit: Option<&RoomHit>) -> Option<HoverChange> {
        match (hit, self.hovered.clone()) {
            (Some(hit), Some(current)) if current == hit.room_id => None,
            (Some(hit), previous) => {
                if let Some(previous) = &previous {
                    self.pointer_leave(previous);
                }
                self.pointer_enter(&hit.room_id, hit.point);
                Some(HoverChange::Entered {
                    room_id: hit.room_id.clone(),
                    previous,
                })
            }
            (None, Some(current)) => {
                self.pointer_leave(&current);
                Some(HoverChange::Left(current))
            }
            (None, None) => None,
        }
    }
}
