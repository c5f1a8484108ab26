use glam::{DVec2, Vec3};
use crate::polygon::Ring;

/// Axis-aligned extent of a footprint in plan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: DVec2,
    pub max: DVec2,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }
}

/// Linear scan over the ring; `None` when there is nothing to measure
pub fn bounding_box(ring: &Ring) -> Option<Rect> {
    let (first, rest) = ring.points().split_first()?;

    let mut rect = Rect { min: *first, max: *first };
    for p in rest {
        rect.min = rect.min.min(*p);
        rect.max = rect.max.max(*p);
    }

    Some(rect)
}

/// Axis-aligned box in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;

        Some(points.fold(Self::new(first, first), |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Largest side length over the three axes
    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }
}
