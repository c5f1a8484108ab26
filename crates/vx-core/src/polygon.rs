use glam::DVec2;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Footprint geometry resolved at the ingestion boundary
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PolygonShape {
    /// Point list given directly
    Ring(Vec<DVec2>),
    /// List of rings, the first one is the outer boundary
    Rings(Vec<Vec<DVec2>>),
    /// Missing or unreadable coordinates
    #[default]
    Empty,
}

impl PolygonShape {
    /// Accepts a geometry object (`{"type", "coordinates"}`) or a bare
    /// coordinate array. Unreadable input becomes `Empty` instead of an error.
    pub fn from_value(value: &Value) -> Self {
        let coordinates = match value {
            Value::Object(map) => match map.get("coordinates") {
                Some(c) => c,
                None => return Self::Empty,
            },
            other => other,
        };

        let Some(items) = coordinates.as_array() else {
            return Self::Empty;
        };
        let Some(first) = items.first() else {
            return Self::Empty;
        };

        if is_point_list(first) {
            Self::Rings(items.iter().map(parse_points).collect())
        } else {
            Self::Ring(parse_points(coordinates))
        }
    }

    pub fn ring(&self) -> Ring {
        normalize_ring(self)
    }
}

impl<'de> Deserialize<'de> for PolygonShape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl From<Ring> for PolygonShape {
    fn from(ring: Ring) -> Self {
        Self::Ring(ring.0)
    }
}

/// An array whose first element is itself an array, i.e. `[[x, y], ...]`
fn is_point_list(value: &Value) -> bool {
    value
        .as_array()
        .and_then(|items| items.first())
        .is_some_and(Value::is_array)
}

fn parse_points(value: &Value) -> Vec<DVec2> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|point| {
            let coords = point.as_array()?;
            let x = coords.first()?.as_f64()?;
            let y = coords.get(1)?.as_f64()?;
            Some(DVec2::new(x, y))
        })
        .collect()
}

/// Ordered boundary of a room footprint
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ring(Vec<DVec2>);

impl Ring {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[DVec2] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Points without the repeated closing point some engines append
    pub fn open_points(&self) -> &[DVec2] {
        match self.0.as_slice() {
            [first, .., last] if first == last => &self.0[..self.0.len() - 1],
            points => points,
        }
    }

    /// Fewer than three distinct points cannot bound a floor
    pub fn is_degenerate(&self) -> bool {
        self.open_points().len() < 3
    }

    /// Enclosed area (shoelace), independent of winding
    pub fn area(&self) -> f64 {
        let points = self.open_points();
        if points.len() < 3 {
            return 0.0;
        }

        let twice: f64 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum();

        twice.abs() / 2.0
    }
}

/// Resolve a footprint to the ring used for rendering.
///
/// Only the first ring of a multi-ring shape is kept; interior rings (holes)
/// and any further rings are discarded.
pub fn normalize_ring(shape: &PolygonShape) -> Ring {
    match shape {
        PolygonShape::Ring(points) => Ring(points.clone()),
        PolygonShape::Rings(rings) => Ring(rings.first().cloned().unwrap_or_default()),
        PolygonShape::Empty => Ring::default(),
    }
}
