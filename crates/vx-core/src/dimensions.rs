use serde::Serialize;
use crate::bounding_box::bounding_box;
use crate::polygon::Ring;

pub const FEET_PER_METER: f64 = 3.28084;
pub const SQFT_PER_SQM: f64 = 10.764;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Plan extent of a room, always reported in both unit systems
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoomDimensions {
    pub width_m: f64,
    pub depth_m: f64,
    pub width_ft: f64,
    pub depth_ft: f64,
}

impl RoomDimensions {
    /// Bounding box of the footprint, rounded to one decimal.
    /// Feet are derived from the unrounded metre values.
    pub fn from_ring(ring: &Ring) -> Option<Self> {
        let rect = bounding_box(ring)?;
        let (width, depth) = (rect.width(), rect.height());

        Some(Self {
            width_m: round1(width),
            depth_m: round1(depth),
            width_ft: round1(width * FEET_PER_METER),
            depth_ft: round1(depth * FEET_PER_METER),
        })
    }

    pub fn metric_label(&self) -> String {
        format!("{:.1} m x {:.1} m", self.width_m, self.depth_m)
    }

    pub fn imperial_label(&self) -> String {
        format!("{:.1} ft x {:.1} ft", self.width_ft, self.depth_ft)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomArea {
    pub room_id: String,
    pub area_sqm: f64,
    pub area_sqft: f64,
}

/// Floor areas measured from the footprints themselves
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoomSummary {
    pub rows: Vec<RoomArea>,
    pub total_sqm: f64,
    pub total_sqft: f64,
}

pub fn room_summary<'a, I>(rooms: I) -> RoomSummary
where
    I: IntoIterator<Item = (&'a str, &'a Ring)>,
{
    let mut total = 0.0;
    let rows = rooms
        .into_iter()
        .map(|(room_id, ring)| {
            let area = ring.area();
            total += area;
            RoomArea {
                room_id: room_id.to_string(),
                area_sqm: round1(area),
                area_sqft: round1(area * SQFT_PER_SQM),
            }
        })
        .collect();

    RoomSummary {
        rows,
        total_sqm: round1(total),
        total_sqft: round1(total * SQFT_PER_SQM),
    }
}
