use std::collections::BTreeMap;
use serde::Serialize;
use tracing::{debug, info};
use crate::candidate::{Candidate, GenerationResult, LayoutSpec, Stats};
use crate::dimensions::{room_summary, RoomDimensions, RoomSummary};
use crate::error::{Error, Result};
use crate::polygon::Ring;

pub const UNALLOCATED_LABEL: &str = "Unallocated";
pub const UNALLOCATED_COLOR: &str = "#E5E7EB";

/// Opacity of chart segments that are not hovered while something else is
pub const DIMMED_OPACITY: f32 = 0.3;

/// The selection the viewer, chart and legend render from
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCandidate {
    pub id: u32,
    pub model_url: String,
    pub spec: LayoutSpec,
    pub rooms: BTreeMap<String, Ring>,
    pub score: f64,
    pub stats: Stats,
}

impl ActiveCandidate {
    fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id,
            model_url: candidate.model_url.clone(),
            spec: candidate.spec.clone(),
            rooms: candidate.layout.rings(),
            score: candidate.score_percent(),
            stats: candidate.stats.clone(),
        }
    }

    /// Server colour of a room, if the layout lists it
    pub fn room_color(&self, room_id: &str) -> Option<&str> {
        self.spec
            .room(room_id)
            .map(|r| r.color.as_str())
            .filter(|c| !c.is_empty())
    }
}

/// One segment of an area chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesEntry {
    /// Room the segment belongs to, `None` for the unallocated remainder
    pub id: Option<String>,
    pub label: String,
    pub value: f64,
    pub color: String,
}

impl SeriesEntry {
    pub fn opacity(&self, hovered: Option<&str>) -> f32 {
        match hovered {
            None => 1.0,
            Some(h) if self.id.as_deref() == Some(h) => 1.0,
            Some(_) => DIMMED_OPACITY,
        }
    }
}

/// Chart series for a set of rooms, plus the unallocated remainder of `total`.
/// Shared by the results chart and the manual-input allocation chart.
pub fn area_series<I>(entries: I, total: f64) -> Vec<SeriesEntry>
where
    I: IntoIterator<Item = SeriesEntry>,
{
    let mut series: Vec<SeriesEntry> = entries.into_iter().collect();
    let allocated: f64 = series.iter().map(|e| e.value).sum();
    let remainder = (total - allocated).max(0.0);

    if remainder > 0.0 {
        series.push(SeriesEntry {
            id: None,
            label: UNALLOCATED_LABEL.to_string(),
            value: remainder,
            color: UNALLOCATED_COLOR.to_string(),
        });
    }

    series
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub room_id: String,
    pub label: String,
    pub color: String,
    pub area: f64,
    pub emphasized: bool,
}

/// Owns the candidates of the last completed job and the active selection
#[derive(Debug, Default)]
pub struct CandidateStore {
    candidates: Vec<Candidate>,
    winner_id: Option<u32>,
    active: Option<ActiveCandidate>,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the candidate set and auto-select the winner
    pub fn populate(&mut self, result: GenerationResult) -> Option<u32> {
        let winner = result
            .winner_index()
            .map(|(index, how)| (result.candidates[index].id, how));

        self.candidates = result.candidates;
        self.active = None;
        self.winner_id = None;

        let (winner_id, how) = winner?;
        self.winner_id = Some(winner_id);
        self.active = self
            .candidates
            .iter()
            .find(|c| c.id == winner_id)
            .map(ActiveCandidate::from_candidate);

        info!("Loaded {} candidates, winner {} ({:?})", self.candidates.len(), winner_id, how);
        Some(winner_id)
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.winner_id = None;
        self.active = None;
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn winner_id(&self) -> Option<u32> {
        self.winner_id
    }

    pub fn active(&self) -> Option<&ActiveCandidate> {
        self.active.as_ref()
    }

    /// Swap the whole active selection at once. An unknown id leaves the
    /// current selection untouched.
    pub fn select(&mut self, id: u32) -> Result<&ActiveCandidate> {
        let candidate = self
            .candidates
            .iter()
            .find(|c| c.id == id)
            .ok_or(Error::UnknownCandidate(id))?;

        debug!("Selecting candidate {}", id);
        Ok(&*self.active.insert(ActiveCandidate::from_candidate(candidate)))
    }

    /// Area chart of the active candidate against the requested total (sq ft)
    pub fn derived_series(&self, total: f64) -> Vec<SeriesEntry> {
        let Some(active) = &self.active else {
            return Vec::new();
        };

        let rooms = active.spec.rooms.iter().map(|room| SeriesEntry {
            id: Some(room.id.clone()),
            label: room.room_type.clone(),
            value: room.area,
            color: room.color.clone(),
        });

        area_series(rooms, total)
    }

    pub fn legend(&self, hovered: Option<&str>) -> Vec<LegendEntry> {
        let Some(active) = &self.active else {
            return Vec::new();
        };

        active
            .spec
            .rooms
            .iter()
            .map(|room| LegendEntry {
                room_id: room.id.clone(),
                label: room.room_type.clone(),
                color: room.color.clone(),
                area: room.area,
                emphasized: hovered == Some(room.id.as_str()),
            })
            .collect()
    }

    pub fn room_dimensions(&self, room_id: &str) -> Result<Option<RoomDimensions>> {
        let active = self
            .active
            .as_ref()
            .ok_or_else(|| Error::UnknownRoom(room_id.to_string()))?;
        let ring = active
            .rooms
            .get(room_id)
            .ok_or_else(|| Error::UnknownRoom(room_id.to_string()))?;

        Ok(RoomDimensions::from_ring(ring))
    }

    pub fn room_summary(&self) -> Option<RoomSummary> {
        let active = self.active.as_ref()?;
        Some(room_summary(active.rooms.iter().map(|(id, ring)| (id.as_str(), ring))))
    }
}
