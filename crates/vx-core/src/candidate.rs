use std::collections::BTreeMap;
use serde::Deserialize;
use tracing::warn;
use crate::polygon::{PolygonShape, Ring};

/// Quality metrics reported per candidate
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub efficiency: f64,
    pub privacy: f64,
    pub daylight: f64,
    pub circulation: f64,
    pub average: Option<f64>,
}

impl Stats {
    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("Efficiency", self.efficiency),
            ("Privacy", self.privacy),
            ("Daylight", self.daylight),
            ("Circulation", self.circulation),
        ]
    }

    /// Server-provided average, or the mean of the four metrics
    pub fn average(&self) -> f64 {
        self.average
            .unwrap_or_else(|| self.entries().iter().map(|(_, v)| v).sum::<f64>() / 4.0)
    }
}

/// One room of a candidate as the service sized and coloured it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomPlacement {
    pub id: String,
    #[serde(rename = "type")]
    pub room_type: String,
    /// Square feet
    pub area: f64,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LayoutSpec {
    #[serde(default)]
    pub rooms: Vec<RoomPlacement>,
}

impl LayoutSpec {
    /// Displayed next to the requested total, never enforced
    pub fn total_area(&self) -> f64 {
        self.rooms.iter().map(|r| r.area).sum()
    }

    pub fn room(&self, id: &str) -> Option<&RoomPlacement> {
        self.rooms.iter().find(|r| r.id == id)
    }
}

/// Room footprints keyed by room id. Other layout keys (doors, entrance)
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub rooms: BTreeMap<String, PolygonShape>,
}

impl Layout {
    pub fn rings(&self) -> BTreeMap<String, Ring> {
        self.rooms
            .iter()
            .map(|(id, shape)| (id.clone(), shape.ring()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    pub id: u32,
    #[serde(default)]
    pub score: f64,
    #[serde(default, alias = "modelUrl")]
    pub model_url: String,
    #[serde(default)]
    pub spec: LayoutSpec,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Candidate {
    /// Score on the 0-100 scale the server reports
    pub fn score_percent(&self) -> f64 {
        self.score.clamp(0.0, 100.0)
    }
}

/// How the winning candidate was identified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinnerMatch {
    ExplicitId,
    ModelUrl,
    /// Nothing matched; the first candidate is used
    Fallback,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerationResult {
    #[serde(default, rename = "model_url", alias = "modelUrlOfWinner")]
    pub winner_model_url: Option<String>,
    #[serde(default, alias = "winnerId")]
    pub winner_id: Option<u32>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerationResult {
    /// Explicit id first, then the winner's model URL, then index 0
    pub fn winner_index(&self) -> Option<(usize, WinnerMatch)> {
        if self.candidates.is_empty() {
            return None;
        }

        if let Some(id) = self.winner_id {
            if let Some(index) = self.candidates.iter().position(|c| c.id == id) {
                return Some((index, WinnerMatch::ExplicitId));
            }
        }

        if let Some(url) = &self.winner_model_url {
            if let Some(index) = self.candidates.iter().position(|c| &c.model_url == url) {
                return Some((index, WinnerMatch::ModelUrl));
            }
        }

        warn!(
            "No candidate matches the winner reference (id {:?}, url {:?}), using the first one",
            self.winner_id, self.winner_model_url
        );
        Some((0, WinnerMatch::Fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(id: u32, url: &str) -> serde_json::Value {
        json!({
            "id": id,
            "score": 80,
            "model_url": url,
            "spec": {"rooms": [{"id": "living_0", "type": "Living", "area": 215, "color": "#A8DADC"}]},
            "layout": {
                "rooms": {"living_0": {"type": "Polygon", "coordinates": [[0, 0], [5, 0], [5, 4], [0, 4], [0, 0]]}},
                "doors": [{"type": "LineString", "coordinates": [[0, 1], [0, 2]]}]
            },
            "stats": {"efficiency": 80.0, "privacy": 70.0, "daylight": 60.0, "circulation": 50.0, "average": 65.0},
            "seed": 42
        })
    }

    #[test]
    fn test_parse_backend_result() {
        let result: GenerationResult = serde_json::from_value(json!({
            "model_url": "/static/models/b.ply",
            "candidates": [candidate(0, "/static/models/a.ply"), candidate(1, "/static/models/b.ply")]
        }))
        .unwrap();

        assert_eq!(result.candidates.len(), 2);
        let first = &result.candidates[0];
        assert_eq!(first.spec.total_area(), 215.0);
        assert_eq!(first.layout.rings()["living_0"].area(), 20.0);
        assert_eq!(first.stats.average(), 65.0);
        assert_eq!(result.winner_index(), Some((1, WinnerMatch::ModelUrl)));
    }

    #[test]
    fn test_explicit_winner_id_takes_precedence() {
        let result: GenerationResult = serde_json::from_value(json!({
            "model_url": "/static/models/b.ply",
            "winner_id": 0,
            "candidates": [candidate(0, "/static/models/a.ply"), candidate(1, "/static/models/b.ply")]
        }))
        .unwrap();

        assert_eq!(result.winner_index(), Some((0, WinnerMatch::ExplicitId)));
    }

    #[test]
    fn test_unmatched_winner_falls_back_to_first() {
        let result: GenerationResult = serde_json::from_value(json!({
            "model_url": "/static/models/zzz.ply",
            "candidates": [candidate(3, "/a.ply"), candidate(4, "/b.ply")]
        }))
        .unwrap();

        assert_eq!(result.winner_index(), Some((0, WinnerMatch::Fallback)));
        assert_eq!(GenerationResult::default().winner_index(), None);
    }

    #[test]
    fn test_score_percent() {
        let mut c: Candidate = serde_json::from_value(candidate(0, "/a.ply")).unwrap();
        assert_eq!(c.score_percent(), 80.0);

        // Low scores are real scores, not fractions
        c.score = 1.0;
        assert_eq!(c.score_percent(), 1.0);
        c.score = 0.5;
        assert_eq!(c.score_percent(), 0.5);

        c.score = 130.0;
        assert_eq!(c.score_percent(), 100.0);
        c.score = -4.0;
        assert_eq!(c.score_percent(), 0.0);
    }

    #[test]
    fn test_missing_average_is_mean() {
        let stats = Stats { efficiency: 80.0, privacy: 60.0, daylight: 40.0, circulation: 20.0, average: None };
        assert_eq!(stats.average(), 50.0);
    }
}
