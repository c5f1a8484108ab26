use glam::{Vec2, Vec3};
use tracing::debug;
use crate::camera::{Camera, CameraFrame};
use crate::dimensions::RoomDimensions;
use crate::mesh::{extrude_ring, Mesh, HIGHLIGHT_HEIGHT, WALL_HEIGHT};
use crate::picking::{HoverChange, HoverState, RoomHitLayer};
use crate::ply::ModelMesh;
use crate::room::ROOM_PALETTE;
use crate::store::ActiveCandidate;

pub const HIGHLIGHT_OPACITY: f32 = 0.5;

/// Translucent slab drawn over the hovered room, always on top
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightOverlay {
    pub room_id: String,
    pub mesh: Mesh,
    pub color: String,
    pub opacity: f32,
    pub depth_test: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub room_id: String,
    pub label: String,
    /// World-space contact point recorded on enter
    pub anchor: Vec3,
    /// Anchor in normalized device coordinates, `None` behind the camera
    pub screen: Option<Vec2>,
    pub dimensions: Option<RoomDimensions>,
}

#[derive(Debug, Clone)]
struct LoadedModel {
    url: String,
    mesh: ModelMesh,
}

#[derive(Debug, Default)]
pub struct Viewer {
    pub camera: Camera,
    model: Option<LoadedModel>,
    hit_layer: RoomHitLayer,
    hover: HoverState,
    candidate_id: Option<u32>,
}

impl Viewer {
    pub fn new(fov_deg: f32) -> Self {
        Self {
            camera: Camera::new(fov_deg),
            ..Default::default()
        }
    }

    pub fn candidate_id(&self) -> Option<u32> {
        self.candidate_id
    }

    pub fn model(&self) -> Option<&ModelMesh> {
        self.model.as_ref().map(|m| &m.mesh)
    }

    pub fn model_url(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.url.as_str())
    }

    pub fn hit_layer(&self) -> &RoomHitLayer {
        &self.hit_layer
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    /// Rebuild hit surfaces for a newly active candidate.
    ///
    /// When the loaded model already belongs to this candidate the camera is
    /// left alone; otherwise the stale model is dropped and the camera frames
    /// the room footprints until the new model arrives.
    pub fn show_candidate(&mut self, active: &ActiveCandidate) -> Option<CameraFrame> {
        self.candidate_id = Some(active.id);
        self.hover = HoverState::default();
        self.hit_layer = RoomHitLayer::from_rooms(
            active.rooms.iter().map(|(id, ring)| (id.as_str(), ring)),
            WALL_HEIGHT,
        );

        if self.model_url() == Some(active.model_url.as_str()) {
            return None;
        }

        self.model = None;
        let bounds = self.hit_layer.bounds()?;
        Some(self.camera.frame(&bounds))
    }

    /// Install a decoded model, reframing the camera when the URL changed
    pub fn load_model(&mut self, url: &str, mesh: ModelMesh) -> Option<CameraFrame> {
        let unchanged = self.model_url() == Some(url);
        let bounds = mesh.bounds().or_else(|| self.hit_layer.bounds());

        debug!("Loaded model {} ({} vertices)", url, mesh.vertex_count());
        self.model = Some(LoadedModel { url: url.to_string(), mesh });

        if unchanged {
            return None;
        }
        bounds.map(|b| self.camera.frame(&b))
    }

    /// Pick under the pointer, given in normalized device coordinates
    pub fn pointer_move(&mut self, ndc: Vec2) -> Option<HoverChange> {
        let ray = self.camera.ray_from_ndc(ndc);
        let hit = self.hit_layer.pick(&ray);
        self.hover.update(hit.as_ref())
    }

    pub fn pointer_exit(&mut self) -> Option<HoverChange> {
        self.hover.update(None)
    }

    pub fn highlight(&self, active: &ActiveCandidate) -> Option<HighlightOverlay> {
        let room_id = self.hover.hovered()?;
        let ring = active.rooms.get(room_id)?;
        let mesh = extrude_ring(ring, 0.0, HIGHLIGHT_HEIGHT);
        if mesh.is_empty() {
            return None;
        }

        Some(HighlightOverlay {
            room_id: room_id.to_string(),
            mesh,
            color: active.room_color(room_id).unwrap_or(ROOM_PALETTE[0]).to_string(),
            opacity: HIGHLIGHT_OPACITY,
            depth_test: false,
        })
    }

    pub fn tooltip(&self, active: &ActiveCandidate) -> Option<Tooltip> {
        let room_id = self.hover.hovered()?;
        let anchor = self.hover.contact()?;
        let label = active
            .spec
            .room(room_id)
            .map(|r| r.room_type.clone())
            .unwrap_or_else(|| room_id.to_string());

        Some(Tooltip {
            room_id: room_id.to_string(),
            label,
            anchor,
            screen: self.camera.project(anchor),
            dimensions: active.rooms.get(room_id).and_then(RoomDimensions::from_ring),
        })
    }
}
