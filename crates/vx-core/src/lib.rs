pub mod bounding_box;
pub mod camera;
pub mod candidate;
pub mod dimensions;
pub mod error;
pub mod mesh;
pub mod picking;
pub mod ply;
pub mod polygon;
pub mod room;
pub mod scene;
pub mod store;

pub use glam;

pub use bounding_box::{bounding_box, Aabb, Rect};
pub use camera::{auto_frame, Camera, CameraFrame};
pub use candidate::{Candidate, GenerationResult, Layout, LayoutSpec, RoomPlacement, Stats, WinnerMatch};
pub use dimensions::{RoomDimensions, RoomSummary};
pub use error::{Error, Result};
pub use mesh::{extrude_ring, Mesh, HIGHLIGHT_HEIGHT, WALL_HEIGHT};
pub use picking::{HoverChange, HoverState, Ray, RoomHit, RoomHitLayer};
pub use ply::ModelMesh;
pub use polygon::{normalize_ring, PolygonShape, Ring};
pub use room::{AreaUnit, RoomId, RoomRequirement, RoomType};
pub use scene::{HighlightOverlay, Tooltip, Viewer};
pub use store::{ActiveCandidate, CandidateStore, LegendEntry, SeriesEntry};
