use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid PLY data: {0}")]
    Ply(String),

    #[error("PLY data ended while reading {0}")]
    PlyTruncated(&'static str),

    #[error("Room area must be a positive number, got {0}")]
    InvalidArea(f64),

    #[error("Unknown room type: {0}")]
    UnknownRoomType(String),

    #[error("Unknown area unit: {0}")]
    UnknownUnit(String),

    #[error("No room with id {0}")]
    UnknownRoom(String),

    #[error("No candidate with id {0}")]
    UnknownCandidate(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
