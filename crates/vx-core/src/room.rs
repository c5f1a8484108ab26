use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::{Error, Result};

/// Architectural pastel palette shared with the generated models
pub const ROOM_PALETTE: [&str; 8] = [
    "#A8DADC",
    "#F1FAEE",
    "#A8E6CF",
    "#FFD3B6",
    "#FFAAA5",
    "#DCEDC1",
    "#D4A5A5",
    "#9D8189",
];

/// Room categories a user can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Living,
    Bedroom,
    Bathroom,
    Kitchen,
    Dining,
    Study,
    Balcony,
}

impl RoomType {
    /// Name for display in UI
    pub fn name(&self) -> &str {
        match self {
            Self::Living => "Living Room",
            Self::Bedroom => "Bedroom",
            Self::Bathroom => "Bathroom",
            Self::Kitchen => "Kitchen",
            Self::Dining => "Dining Room",
            Self::Study => "Study",
            Self::Balcony => "Balcony",
        }
    }

    /// Identifier used on the command line and in payloads
    pub fn id(&self) -> &str {
        match self {
            Self::Living => "living",
            Self::Bedroom => "bedroom",
            Self::Bathroom => "bathroom",
            Self::Kitchen => "kitchen",
            Self::Dining => "dining",
            Self::Study => "study",
            Self::Balcony => "balcony",
        }
    }

    /// Wording used inside compiled prompts
    pub fn phrase(&self) -> &str {
        match self {
            Self::Living => "living room",
            Self::Bedroom => "bedroom",
            Self::Bathroom => "bathroom",
            Self::Kitchen => "kitchen",
            Self::Dining => "dining room",
            Self::Study => "study",
            Self::Balcony => "balcony",
        }
    }

    pub fn color(&self) -> &'static str {
        let index = Self::all().iter().position(|t| t == self).unwrap_or(0);
        ROOM_PALETTE[index % ROOM_PALETTE.len()]
    }

    /// All room types in wizard order
    pub fn all() -> [RoomType; 7] {
        [
            Self::Living,
            Self::Bedroom,
            Self::Bathroom,
            Self::Kitchen,
            Self::Dining,
            Self::Study,
            Self::Balcony,
        ]
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoomType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .into_iter()
            .find(|t| t.id() == wanted || t.phrase() == wanted || t.name().to_lowercase() == wanted)
            .ok_or_else(|| Error::UnknownRoomType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the user's room list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRequirement {
    pub id: RoomId,
    pub room_type: RoomType,
    pub area: f64,
}

impl RoomRequirement {
    pub fn new(room_type: RoomType, area: f64) -> Result<Self> {
        Ok(Self {
            id: RoomId::new(),
            room_type,
            area: check_area(area)?,
        })
    }
}

/// Areas must be finite and strictly positive
pub fn check_area(area: f64) -> Result<f64> {
    if area.is_finite() && area > 0.0 {
        Ok(area)
    } else {
        Err(Error::InvalidArea(area))
    }
}

/// Unit the user enters areas in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AreaUnit {
    #[default]
    SqFt,
    SqM,
}

impl AreaUnit {
    /// Suffix written after every area in prompts
    pub fn suffix(&self) -> &str {
        match self {
            Self::SqFt => "sqft",
            Self::SqM => "sqm",
        }
    }

    /// Factor that converts this unit into square feet
    pub fn to_sqft(&self) -> f64 {
        match self {
            Self::SqFt => 1.0,
            Self::SqM => crate::dimensions::SQFT_PER_SQM,
        }
    }
}

impl fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for AreaUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqft" | "ft" | "ft2" => Ok(Self::SqFt),
            "sqm" | "m" | "m2" => Ok(Self::SqM),
            _ => Err(Error::UnknownUnit(s.to_string())),
        }
    }
}
