use std::collections::BTreeMap;
use std::path::Path;

use crate::model::*;

/// Fixed, read-only set of bookable rooms keyed by id.
#[derive(Debug, Clone)]
pub struct RoomCatalog {
    rooms: BTreeMap<RoomId, Room>,
}

impl Default for RoomCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RoomCatalog {
    /// The seven rooms the hotel ships with.
    pub fn builtin() -> Self {
        let rooms = [
            Room::new(1, "101", "1", 30.0, "Single"),
            Room::new(2, "102", "2", 45.0, "Double"),
            Room::new(3, "103", "2", 50.0, "Double with balcony"),
            Room::new(4, "201", "3", 60.0, "Triple"),
            Room::new(5, "202", "1", 35.0, "Single, improved"),
            Room::new(6, "301", "suite", 120.0, "Suite with sea view"),
            Room::new(7, "302", "suite", 130.0, "Premium suite"),
        ];
        Self {
            rooms: rooms.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub fn from_rooms(rooms: Vec<Room>) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for room in rooms {
            if room.id <= 0 {
                return Err(CatalogError::InvalidId(room.id));
            }
            if !(room.price >= 0.0) {
                return Err(CatalogError::NegativePrice(room.id));
            }
            if map.contains_key(&room.id) {
                return Err(CatalogError::DuplicateId(room.id));
            }
            map.insert(room.id, room);
        }
        Ok(Self { rooms: map })
    }

    /// Parse a JSON array of rooms.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let rooms: Vec<Room> =
            serde_json::from_str(json).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        Self::from_rooms(rooms)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn lookup(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// All rooms in ascending id order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Io(String),
    Malformed(String),
    InvalidId(RoomId),
    DuplicateId(RoomId),
    NegativePrice(RoomId),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "cannot read room catalog: {e}"),
            CatalogError::Malformed(e) => write!(f, "malformed room catalog: {e}"),
            CatalogError::InvalidId(id) => write!(f, "room id must be positive, got {id}"),
            CatalogError::DuplicateId(id) => write!(f, "duplicate room id: {id}"),
            CatalogError::NegativePrice(id) => write!(f, "room {id} has a negative price"),
        }
    }
}

impl std::error::Error for CatalogError {}
