use chrono::NaiveDate;

use crate::model::{BookingId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
    },
    RoomNotFound(RoomId),
    RoomUnavailable {
        room_id: RoomId,
        conflicting: BookingId,
    },
    BookingNotFound(BookingId),
    Forbidden(&'static str),
}

impl EngineError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            EngineError::InvalidRange { .. } => "invalid_range",
            EngineError::RoomNotFound(_) => "room_not_found",
            EngineError::RoomUnavailable { .. } => "room_unavailable",
            EngineError::BookingNotFound(_) => "booking_not_found",
            EngineError::Forbidden(_) => "forbidden",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRange { start, end } => {
                write!(f, "invalid range: start date {start} is after end date {end}")
            }
            EngineError::RoomNotFound(id) => write!(f, "room not found: {id}"),
            EngineError::RoomUnavailable { room_id, conflicting } => write!(
                f,
                "room {room_id} is already booked for these dates (booking {conflicting})"
            ),
            EngineError::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            EngineError::Forbidden(op) => write!(f, "forbidden: only admin may {op}"),
        }
    }
}

impl std::error::Error for EngineError {}
