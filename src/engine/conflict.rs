use chrono::NaiveDate;

use crate::model::*;

use super::EngineError;

pub(crate) fn validate_stay(start: NaiveDate, end: NaiveDate) -> Result<Stay, EngineError> {
    Stay::new(start, end).ok_or(EngineError::InvalidRange { start, end })
}

/// First booking on `room_id` whose stay shares a day with `stay`.
pub(crate) fn find_conflict<'a>(
    bookings: &'a [Booking],
    room_id: RoomId,
    stay: &Stay,
) -> Option<&'a Booking> {
    bookings
        .iter()
        .find(|b| b.room_id == room_id && b.stay.overlaps(stay))
}

pub(crate) fn check_no_conflict(
    bookings: &[Booking],
    room_id: RoomId,
    stay: &Stay,
) -> Result<(), EngineError> {
    match find_conflict(bookings, room_id, stay) {
        Some(existing) => Err(EngineError::RoomUnavailable {
            room_id,
            conflicting: existing.id,
        }),
        None => Ok(()),
    }
}
