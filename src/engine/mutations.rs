use chrono::NaiveDate;
use tracing::debug;

use crate::model::*;

use super::conflict::{check_no_conflict, validate_stay};
use super::{Engine, EngineError};

impl Engine {
    /// Book `room_id` for the inclusive range `start..=end`. Open to both roles.
    pub async fn create_booking(
        &self,
        role: Role,
        room_id: RoomId,
        user_name: String,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Booking, EngineError> {
        let stay = validate_stay(start, end)?;
        if self.catalog.lookup(room_id).is_none() {
            return Err(EngineError::RoomNotFound(room_id));
        }

        let mut guard = self.ledger.write().await;
        check_no_conflict(guard.bookings(), room_id, &stay)?;

        let booking = guard.push(room_id, user_name, stay).clone();
        metrics::gauge!(crate::observability::BOOKINGS_ACTIVE).set(guard.len() as f64);
        debug!(
            "booking {} created on room {room_id} ({start}..={end}) by {role}",
            booking.id
        );
        Ok(booking)
    }

    /// Move an existing booking to new dates. Admin only.
    ///
    /// The date check runs before the role check, and the new stay is not
    /// checked against other bookings on the same room.
    pub async fn update_booking(
        &self,
        role: Role,
        id: BookingId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Booking, EngineError> {
        let mut guard = self.ledger.write().await;
        let booking = guard.get_mut(id).ok_or(EngineError::BookingNotFound(id))?;
        let stay = validate_stay(start, end)?;
        if !role.is_admin() {
            return Err(EngineError::Forbidden("update bookings"));
        }

        booking.stay = stay;
        debug!("booking {id} moved to {start}..={end}");
        Ok(booking.clone())
    }

    /// Remove a booking. Admin only. Its id is never handed out again.
    pub async fn delete_booking(&self, role: Role, id: BookingId) -> Result<(), EngineError> {
        let mut guard = self.ledger.write().await;
        if guard.get(id).is_none() {
            return Err(EngineError::BookingNotFound(id));
        }
        if !role.is_admin() {
            return Err(EngineError::Forbidden("delete bookings"));
        }

        guard.remove(id);
        metrics::gauge!(crate::observability::BOOKINGS_ACTIVE).set(guard.len() as f64);
        debug!("booking {id} deleted");
        Ok(())
    }
}
