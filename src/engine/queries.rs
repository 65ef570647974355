use crate::model::*;

use super::{Engine, EngineError, Ledger};

impl Engine {
    /// Every active booking in id order. Admin only.
    pub async fn list_bookings(&self, role: Role) -> Result<Vec<Booking>, EngineError> {
        if !role.is_admin() {
            return Err(EngineError::Forbidden("list bookings"));
        }
        let guard = self.ledger.read().await;
        Ok(guard.bookings().to_vec())
    }

    pub fn get_room(&self, id: RoomId) -> Option<Room> {
        self.catalog.lookup(id).cloned()
    }

    pub fn list_rooms(&self) -> Vec<Room> {
        self.catalog.rooms().cloned().collect()
    }

    /// Copy of the ledger, counter included.
    pub async fn snapshot(&self) -> Ledger {
        self.ledger.read().await.clone()
    }
}
