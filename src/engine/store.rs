use crate::model::*;

/// The booking collection plus the id counter. Both live behind the same
/// engine lock so id assignment and the overlap scan stay atomic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    /// Active bookings in creation order, which is also ascending id order.
    bookings: Vec<Booking>,
    /// Id handed to the next successful create.
    next_id: BookingId,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            bookings: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn next_id(&self) -> BookingId {
        self.next_id
    }

    pub fn get(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Assign the next id and append. Caller has already validated the stay.
    pub fn push(&mut self, room_id: RoomId, user_name: String, stay: Stay) -> &Booking {
        let booking = Booking {
            id: self.next_id,
            room_id,
            user_name,
            stay,
        };
        self.next_id += 1;
        self.bookings.push(booking);
        &self.bookings[self.bookings.len() - 1]
    }

    /// Remove by id. The counter is untouched, so ids are never revived.
    pub fn remove(&mut self, id: BookingId) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }
}
