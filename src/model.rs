use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Catalog identifier of a room.
pub type RoomId = i64;

/// Engine-assigned booking identifier. Starts at 1, never reused.
pub type BookingId = i64;

/// Caller capability tier, resolved once at the connection boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Resolve a role from its wire name. Only the exact strings
    /// `"admin"` and `"user"` are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed interval `[start, end]` of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Stay {
    /// Returns `None` when `start` falls after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Two stays overlap when they share at least one calendar day, so a
    /// stay ending on day D collides with one starting on day D.
    pub fn overlaps(&self, other: &Stay) -> bool {
        !(self.end < other.start || self.start > other.end)
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// A bookable room. Loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub number: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
}

impl Room {
    pub fn new(id: RoomId, number: &str, kind: &str, price: f64, description: &str) -> Self {
        Self {
            id,
            number: number.to_string(),
            kind: kind.to_string(),
            price,
            description: description.to_string(),
        }
    }
}

/// A reservation of one room for an inclusive range of days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub room_id: RoomId,
    pub user_name: String,
    pub stay: Stay,
}

impl Booking {
    pub fn start_date(&self) -> NaiveDate {
        self.stay.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.stay.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn stay(start: &str, end: &str) -> Stay {
        Stay::new(d(start), d(end)).unwrap()
    }

    #[test]
    fn stay_rejects_reversed_dates() {
        assert!(Stay::new(d("2024-02-01"), d("2024-01-01")).is_none());
    }

    #[test]
    fn stay_allows_single_day() {
        let s = stay("2024-01-01", "2024-01-01");
        assert_eq!(s.nights(), 0);
    }

    #[test]
    fn crossing_stays_overlap() {
        let a = stay("2024-01-01", "2024-01-05");
        let b = stay("2024-01-03", "2024-01-10");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn shared_boundary_day_overlaps() {
        let a = stay("2024-01-01", "2024-01-05");
        let b = stay("2024-01-05", "2024-01-10");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn adjacent_days_do_not_overlap() {
        let a = stay("2024-01-01", "2024-01-05");
        let b = stay("2024-01-06", "2024-01-10");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn containment_overlaps() {
        let outer = stay("2024-01-01", "2024-01-31");
        let inner = stay("2024-01-10", "2024-01-12");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn role_from_name_is_exact() {
        assert_eq!(Role::from_name("admin"), Some(Role::Admin));
        assert_eq!(Role::from_name("user"), Some(Role::User));
        assert_eq!(Role::from_name("Admin"), None);
        assert_eq!(Role::from_name(""), None);
        assert_eq!(Role::from_name("root"), None);
    }

    #[test]
    fn room_deserializes_type_field_and_default_description() {
        let room: Room =
            serde_json::from_str(r#"{"id": 9, "number": "901", "type": "suite", "price": 99.5}"#)
                .unwrap();
        assert_eq!(room.kind, "suite");
        assert_eq!(room.description, "");
    }
}
