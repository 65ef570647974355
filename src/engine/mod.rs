mod conflict;
mod error;
mod mutations;
mod queries;
mod store;

pub use error::EngineError;
pub use store::Ledger;

use tokio::sync::RwLock;

use crate::catalog::RoomCatalog;

/// The reservation engine. Owns the booking ledger; the room catalog is
/// read-only and shared without locking.
///
/// Every operation holds the ledger lock for its full duration: writes for
/// create/update/delete, a read for list. Two concurrent creates therefore
/// cannot both pass the overlap scan before either appends.
pub struct Engine {
    catalog: RoomCatalog,
    ledger: RwLock<Ledger>,
}

impl Engine {
    pub fn new(catalog: RoomCatalog) -> Self {
        Self {
            catalog,
            ledger: RwLock::new(Ledger::new()),
        }
    }

    pub fn catalog(&self) -> &RoomCatalog {
        &self.catalog
    }
}
