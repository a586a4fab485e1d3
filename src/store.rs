use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use crate::errors::StoreError;
use crate::models::note::NoteRecord;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Keyed note storage where a successful read is also the delete.
///
/// Implementations must make [`NoteStore::fetch_and_delete`] a single atomic
/// step per id: of any number of concurrent callers for the same id, at most
/// one gets the record back. Operations on different ids must not serialize
/// on a shared lock.
pub trait NoteStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateId`] if `record.id` is taken.
    fn create(&self, record: &NoteRecord) -> Result<(), StoreError>;

    /// Removes and returns the record. `Ok(None)` covers unknown, already
    /// consumed and expired ids alike. A record found past its deadline is
    /// still removed but reported as absent.
    fn fetch_and_delete(&self, id: &str, now: SystemTime)
        -> Result<Option<NoteRecord>, StoreError>;

    /// Deletes every record with `expires_at <= now`, returning how many.
    fn expire_older_than(&self, now: SystemTime) -> Result<usize, StoreError>;
}

/// Runs `expire_older_than` every `interval` on a dedicated thread for the
/// life of the process. A failed sweep is logged and retried next round.
pub fn spawn_expiry_sweeper(store: Arc<dyn NoteStore>, interval: Duration) -> JoinHandle<()> {
    std::thread::spawn(move || loop {
        std::thread::sleep(interval);
        sweep_once(store.as_ref(), SystemTime::now());
    })
}

pub fn sweep_once(store: &dyn NoteStore, now: SystemTime) -> usize {
    match store.expire_older_than(now) {
        Ok(0) => 0,
        Ok(count) => {
            log::info!("expired {} unread notes", count);
            count
        }
        Err(e) => {
            log::error!("expiry sweep failed: {e}");
            0
        }
    }
}
