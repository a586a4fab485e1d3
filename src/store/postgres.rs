use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::ConnectionManager;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::{Duration, SystemTime};

use super::NoteStore;
use crate::errors::StoreError;
use crate::models::note::{NoteRecord, NoteRow};
use crate::schema::notes::dsl::{expires_at, id, notes};

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// PostgreSQL-backed store sharing one connection pool per process.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Builds the pool without connecting. Connections are opened on first
    /// use; a broken one is dropped and the next checkout dials again.
    pub fn connect_lazy(database_url: &str, max_size: u32) -> Self {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = r2d2::Pool::builder()
            .max_size(max_size)
            .min_idle(Some(0))
            .test_on_check_out(true)
            .connection_timeout(Duration::from_secs(5))
            .build_unchecked(manager);

        PgStore { pool }
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        let mut connection = self.pool.get()?;
        let applied = connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        for migration in applied {
            log::info!("applied migration {migration}");
        }
        Ok(())
    }
}

impl NoteStore for PgStore {
    fn create(&self, record: &NoteRecord) -> Result<(), StoreError> {
        let mut connection = self.pool.get()?;

        match diesel::insert_into(notes)
            .values(NoteRow::from(record))
            .execute(&mut connection)
        {
            Ok(_) => Ok(()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(StoreError::DuplicateId(record.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fetch_and_delete(
        &self,
        note_id: &str,
        now: SystemTime,
    ) -> Result<Option<NoteRecord>, StoreError> {
        let mut connection = self.pool.get()?;

        // one statement; a concurrent DELETE of the same row waits on the row
        // lock and then matches nothing
        let row = diesel::delete(notes.filter(id.eq(note_id)))
            .returning(crate::schema::notes::all_columns)
            .get_result::<NoteRow>(&mut connection)
            .optional()?;

        Ok(row.and_then(|row| settle(row, now)))
    }

    fn expire_older_than(&self, now: SystemTime) -> Result<usize, StoreError> {
        let mut connection = self.pool.get()?;
        Ok(diesel::delete(notes.filter(expires_at.le(now))).execute(&mut connection)?)
    }
}

/// Decides what a deleted row amounts to. The row is gone either way, so a
/// corrupt one is logged and reported as absent; retrying could never get
/// it back.
fn settle(row: NoteRow, now: SystemTime) -> Option<NoteRecord> {
    match NoteRecord::try_from(row) {
        Ok(record) => (!record.is_expired(now)).then_some(record),
        Err(e) => {
            log::error!("discarded unreadable note: {e}");
            None
        }
    }
}
