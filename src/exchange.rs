//! The note exchange: a sender seals and deposits, a reader withdraws and
//! opens. `deposit` and `withdraw` are the server's half and never see a
//! secret; `create` and `read` are the client's half and run them around the
//! cipher engine.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::crypto::{self, SealedNote};
use crate::errors::ExchangeError;
use crate::models::note::NoteRecord;
use crate::store::NoteStore;
use crate::utils::{new_note_id, ShareLink};

/// Unread notes are dropped after a week.
pub const DEFAULT_NOTE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Upper bound for a configured lifetime. Keeps deadlines well inside what
/// both `SystemTime` and a PostgreSQL `TIMESTAMP` can hold.
pub const MAX_NOTE_TTL: Duration = Duration::from_secs(10 * 366 * 24 * 60 * 60);

/// What the sender walks away with. Only `id` was ever seen by the store.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedNote {
    pub id: String,
    pub secret: String,
}

impl IssuedNote {
    pub fn link(&self, base: &str) -> ShareLink {
        ShareLink::new(base, &self.id, &self.secret)
    }
}

impl std::fmt::Debug for IssuedNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedNote")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

pub struct NoteExchange<S: ?Sized = dyn NoteStore> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S: ?Sized> Clone for NoteExchange<S> {
    fn clone(&self) -> Self {
        NoteExchange {
            store: self.store.clone(),
            ttl: self.ttl,
        }
    }
}

impl<S: NoteStore + ?Sized> NoteExchange<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_ttl(store, DEFAULT_NOTE_TTL)
    }

    pub fn with_ttl(store: Arc<S>, ttl: Duration) -> Self {
        NoteExchange { store, ttl }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores an already sealed note under a fresh id and returns the id.
    pub fn deposit(&self, sealed: SealedNote) -> Result<String, ExchangeError> {
        self.deposit_at(sealed, SystemTime::now())
    }

    pub fn deposit_at(&self, sealed: SealedNote, now: SystemTime) -> Result<String, ExchangeError> {
        // a misconfigured lifetime is the server's fault, not the caller's
        let expires_at = now
            .checked_add(self.ttl)
            .ok_or(ExchangeError::LifetimeOverflow)?;

        let record = NoteRecord {
            id: new_note_id(),
            sealed,
            created_at: now,
            expires_at,
        };
        self.store.create(&record)?;

        log::debug!("stored note {}", record.id);
        Ok(record.id)
    }

    /// Removes the note and hands it over. Whoever gets `Ok` here is the
    /// only reader the note will ever have.
    pub fn withdraw(&self, id: &str) -> Result<NoteRecord, ExchangeError> {
        self.withdraw_at(id, SystemTime::now())
    }

    pub fn withdraw_at(&self, id: &str, now: SystemTime) -> Result<NoteRecord, ExchangeError> {
        let record = self.store.fetch_and_delete(id, now)?;
        match record {
            Some(record) => {
                log::debug!("note {} consumed", id);
                Ok(record)
            }
            None => Err(ExchangeError::NotFound),
        }
    }

    /// Seals `plaintext` and deposits it. Without a `secret` a random one is
    /// generated; an explicitly empty one is refused.
    pub fn create(&self, plaintext: &str, secret: Option<&str>) -> Result<IssuedNote, ExchangeError> {
        let secret = match secret {
            Some("") => return Err(ExchangeError::Validation("secret must not be empty".into())),
            Some(custom) => custom.to_string(),
            None => crypto::generate_secret(),
        };

        let id = self.deposit(crypto::seal(plaintext, &secret))?;
        Ok(IssuedNote { id, secret })
    }

    /// Withdraws the note and opens it with `secret`. The note is gone
    /// afterwards even when decryption fails.
    pub fn read(&self, id: &str, secret: &str) -> Result<String, ExchangeError> {
        // checked first so a broken link does not burn the note
        if id.is_empty() {
            return Err(ExchangeError::Validation("note id is required".into()));
        }
        if secret.is_empty() {
            return Err(ExchangeError::Validation("Missing encryption key".into()));
        }

        let record = self.withdraw(id)?;
        Ok(crypto::open(&record.sealed, secret)?)
    }

    pub fn read_link(&self, link: &ShareLink) -> Result<String, ExchangeError> {
        self.read(&link.id, &link.secret)
    }
}
