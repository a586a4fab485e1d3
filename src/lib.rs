//! Self-destructing end-to-end encrypted notes.
//!
//! Notes are sealed on the client with a key derived from a secret that
//! never leaves it, stored as ciphertext, and deleted by the same operation
//! that hands them to their one reader. Unread notes expire.

pub mod config;
pub mod crypto;
pub mod errors;
pub mod exchange;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod store;
pub mod utils;

pub use errors::{CipherError, ExchangeError, StoreError};
pub use exchange::{IssuedNote, NoteExchange};
pub use store::{MemoryStore, NoteStore, PgStore};
