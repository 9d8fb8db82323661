pub mod schema;
pub mod store;

pub use store::TriageStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid stored value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}
