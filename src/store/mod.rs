pub mod category;
pub mod memory;
pub mod page;
pub mod profile;
pub mod session;
pub mod user;

pub use category::CategoryRepository;
pub use memory::MemoryDb;
pub use page::PageRepository;
pub use profile::ProfileRepository;
pub use session::SessionRepository;
pub use user::UserRepository;

use sqlx::{Pool, Postgres};
use thiserror::Error;

/// Backend shared by every repository.
#[derive(Clone, Debug)]
pub enum Database {
    Postgres(Pool<Postgres>),
    Memory(MemoryDb),
}

impl Database {
    pub fn in_memory() -> Self {
        Database::Memory(MemoryDb::default())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the offending column.
    #[error("unique constraint violated on {0}")]
    Conflict(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &e {
            if db_error.is_unique_violation() {
                let column = match db_error.constraint() {
                    Some(c) if c.contains("slug") => "slug",
                    Some(c) if c.contains("username") => "username",
                    _ => "name",
                };
                return StoreError::Conflict(column);
            }
        }
        StoreError::Other(e.into())
    }
}
