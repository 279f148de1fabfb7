//! Query layer. Free functions take a `&Connection` so they compose inside a
//! `Database::with_tx` transaction; the `impl Database` methods are
//! single-statement conveniences for readers.

pub mod accounts;
pub mod conversations;
pub mod posts;
pub mod relationships;
pub mod stories;

use anyhow::Result;

/// Extension trait for optional query results
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
