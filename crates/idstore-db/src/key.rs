//! Primary key types for identity entities.
//!
//! Users, roles and their associations share one key type per store. Any type
//! that SQLite can encode and decode can be a key once it names its column type.

use sqlx::{Decode, Encode, Sqlite, Type};
use std::fmt::Debug;
use std::hash::Hash;

/// A key type usable for user and role ids.
///
/// Implemented for `String`, `i32`, `i64` and [`uuid::Uuid`].
pub trait IdentityKey:
    Clone
    + Eq
    + Hash
    + Debug
    + Send
    + Sync
    + Unpin
    + 'static
    + for<'q> Encode<'q, Sqlite>
    + for<'r> Decode<'r, Sqlite>
    + Type<Sqlite>
{
    /// SQL column type for key columns.
    const SQL_TYPE: &'static str;
}

impl IdentityKey for String {
    const SQL_TYPE: &'static str = "TEXT";
}

impl IdentityKey for i32 {
    const SQL_TYPE: &'static str = "INTEGER";
}

impl IdentityKey for i64 {
    const SQL_TYPE: &'static str = "INTEGER";
}

impl IdentityKey for uuid::Uuid {
    const SQL_TYPE: &'static str = "BLOB";
}

/// Generates a fresh opaque stamp for concurrency and security stamps.
#[must_use]
pub fn new_stamp() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_types() {
        assert_eq!(<String as IdentityKey>::SQL_TYPE, "TEXT");
        assert_eq!(<i64 as IdentityKey>::SQL_TYPE, "INTEGER");
        assert_eq!(<uuid::Uuid as IdentityKey>::SQL_TYPE, "BLOB");
    }

    #[test]
    fn test_stamps_are_unique() {
        assert_ne!(new_stamp(), new_stamp());
    }
}
