//! Relational mapping for identity entities.
//!
//! An [`Entity`] describes its table with a [`Table`] and binds its insertable
//! columns in table order. Stores build every statement from these two
//! pieces, so an extended entity type (one that appends columns to a base
//! table) persists without store changes.
//!
//! # Example
//!
//! ```
//! use idstore_db::mapping::Table;
//!
//! let table = Table::new("user_claims")
//!     .auto_id("id")
//!     .column("user_id", "TEXT")
//!     .nullable("claim_type", "TEXT");
//!
//! assert_eq!(
//!     table.insert_sql(),
//!     "INSERT INTO user_claims (user_id, claim_type) VALUES (?, ?)"
//! );
//! ```

use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite};

/// A bindable SQLite statement.
pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A foreign key to another table, deleted in cascade with its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub table: &'static str,
    pub column: &'static str,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub nullable: bool,
    /// Assigned by the database on insert; never bound.
    pub auto_increment: bool,
    pub references: Option<Reference>,
}

impl Column {
    fn render(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.auto_increment {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
            return sql;
        }
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(reference) = &self.references {
            sql.push_str(&format!(
                " REFERENCES {}({}) ON DELETE CASCADE",
                reference.table, reference.column
            ));
        }
        sql
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: &'static str,
    columns: Vec<Column>,
    primary_key: Vec<&'static str>,
    unique: Vec<Vec<&'static str>>,
}

impl Table {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique: Vec::new(),
        }
    }

    /// Adds a `NOT NULL` column.
    #[must_use]
    pub fn column(self, name: &'static str, sql_type: &'static str) -> Self {
        self.push(name, sql_type, false)
    }

    /// Adds a nullable column.
    #[must_use]
    pub fn nullable(self, name: &'static str, sql_type: &'static str) -> Self {
        self.push(name, sql_type, true)
    }

    /// Adds an auto-increment integer primary key.
    #[must_use]
    pub fn auto_id(mut self, name: &'static str) -> Self {
        self.columns.push(Column {
            name,
            sql_type: "INTEGER",
            nullable: false,
            auto_increment: true,
            references: None,
        });
        self
    }

    /// Marks the last added column as a cascading foreign key.
    #[must_use]
    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        if let Some(last) = self.columns.last_mut() {
            last.references = Some(Reference { table, column });
        }
        self
    }

    #[must_use]
    pub fn primary_key(mut self, columns: &[&'static str]) -> Self {
        self.primary_key = columns.to_vec();
        self
    }

    #[must_use]
    pub fn unique(mut self, columns: &[&'static str]) -> Self {
        self.unique.push(columns.to_vec());
        self
    }

    fn push(mut self, name: &'static str, sql_type: &'static str, nullable: bool) -> Self {
        self.columns.push(Column {
            name,
            sql_type,
            nullable,
            auto_increment: false,
            references: None,
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns written by `INSERT` and `UPDATE`, in bind order.
    pub fn insert_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.auto_increment)
    }

    #[must_use]
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(Column::render).collect();
        if !self.primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", self.primary_key.join(", ")));
        }
        for unique in &self.unique {
            parts.push(format!("UNIQUE ({})", unique.join(", ")));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            parts.join(", ")
        )
    }

    #[must_use]
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }

    #[must_use]
    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.insert_columns().map(|c| c.name).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders
        )
    }

    /// `UPDATE <table> SET a = ?, b = ? WHERE <filter>`; the filter's
    /// placeholders are bound after the columns.
    #[must_use]
    pub fn update_sql(&self, filter: &str) -> String {
        let sets: Vec<String> = self
            .insert_columns()
            .map(|c| format!("{} = ?", c.name))
            .collect();
        format!("UPDATE {} SET {} WHERE {}", self.name, sets.join(", "), filter)
    }

    #[must_use]
    pub fn select_sql(&self, filter: &str) -> String {
        format!("SELECT * FROM {} WHERE {}", self.name, filter)
    }

    #[must_use]
    pub fn delete_sql(&self, filter: &str) -> String {
        format!("DELETE FROM {} WHERE {}", self.name, filter)
    }
}

/// A persisted row type.
///
/// `bind_columns` must bind exactly the values of
/// [`Table::insert_columns`] in the same order.
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Clone + Send + Sync + Unpin + 'static {
    fn table() -> Table;

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("users")
            .column("id", "TEXT")
            .nullable("user_name", "TEXT")
            .nullable("normalized_user_name", "TEXT")
            .primary_key(&["id"])
            .unique(&["normalized_user_name"])
    }

    #[test]
    fn test_create_sql() {
        assert_eq!(
            users().create_sql(),
            "CREATE TABLE IF NOT EXISTS users (id TEXT NOT NULL, user_name TEXT, \
             normalized_user_name TEXT, PRIMARY KEY (id), UNIQUE (normalized_user_name))"
        );
    }

    #[test]
    fn test_auto_id_and_references() {
        let table = Table::new("user_claims")
            .auto_id("id")
            .column("user_id", "TEXT")
            .references("users", "id");
        assert_eq!(
            table.create_sql(),
            "CREATE TABLE IF NOT EXISTS user_claims (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE)"
        );
        assert_eq!(table.insert_columns().count(), 1);
    }

    #[test]
    fn test_update_sql_binds_filter_last() {
        assert_eq!(
            users().update_sql("id = ? AND concurrency_stamp IS ?"),
            "UPDATE users SET id = ?, user_name = ?, normalized_user_name = ? \
             WHERE id = ? AND concurrency_stamp IS ?"
        );
    }

    #[test]
    fn test_select_delete_drop() {
        let table = users();
        assert_eq!(table.select_sql("id = ?"), "SELECT * FROM users WHERE id = ?");
        assert_eq!(table.delete_sql("id = ?"), "DELETE FROM users WHERE id = ?");
        assert_eq!(table.drop_sql(), "DROP TABLE IF EXISTS users");
        assert_eq!(table.name(), "users");
        assert_eq!(table.columns().len(), 3);
    }
}
