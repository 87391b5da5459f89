//! Typed statements against the entries and buckets tables.
//!
//! The adapter never builds query text itself. It issues [`Statement`]s, and
//! the driver decides how to run them; [`Statement::cql`] renders the
//! equivalent CQL for logs and for drivers that speak text.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Keyspace and table names statements are rendered against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub keyspace: String,
    pub entries_table: String,
    pub buckets_table: String,
}

impl Schema {
    /// DDL for the two tables.
    pub fn create_statements(&self) -> Vec<String> {
        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {}.{} (key text PRIMARY KEY, value blob)",
                self.keyspace, self.entries_table
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {}.{} (bucket text PRIMARY KEY, children set<text>)",
                self.keyspace, self.buckets_table
            ),
        ]
    }
}

/// Discriminant of a [`Statement`], used in errors, history and fault
/// injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    SelectEntry,
    UpsertEntry,
    DeleteEntry,
    SelectMembers,
    AddMembers,
    RemoveMembers,
    Batch,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::SelectEntry => "select_entry",
            StatementKind::UpsertEntry => "upsert_entry",
            StatementKind::DeleteEntry => "delete_entry",
            StatementKind::SelectMembers => "select_members",
            StatementKind::AddMembers => "add_members",
            StatementKind::RemoveMembers => "remove_members",
            StatementKind::Batch => "batch",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single statement, or a logged batch of mutations.
#[derive(Clone, PartialEq, Eq)]
pub enum Statement {
    /// Read one entry's value.
    SelectEntry { key: String },
    /// Insert or overwrite one entry.
    UpsertEntry { key: String, value: Vec<u8> },
    /// Remove one entry. Removing an absent entry is not an error.
    DeleteEntry { key: String },
    /// Read a bucket's member set.
    SelectMembers { bucket: String },
    /// Set-add members to a bucket (idempotent).
    AddMembers { bucket: String, members: Vec<String> },
    /// Set-remove members from a bucket. A bucket left empty disappears.
    RemoveMembers { bucket: String, members: Vec<String> },
    /// Mutations applied together; the store applies all or none.
    Batch(Vec<Statement>),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::SelectEntry { .. } => StatementKind::SelectEntry,
            Statement::UpsertEntry { .. } => StatementKind::UpsertEntry,
            Statement::DeleteEntry { .. } => StatementKind::DeleteEntry,
            Statement::SelectMembers { .. } => StatementKind::SelectMembers,
            Statement::AddMembers { .. } => StatementKind::AddMembers,
            Statement::RemoveMembers { .. } => StatementKind::RemoveMembers,
            Statement::Batch(_) => StatementKind::Batch,
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Statement::SelectEntry { .. } | Statement::SelectMembers { .. }
        )
    }

    /// Render as CQL with bound values shown as `?`.
    pub fn cql(&self, schema: &Schema) -> String {
        let entries = format!("{}.{}", schema.keyspace, schema.entries_table);
        let buckets = format!("{}.{}", schema.keyspace, schema.buckets_table);
        match self {
            Statement::SelectEntry { .. } => {
                format!("SELECT value FROM {entries} WHERE key = ?")
            }
            Statement::UpsertEntry { .. } => {
                format!("INSERT INTO {entries} (key, value) VALUES (?, ?)")
            }
            Statement::DeleteEntry { .. } => format!("DELETE FROM {entries} WHERE key = ?"),
            Statement::SelectMembers { .. } => {
                format!("SELECT children FROM {buckets} WHERE bucket = ?")
            }
            Statement::AddMembers { .. } => {
                format!("UPDATE {buckets} SET children = children + ? WHERE bucket = ?")
            }
            Statement::RemoveMembers { .. } => {
                format!("UPDATE {buckets} SET children = children - ? WHERE bucket = ?")
            }
            Statement::Batch(statements) => {
                let mut cql = String::from("BEGIN BATCH ");
                for statement in statements {
                    cql.push_str(&statement.cql(schema));
                    cql.push_str("; ");
                }
                cql.push_str("APPLY BATCH");
                cql
            }
        }
    }
}

// Entry values are never written to logs.
impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::SelectEntry { key } => f.debug_struct("SelectEntry").field("key", key).finish(),
            Statement::UpsertEntry { key, value } => f
                .debug_struct("UpsertEntry")
                .field("key", key)
                .field("value_len", &value.len())
                .finish(),
            Statement::DeleteEntry { key } => f.debug_struct("DeleteEntry").field("key", key).finish(),
            Statement::SelectMembers { bucket } => f
                .debug_struct("SelectMembers")
                .field("bucket", bucket)
                .finish(),
            Statement::AddMembers { bucket, members } => f
                .debug_struct("AddMembers")
                .field("bucket", bucket)
                .field("members", members)
                .finish(),
            Statement::RemoveMembers { bucket, members } => f
                .debug_struct("RemoveMembers")
                .field("bucket", bucket)
                .field("members", members)
                .finish(),
            Statement::Batch(statements) => f.debug_tuple("Batch").field(statements).finish(),
        }
    }
}

/// What a statement produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryResult {
    /// A mutation was applied.
    Applied,
    /// An entry's value, or `None` when the row does not exist.
    Value(Option<Vec<u8>>),
    /// A bucket's members; empty when the row does not exist.
    Members(BTreeSet<String>),
}

impl QueryResult {
    fn shape(&self) -> &'static str {
        match self {
            QueryResult::Applied => "applied",
            QueryResult::Value(_) => "value",
            QueryResult::Members(_) => "members",
        }
    }

    pub fn into_value(self) -> crate::SessionResult<Option<Vec<u8>>> {
        match self {
            QueryResult::Value(value) => Ok(value),
            other => Err(crate::SessionError::UnexpectedResult {
                expected: "value",
                got: other.shape(),
            }),
        }
    }

    pub fn into_members(self) -> crate::SessionResult<BTreeSet<String>> {
        match self {
            QueryResult::Members(members) => Ok(members),
            other => Err(crate::SessionError::UnexpectedResult {
                expected: "members",
                got: other.shape(),
            }),
        }
    }

    pub fn into_applied(self) -> crate::SessionResult<()> {
        match self {
            QueryResult::Applied => Ok(()),
            other => Err(crate::SessionError::UnexpectedResult {
                expected: "applied",
                got: other.shape(),
            }),
        }
    }
}
