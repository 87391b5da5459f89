//! Column-store session management for hierarchical storage.
//!
//! This crate owns everything between the storage adapter and the column
//! store's driver:
//!
//! - [`ClusterConfig`]: endpoints, keyspace/table names, consistency levels,
//!   credentials and TLS, parsed from the flat string map a backend is
//!   constructed with
//! - [`Statement`]: the typed statements the adapter issues against the
//!   entries and buckets tables, renderable as CQL for logs
//! - [`ColumnSession`] / [`Connector`]: the driver boundary
//! - [`SessionManager`]: one owned, pooled session with an explicit
//!   lifecycle and scoped, cancellable statement execution
//! - [`RequestContext`]: caller-supplied cancellation and deadline
//! - [`InMemoryCluster`]: an in-process wide-column store implementing the
//!   driver boundary, for tests and embedding
//!
//! # Design Rules
//!
//! 1. Connection failures are fatal at construction.
//! 2. Store errors surface verbatim; nothing here retries.
//! 3. Cancellation and deadlines are reported distinctly from store errors.
//! 4. A permit is held for exactly one statement and released on every exit
//!    path.

pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod memory;
pub mod statement;
pub mod tls;
pub mod traits;

pub use config::{ClusterConfig, Credentials, TlsConfig, TlsVersion};
pub use context::RequestContext;
pub use error::{SessionError, SessionResult};
pub use manager::{ScopedSession, SessionManager};
pub use memory::{ExecutedStatement, InMemoryCluster};
pub use statement::{QueryResult, Schema, Statement, StatementKind};
pub use tls::TlsMaterial;
pub use traits::{ColumnSession, Connector};
