//! The column-store driver boundary.
//!
//! A production deployment plugs a real driver in behind these two traits;
//! [`InMemoryCluster`](crate::InMemoryCluster) implements them in-process.

use std::sync::Arc;

use async_trait::async_trait;
use hcs_types::Consistency;

use crate::config::ClusterConfig;
use crate::error::SessionResult;
use crate::statement::{QueryResult, Statement};
use crate::tls::TlsMaterial;

/// An established, shareable session with the cluster.
///
/// Implementations must be safe for concurrent use: many statements may be
/// in flight on the same session at once.
#[async_trait]
pub trait ColumnSession: Send + Sync {
    /// Execute one statement at the given consistency level.
    ///
    /// Store failures are returned as [`SessionError::Store`](crate::SessionError::Store)
    /// and are never retried here.
    async fn execute(&self, statement: &Statement, consistency: Consistency)
        -> SessionResult<QueryResult>;

    /// Release the session's connections. Further statements fail with
    /// [`SessionError::Closed`](crate::SessionError::Closed).
    async fn close(&self);
}

/// Opens sessions to a cluster.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        config: &ClusterConfig,
        tls: Option<&TlsMaterial>,
    ) -> SessionResult<Arc<dyn ColumnSession>>;
}
