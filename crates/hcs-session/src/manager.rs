use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hcs_types::Consistency;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ClusterConfig;
use crate::context::RequestContext;
use crate::error::{SessionError, SessionResult};
use crate::statement::{QueryResult, Schema, Statement};
use crate::tls::TlsMaterial;
use crate::traits::{ColumnSession, Connector};

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Owner of the single pooled session a backend runs on.
///
/// Created once at backend construction and shut down explicitly. Concurrent
/// operations share the session; a semaphore bounds how many statements are
/// in flight at once (`max_parallel`). No operation holds the session beyond
/// the statement it is running.
pub struct SessionManager {
    session: Arc<dyn ColumnSession>,
    permits: Arc<Semaphore>,
    schema: Arc<Schema>,
    read_consistency: Consistency,
    write_consistency: Consistency,
    closed: AtomicBool,
}

impl SessionManager {
    /// Load TLS material and open the session.
    ///
    /// Fails if the material cannot be loaded, the connector reports an
    /// error, or the connection does not complete within
    /// `config.connect_timeout`.
    pub async fn connect(config: &ClusterConfig, connector: &dyn Connector) -> SessionResult<Self> {
        let tls = config.tls.as_ref().map(TlsMaterial::load).transpose()?;
        let hosts = config.hosts_display();

        tracing::info!(
            hosts = %hosts,
            keyspace = %config.keyspace,
            protocol_version = config.protocol_version,
            tls = tls.is_some(),
            "connecting to column store"
        );

        let session =
            match tokio::time::timeout(config.connect_timeout, connector.connect(config, tls.as_ref()))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(SessionError::Connect {
                        hosts,
                        reason: format!("timed out after {:?}", config.connect_timeout),
                    })
                }
            };

        tracing::info!(hosts = %hosts, "column store session established");
        Ok(Self::from_session(session, config))
    }

    /// Wrap an already-open session.
    ///
    /// `max_parallel` is clamped to what the permit semaphore can hold.
    pub fn from_session(session: Arc<dyn ColumnSession>, config: &ClusterConfig) -> Self {
        Self {
            session,
            permits: Arc::new(Semaphore::new(
                config.max_parallel.clamp(1, Semaphore::MAX_PERMITS),
            )),
            schema: Arc::new(config.schema()),
            read_consistency: config.read_consistency,
            write_consistency: config.write_consistency,
            closed: AtomicBool::new(false),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn read_consistency(&self) -> Consistency {
        self.read_consistency
    }

    pub fn write_consistency(&self) -> Consistency {
        self.write_consistency
    }

    /// Permits not currently held by a running statement.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Borrow the session for statements at `consistency`.
    ///
    /// Waits for a free permit. The permit returns to the pool when the
    /// [`ScopedSession`] is dropped, whatever the exit path.
    pub async fn with_session(&self, consistency: Consistency) -> SessionResult<ScopedSession> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(ScopedSession {
            session: Arc::clone(&self.session),
            schema: Arc::clone(&self.schema),
            consistency,
            _permit: permit,
        })
    }

    /// Run one statement at `consistency` under `ctx`.
    pub async fn run(
        &self,
        statement: &Statement,
        consistency: Consistency,
        ctx: &RequestContext,
    ) -> SessionResult<QueryResult> {
        let scoped = ctx.run(self.with_session(consistency)).await?;
        scoped.run(statement, ctx).await
    }

    /// Run a statement at the read consistency level.
    pub async fn read(&self, statement: &Statement, ctx: &RequestContext) -> SessionResult<QueryResult> {
        self.run(statement, self.read_consistency, ctx).await
    }

    /// Run a statement at the write consistency level.
    pub async fn write(&self, statement: &Statement, ctx: &RequestContext) -> SessionResult<QueryResult> {
        self.run(statement, self.write_consistency, ctx).await
    }

    /// Stop handing out permits and close the session. Idempotent.
    ///
    /// Statements already running finish; new ones fail with
    /// [`SessionError::Closed`].
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.permits.close();
        self.session.close().await;
        tracing::info!("column store session closed");
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("schema", &self.schema)
            .field("read_consistency", &self.read_consistency)
            .field("write_consistency", &self.write_consistency)
            .field("available_permits", &self.available_permits())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ScopedSession
// ---------------------------------------------------------------------------

/// A session borrowed from the pool at a fixed consistency level.
pub struct ScopedSession {
    session: Arc<dyn ColumnSession>,
    schema: Arc<Schema>,
    consistency: Consistency,
    _permit: OwnedSemaphorePermit,
}

impl ScopedSession {
    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    /// Execute `statement`, aborting if `ctx` is cancelled or times out.
    pub async fn run(&self, statement: &Statement, ctx: &RequestContext) -> SessionResult<QueryResult> {
        tracing::debug!(
            kind = %statement.kind(),
            consistency = %self.consistency,
            cql = %statement.cql(&self.schema),
            "executing statement"
        );
        let result = ctx
            .run(self.session.execute(statement, self.consistency))
            .await;
        if let Err(err) = &result {
            tracing::debug!(kind = %statement.kind(), error = %err, "statement failed");
        }
        result
    }
}
