//! In-process wide-column cluster for tests and embedding.
//!
//! [`InMemoryCluster`] implements [`Connector`] and hands out sessions that
//! execute [`Statement`]s against two in-memory tables. It behaves like the
//! real store where the storage adapter depends on it:
//!
//! - set-add and set-remove on bucket members are idempotent
//! - a bucket whose member set becomes empty has no row
//! - a batch is applied atomically
//! - reads at `ANY` are rejected
//!
//! It also records every statement (kind and consistency), and can inject
//! latency and per-kind failures so callers can exercise cancellation and
//! partial-failure paths.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hcs_types::Consistency;
use tokio::sync::{Mutex, RwLock};

use crate::config::{ClusterConfig, MAX_PROTOCOL_VERSION};
use crate::error::{SessionError, SessionResult};
use crate::statement::{QueryResult, Statement, StatementKind};
use crate::tls::TlsMaterial;
use crate::traits::{ColumnSession, Connector};

/// One executed statement, as seen by the cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub kind: StatementKind,
    pub consistency: Consistency,
}

#[derive(Default)]
struct Tables {
    entries: HashMap<String, Vec<u8>>,
    buckets: HashMap<String, BTreeSet<String>>,
}

struct Fault {
    kind: StatementKind,
    remaining: usize,
    message: String,
}

struct ClusterState {
    hosts: Vec<String>,
    max_protocol_version: AtomicU8,
    tables: RwLock<Tables>,
    history: Mutex<Vec<ExecutedStatement>>,
    faults: Mutex<Vec<Fault>>,
    latency_ms: AtomicU64,
    connect_latency_ms: AtomicU64,
    open_sessions: AtomicUsize,
}

/// An in-memory cluster reachable at a fixed set of hosts.
///
/// Cloning shares the same tables.
#[derive(Clone)]
pub struct InMemoryCluster {
    state: Arc<ClusterState>,
}

impl InMemoryCluster {
    /// A cluster answering on `hosts`. Entries may be bare host names
    /// (any port) or `host:port`.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(ClusterState {
                hosts: hosts.into_iter().map(Into::into).collect(),
                max_protocol_version: AtomicU8::new(MAX_PROTOCOL_VERSION),
                tables: RwLock::new(Tables::default()),
                history: Mutex::new(Vec::new()),
                faults: Mutex::new(Vec::new()),
                latency_ms: AtomicU64::new(0),
                connect_latency_ms: AtomicU64::new(0),
                open_sessions: AtomicUsize::new(0),
            }),
        }
    }

    /// Refuse connections asking for a newer protocol than `version`.
    pub fn set_max_protocol_version(&self, version: u8) {
        self.state
            .max_protocol_version
            .store(version, Ordering::Relaxed);
    }

    /// Delay every statement by `latency` before it is applied.
    pub fn set_latency(&self, latency: Duration) {
        self.state
            .latency_ms
            .store(millis(latency), Ordering::Relaxed);
    }

    /// Delay session establishment by `latency`.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.state
            .connect_latency_ms
            .store(millis(latency), Ordering::Relaxed);
    }

    /// Fail the next `times` statements of `kind` with `message`, without
    /// applying them.
    pub async fn fail_next(&self, kind: StatementKind, times: usize, message: impl Into<String>) {
        self.state.faults.lock().await.push(Fault {
            kind,
            remaining: times,
            message: message.into(),
        });
    }

    /// Every statement executed so far, in order.
    pub async fn history(&self) -> Vec<ExecutedStatement> {
        self.state.history.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.state.history.lock().await.clear();
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.state.open_sessions.load(Ordering::Acquire)
    }

    /// Read an entry row directly, bypassing sessions.
    pub async fn raw_entry(&self, key: &str) -> Option<Vec<u8>> {
        self.state.tables.read().await.entries.get(key).cloned()
    }

    /// Read a bucket row directly, bypassing sessions.
    pub async fn raw_members(&self, bucket: &str) -> BTreeSet<String> {
        self.state
            .tables
            .read()
            .await
            .buckets
            .get(bucket)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn entry_count(&self) -> usize {
        self.state.tables.read().await.entries.len()
    }

    /// Number of bucket rows (buckets with at least one member).
    pub async fn bucket_count(&self) -> usize {
        self.state.tables.read().await.buckets.len()
    }

    fn reachable(&self, endpoint: &str) -> bool {
        let host = endpoint
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(endpoint);
        self.state
            .hosts
            .iter()
            .any(|known| known == endpoint || known == host)
    }
}

// Saturates instead of wrapping for durations beyond u64 milliseconds.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for InMemoryCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCluster")
            .field("hosts", &self.state.hosts)
            .field("open_sessions", &self.open_sessions())
            .finish()
    }
}

#[async_trait]
impl Connector for InMemoryCluster {
    async fn connect(
        &self,
        config: &ClusterConfig,
        _tls: Option<&TlsMaterial>,
    ) -> SessionResult<Arc<dyn ColumnSession>> {
        let delay = self.state.connect_latency_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let max_version = self.state.max_protocol_version.load(Ordering::Relaxed);
        if config.protocol_version > max_version {
            return Err(SessionError::Connect {
                hosts: config.hosts_display(),
                reason: format!(
                    "protocol version {} not supported (max {max_version})",
                    config.protocol_version
                ),
            });
        }
        if !config.hosts.iter().any(|host| self.reachable(host)) {
            return Err(SessionError::Connect {
                hosts: config.hosts_display(),
                reason: "no hosts available".into(),
            });
        }

        self.state.open_sessions.fetch_add(1, Ordering::AcqRel);
        Ok(Arc::new(InMemorySession {
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }
}

struct InMemorySession {
    state: Arc<ClusterState>,
    closed: AtomicBool,
}

impl InMemorySession {
    async fn take_fault(&self, kind: StatementKind) -> Option<String> {
        let mut faults = self.state.faults.lock().await;
        let idx = faults
            .iter()
            .position(|fault| fault.kind == kind && fault.remaining > 0)?;
        let fault = &mut faults[idx];
        fault.remaining -= 1;
        let message = fault.message.clone();
        if fault.remaining == 0 {
            faults.remove(idx);
        }
        Some(message)
    }
}

#[async_trait]
impl ColumnSession for InMemorySession {
    async fn execute(
        &self,
        statement: &Statement,
        consistency: Consistency,
    ) -> SessionResult<QueryResult> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        let kind = statement.kind();
        self.state.history.lock().await.push(ExecutedStatement { kind, consistency });

        let delay = self.state.latency_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some(message) = self.take_fault(kind).await {
            return Err(SessionError::Store { kind, message });
        }

        if statement.is_read() {
            if !consistency.is_valid_for_reads() {
                return Err(SessionError::Store {
                    kind,
                    message: "ANY consistency is only supported for writes".into(),
                });
            }
            let tables = self.state.tables.read().await;
            return Ok(read(&tables, statement));
        }

        let mut tables = self.state.tables.write().await;
        match statement {
            Statement::Batch(statements) => {
                // Validate the whole batch before touching any row.
                if let Some(bad) = statements
                    .iter()
                    .find(|s| s.is_read() || matches!(s, Statement::Batch(_)))
                {
                    return Err(SessionError::Store {
                        kind,
                        message: format!("{} is not allowed in a batch", bad.kind()),
                    });
                }
                for statement in statements {
                    mutate(&mut tables, statement);
                }
            }
            other => mutate(&mut tables, other),
        }
        Ok(QueryResult::Applied)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.state.open_sessions.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

fn read(tables: &Tables, statement: &Statement) -> QueryResult {
    match statement {
        Statement::SelectEntry { key } => QueryResult::Value(tables.entries.get(key).cloned()),
        Statement::SelectMembers { bucket } => {
            QueryResult::Members(tables.buckets.get(bucket).cloned().unwrap_or_default())
        }
        _ => QueryResult::Applied,
    }
}

fn mutate(tables: &mut Tables, statement: &Statement) {
    match statement {
        Statement::UpsertEntry { key, value } => {
            tables.entries.insert(key.clone(), value.clone());
        }
        Statement::DeleteEntry { key } => {
            tables.entries.remove(key);
        }
        Statement::AddMembers { bucket, members } => {
            if !members.is_empty() {
                tables
                    .buckets
                    .entry(bucket.clone())
                    .or_default()
                    .extend(members.iter().cloned());
            }
        }
        Statement::RemoveMembers { bucket, members } => {
            if let Some(set) = tables.buckets.get_mut(bucket) {
                for member in members {
                    set.remove(member);
                }
                if set.is_empty() {
                    tables.buckets.remove(bucket);
                }
            }
        }
        Statement::SelectEntry { .. } | Statement::SelectMembers { .. } | Statement::Batch(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    async fn session(cluster: &InMemoryCluster) -> Arc<dyn ColumnSession> {
        let map = HashMap::from([("hosts".to_string(), "127.0.0.1:9042".to_string())]);
        let config = ClusterConfig::from_map(&map).unwrap();
        cluster.connect(&config, None).await.unwrap()
    }

    fn add(bucket: &str, members: &[&str]) -> Statement {
        Statement::AddMembers {
            bucket: bucket.into(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn remove(bucket: &str, members: &[&str]) -> Statement {
        Statement::RemoveMembers {
            bucket: bucket.into(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn select_members(bucket: &str) -> Statement {
        Statement::SelectMembers {
            bucket: bucket.into(),
        }
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn upsert_select_delete_entry() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        let s = session(&cluster).await;
        let one = Consistency::One;

        s.execute(
            &Statement::UpsertEntry {
                key: "a".into(),
                value: b"1".to_vec(),
            },
            one,
        )
        .await
        .unwrap();
        let value = s
            .execute(&Statement::SelectEntry { key: "a".into() }, one)
            .await
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(value, Some(b"1".to_vec()));

        s.execute(&Statement::DeleteEntry { key: "a".into() }, one)
            .await
            .unwrap();
        // Deleting again is fine.
        s.execute(&Statement::DeleteEntry { key: "a".into() }, one)
            .await
            .unwrap();
        assert!(cluster.raw_entry("a").await.is_none());
        assert_eq!(cluster.entry_count().await, 0);
    }

    // -----------------------------------------------------------------------
    // Buckets
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn member_sets_are_idempotent() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        let s = session(&cluster).await;
        s.execute(&add(".", &["a", "a/"]), Consistency::One).await.unwrap();
        s.execute(&add(".", &["a"]), Consistency::One).await.unwrap();

        let members = s
            .execute(&select_members("."), Consistency::One)
            .await
            .unwrap()
            .into_members()
            .unwrap();
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec!["a", "a/"]);
    }

    #[tokio::test]
    async fn empty_bucket_row_disappears() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        let s = session(&cluster).await;
        s.execute(&add("x", &["1", "2"]), Consistency::One).await.unwrap();
        s.execute(&remove("x", &["1"]), Consistency::One).await.unwrap();
        assert_eq!(cluster.bucket_count().await, 1);
        s.execute(&remove("x", &["2", "missing"]), Consistency::One)
            .await
            .unwrap();
        assert_eq!(cluster.bucket_count().await, 0);
        assert!(cluster.raw_members("x").await.is_empty());

        // Removing from an absent bucket, or adding nothing, creates no row.
        s.execute(&remove("y", &["1"]), Consistency::One).await.unwrap();
        s.execute(&add("z", &[]), Consistency::One).await.unwrap();
        assert_eq!(cluster.bucket_count().await, 0);
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn batch_applies_every_mutation() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        let s = session(&cluster).await;
        let batch = Statement::Batch(vec![add(".", &["a/"]), add("a", &["b"])]);
        s.execute(&batch, Consistency::Quorum).await.unwrap();
        assert!(cluster.raw_members(".").await.contains("a/"));
        assert!(cluster.raw_members("a").await.contains("b"));
    }

    #[tokio::test]
    async fn batch_with_read_is_rejected_whole() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        let s = session(&cluster).await;
        let batch = Statement::Batch(vec![add(".", &["a/"]), select_members(".")]);
        let err = s.execute(&batch, Consistency::One).await.unwrap_err();
        assert!(err.to_string().contains("select_members is not allowed"));
        assert_eq!(cluster.bucket_count().await, 0);
    }

    // -----------------------------------------------------------------------
    // Faults, consistency, lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn injected_fault_fires_once_per_count() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        let s = session(&cluster).await;
        cluster.fail_next(StatementKind::AddMembers, 2, "overloaded").await;

        for _ in 0..2 {
            let err = s.execute(&add(".", &["a"]), Consistency::One).await.unwrap_err();
            assert!(matches!(err, SessionError::Store { kind: StatementKind::AddMembers, .. }));
        }
        s.execute(&add(".", &["a"]), Consistency::One).await.unwrap();
        assert_eq!(cluster.history().await.len(), 3);
    }

    #[tokio::test]
    async fn reads_at_any_are_rejected() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        let s = session(&cluster).await;
        let err = s
            .execute(&select_members("."), Consistency::Any)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("only supported for writes"));
        s.execute(&add(".", &["a"]), Consistency::Any).await.unwrap();
    }

    #[tokio::test]
    async fn protocol_version_ceiling() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        cluster.set_max_protocol_version(3);
        let map = HashMap::from([
            ("hosts".to_string(), "127.0.0.1".to_string()),
            ("protocol_version".to_string(), "4".to_string()),
        ]);
        let config = ClusterConfig::from_map(&map).unwrap();
        let err = cluster.connect(&config, None).await.err().unwrap();
        assert!(err.to_string().contains("protocol version 4 not supported"));
    }

    #[tokio::test]
    async fn host_matching_by_name_or_endpoint() {
        let cluster = InMemoryCluster::new(["db1", "db2:9142"]);
        assert!(cluster.reachable("db1:9042"));
        assert!(cluster.reachable("db2:9142"));
        assert!(!cluster.reachable("db2:9042"));
        assert!(!cluster.reachable("db3:9042"));
    }

    #[tokio::test]
    async fn closed_session_rejects_statements() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        let s = session(&cluster).await;
        assert_eq!(cluster.open_sessions(), 1);
        s.close().await;
        s.close().await;
        assert_eq!(cluster.open_sessions(), 0);
        let err = s.execute(&select_members("."), Consistency::One).await.unwrap_err();
        assert!(matches!(err, SessionError::Closed));
    }

    #[tokio::test]
    async fn clones_share_tables() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        let other = cluster.clone();
        let s = session(&cluster).await;
        s.execute(&add(".", &["a"]), Consistency::One).await.unwrap();
        assert!(other.raw_members(".").await.contains("a"));
        other.clear_history().await;
        assert!(cluster.history().await.is_empty());
        assert!(format!("{other:?}").contains("InMemoryCluster"));
    }

    #[test]
    fn latency_millis_saturate() {
        assert_eq!(millis(Duration::from_millis(250)), 250);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn huge_latency_is_stored_saturated() {
        let cluster = InMemoryCluster::new(["127.0.0.1"]);
        cluster.set_latency(Duration::MAX);
        assert_eq!(cluster.state.latency_ms.load(Ordering::Relaxed), u64::MAX);
        cluster.set_connect_latency(Duration::MAX);
        assert_eq!(cluster.state.connect_latency_ms.load(Ordering::Relaxed), u64::MAX);
    }
}
