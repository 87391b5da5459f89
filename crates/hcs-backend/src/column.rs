use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use hcs_index::{bucket_for_prefix, memberships, BucketId, Membership};
use hcs_session::{ClusterConfig, Connector, RequestContext, SessionManager, Statement};
use hcs_types::{validate_key, Entry};
use tracing::{debug, warn};

use crate::error::BackendResult;
use crate::traits::Backend;

// ---------------------------------------------------------------------------
// ColumnBackend
// ---------------------------------------------------------------------------

/// [`Backend`] over the entries and buckets tables of a wide-column store.
///
/// Holds no state besides the session; every operation is a short sequence of
/// single-row statements and can run concurrently with any other.
#[derive(Debug)]
pub struct ColumnBackend {
    sessions: SessionManager,
}

impl ColumnBackend {
    /// Parse `conf` and connect through `connector`.
    ///
    /// Fails with [`BackendError::Config`](crate::BackendError::Config) for a
    /// missing or malformed setting and
    /// [`BackendError::Connect`](crate::BackendError::Connect) when no session
    /// can be established.
    pub async fn new(conf: &HashMap<String, String>, connector: &dyn Connector) -> BackendResult<Self> {
        let config = ClusterConfig::from_map(conf)?;
        Self::with_config(&config, connector).await
    }

    /// Connect with an already-parsed configuration.
    pub async fn with_config(config: &ClusterConfig, connector: &dyn Connector) -> BackendResult<Self> {
        let sessions = SessionManager::connect(config, connector).await?;
        Ok(Self::from_manager(sessions))
    }

    /// Run on an existing session manager.
    pub fn from_manager(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Close the session. Later operations fail with
    /// [`BackendError::Closed`](crate::BackendError::Closed).
    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
    }

    async fn members(&self, ctx: &RequestContext, bucket: &BucketId) -> BackendResult<BTreeSet<String>> {
        let statement = Statement::SelectMembers {
            bucket: bucket.as_str().to_string(),
        };
        Ok(self.sessions.read(&statement, ctx).await?.into_members()?)
    }

    async fn add_member(&self, ctx: &RequestContext, bucket: &BucketId, member: &str) -> BackendResult<()> {
        let statement = Statement::AddMembers {
            bucket: bucket.as_str().to_string(),
            members: vec![member.to_string()],
        };
        Ok(self.sessions.write(&statement, ctx).await?.into_applied()?)
    }

    async fn remove_member(&self, ctx: &RequestContext, bucket: &BucketId, member: &str) -> BackendResult<()> {
        let statement = Statement::RemoveMembers {
            bucket: bucket.as_str().to_string(),
            members: vec![member.to_string()],
        };
        Ok(self.sessions.write(&statement, ctx).await?.into_applied()?)
    }

    /// Unlink emptied buckets from their parents, walking towards the root.
    ///
    /// Stops at the first bucket that still has members. After each unlink
    /// the bucket is read again; if a concurrent Put has added to it in the
    /// meantime, the link is restored and the walk ends.
    async fn prune(&self, ctx: &RequestContext, start: BucketId) -> BackendResult<()> {
        let mut current = start;
        while let (Some(parent), Some(dir_name)) = (current.parent(), current.dir_name()) {
            if !self.members(ctx, &current).await?.is_empty() {
                break;
            }
            debug!(bucket = %current, parent = %parent, "unlinking empty bucket");
            self.remove_member(ctx, &parent, &dir_name).await?;

            if !self.members(ctx, &current).await?.is_empty() {
                warn!(
                    bucket = %current,
                    parent = %parent,
                    "bucket repopulated during cleanup, restoring link"
                );
                self.add_member(ctx, &parent, &dir_name).await?;
                break;
            }
            current = parent;
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for ColumnBackend {
    async fn get(&self, ctx: &RequestContext, key: &str) -> BackendResult<Option<Entry>> {
        validate_key(key)?;
        debug!(key, "get");
        let statement = Statement::SelectEntry { key: key.to_string() };
        let value = self.sessions.read(&statement, ctx).await?.into_value()?;
        Ok(value.map(|value| Entry::new(key, value)))
    }

    async fn put(&self, ctx: &RequestContext, entry: &Entry) -> BackendResult<()> {
        validate_key(&entry.key)?;
        debug!(key = %entry.key, size = entry.size(), "put");

        // Index first: a failure before the entry write leaves a listed name
        // with no content, never an entry that cannot be listed.
        let links = memberships(&entry.key)
            .into_iter()
            .map(|membership| Statement::AddMembers {
                bucket: membership.bucket.as_str().to_string(),
                members: vec![membership.child],
            })
            .collect();
        self.sessions
            .write(&Statement::Batch(links), ctx)
            .await?
            .into_applied()?;

        let upsert = Statement::UpsertEntry {
            key: entry.key.clone(),
            value: entry.value.clone(),
        };
        self.sessions.write(&upsert, ctx).await?.into_applied()?;
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> BackendResult<()> {
        validate_key(key)?;
        debug!(key, "delete");

        // Entry first: a failure later leaves a stale listing, never a live
        // entry that has dropped out of its listing.
        let statement = Statement::DeleteEntry { key: key.to_string() };
        self.sessions.write(&statement, ctx).await?.into_applied()?;

        // A valid key always has at least its root membership.
        let Some(Membership { bucket: parent, child: leaf }) = memberships(key).pop() else {
            return Ok(());
        };
        self.remove_member(ctx, &parent, &leaf).await?;

        // A Put of the same key may have landed since the entry was removed;
        // its leaf link must survive.
        let statement = Statement::SelectEntry { key: key.to_string() };
        if self.sessions.read(&statement, ctx).await?.into_value()?.is_some() {
            warn!(key, bucket = %parent, "entry rewritten during delete, restoring link");
            return self.add_member(ctx, &parent, &leaf).await;
        }
        self.prune(ctx, parent).await
    }

    async fn list(&self, ctx: &RequestContext, prefix: &str) -> BackendResult<Vec<String>> {
        let bucket = bucket_for_prefix(prefix);
        debug!(prefix, bucket = %bucket, "list");
        let members = self.members(ctx, &bucket).await?;
        Ok(members.into_iter().collect())
    }
}
