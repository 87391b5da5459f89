use std::sync::Arc;

use async_trait::async_trait;
use hcs_session::RequestContext;
use hcs_types::Entry;

use crate::error::BackendResult;

/// Hierarchical key-value storage.
///
/// All implementations must satisfy these invariants:
/// - `get` after a successful `put` of the same key returns that entry.
/// - `get` after a successful `delete` returns `None`; deleting an absent key
///   is not an error.
/// - `list(prefix)` returns the immediate children of `prefix`, sorted and
///   without duplicates. A child that has descendants of its own is returned
///   with a trailing `/`; a name can appear both ways (`foo` and `foo/`).
/// - `list` of a prefix with no children returns an empty list, not an error.
/// - `""` lists the root; `"foo"` and `"foo/"` list the same level.
/// - Operations abort with `Cancelled`/`DeadlineExceeded` when `ctx` does.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Read the entry stored at `key`. Returns `Ok(None)` if absent.
    async fn get(&self, ctx: &RequestContext, key: &str) -> BackendResult<Option<Entry>>;

    /// Create or overwrite `entry`.
    async fn put(&self, ctx: &RequestContext, entry: &Entry) -> BackendResult<()>;

    /// Remove the entry at `key`.
    async fn delete(&self, ctx: &RequestContext, key: &str) -> BackendResult<()>;

    /// List the immediate children of `prefix`.
    async fn list(&self, ctx: &RequestContext, prefix: &str) -> BackendResult<Vec<String>>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn get(&self, ctx: &RequestContext, key: &str) -> BackendResult<Option<Entry>> {
        (**self).get(ctx, key).await
    }

    async fn put(&self, ctx: &RequestContext, entry: &Entry) -> BackendResult<()> {
        (**self).put(ctx, entry).await
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> BackendResult<()> {
        (**self).delete(ctx, key).await
    }

    async fn list(&self, ctx: &RequestContext, prefix: &str) -> BackendResult<Vec<String>> {
        (**self).list(ctx, prefix).await
    }
}
