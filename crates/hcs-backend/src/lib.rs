//! Hierarchical key-value storage over a wide-column store.
//!
//! [`ColumnBackend`] implements the four-operation [`Backend`] interface a
//! secrets manager consumes (get, put, delete and prefix-list) on top of a
//! store that only offers point reads and writes. Listing works through a
//! secondary index: every directory level of a key is a *bucket* whose row
//! holds the set of immediate child names (see `hcs-index`).
//!
//! # Tables
//!
//! - **entries**: full key → value
//! - **buckets**: bucket id → set of child names (`foo`, `foo/`, ...)
//!
//! # Write Protocol
//!
//! 1. Put writes every bucket membership in one batch, then the entry row.
//!    A failure in between leaves a name listed with no content behind it,
//!    which the next successful write of that key repairs.
//! 2. Delete removes the entry row, then the leaf's name from its parent
//!    bucket, then prunes emptied buckets upwards. Each prune re-checks the
//!    bucket afterwards and restores the link if a concurrent Put landed.
//! 3. List reads one bucket row; it never writes.
//!
//! Nothing here retries. [`RetryBackend`] is an opt-in caller-side wrapper.

pub mod column;
pub mod error;
pub mod retry;
pub mod traits;

pub use column::ColumnBackend;
pub use error::{BackendError, BackendResult};
pub use hcs_session::RequestContext;
pub use hcs_types::Entry;
pub use retry::{RetryBackend, RetryPolicy};
pub use traits::Backend;
