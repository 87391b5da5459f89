//! Bucket indexer for hierarchical key-value storage.
//!
//! A wide-column store cannot list "the children of `a/b`". HCS keeps a
//! secondary index instead: every directory level of a key is a *bucket*,
//! and each bucket records the set of immediate child names below it. This
//! crate is the pure half of that scheme: it decides which buckets a key
//! touches and which name the key contributes to each of them. It does no I/O.
//!
//! ```
//! use hcs_index::{buckets_of, child_name_of, BucketId};
//!
//! let buckets: Vec<String> = buckets_of("a/b/c").iter().map(|b| b.to_string()).collect();
//! assert_eq!(buckets, vec![".", "a", "a/b"]);
//!
//! assert_eq!(child_name_of("a/b/c", &BucketId::root()).as_deref(), Some("a/"));
//! assert_eq!(child_name_of("a/b/c", &BucketId::from_path("a/b")).as_deref(), Some("c"));
//! ```
//!
//! # Modules
//!
//! - [`bucket`]: The [`BucketId`] type and the root sentinel
//! - [`indexer`]: [`buckets_of`], [`child_name_of`], [`memberships`] and friends

pub mod bucket;
pub mod indexer;

pub use bucket::{BucketId, ROOT_BUCKET};
pub use indexer::{
    bucket_for_prefix, buckets_of, child_name_of, memberships, parent_bucket, Membership,
};
