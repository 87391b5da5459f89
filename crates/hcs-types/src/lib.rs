//! Foundation types for hierarchical key-value storage (HCS).
//!
//! This crate provides the value types shared by every other HCS crate: the
//! stored [`Entry`], key validation and prefix normalisation, and the
//! replica [`Consistency`] levels a column store accepts per statement.
//!
//! # Key Types
//!
//! - [`Entry`]: A stored key/value pair
//! - [`Consistency`]: Replica acknowledgement policy for a read or write
//! - [`TypeError`]: Validation and parse failures

pub mod consistency;
pub mod entry;
pub mod error;
pub mod key;

pub use consistency::Consistency;
pub use entry::Entry;
pub use error::TypeError;
pub use key::{normalize_prefix, validate_key, KEY_SEPARATOR};
