use std::fmt;

use serde::{Deserialize, Serialize};

/// A stored key/value pair.
///
/// The value is opaque to the storage layer: encryption and encoding are the
/// concern of whatever sits above it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Size of the value in bytes.
    pub fn size(&self) -> usize {
        self.value.len()
    }
}

// Values are frequently secret material, so Debug reports only their size.
impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .finish()
    }
}
