use std::fmt;

use hcs_types::KEY_SEPARATOR;
use serde::{Deserialize, Serialize};

/// Stored name of the root bucket.
///
/// The empty path cannot be a partition key in the column store, so the root
/// level is persisted under `.` (which is never a valid key segment).
pub const ROOT_BUCKET: &str = ".";

/// A directory level in the hierarchical key space.
///
/// Holds the directory path without a trailing slash (`"a/b"`), or the empty
/// string for the root.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketId {
    path: String,
}

impl BucketId {
    /// The root bucket.
    pub fn root() -> Self {
        Self {
            path: String::new(),
        }
    }

    /// Build a bucket from a directory path.
    ///
    /// `""` and the stored root name `.` both map to the root.
    pub fn from_path(path: &str) -> Self {
        if path == ROOT_BUCKET {
            return Self::root();
        }
        Self {
            path: path.to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// The directory path, empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The partition key this bucket is stored under.
    pub fn as_str(&self) -> &str {
        if self.is_root() {
            ROOT_BUCKET
        } else {
            &self.path
        }
    }

    /// Number of segments in the path; the root has depth 0.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.path.split(KEY_SEPARATOR).count()
        }
    }

    /// The bucket one level up. The root has no parent.
    pub fn parent(&self) -> Option<BucketId> {
        if self.is_root() {
            return None;
        }
        Some(match self.path.rfind(KEY_SEPARATOR) {
            Some(idx) => Self::from_path(&self.path[..idx]),
            None => Self::root(),
        })
    }

    /// Final segment of the path.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.path.rsplit(KEY_SEPARATOR).next()
    }

    /// The member name this bucket appears under in its parent (`"b/"` for
    /// `a/b`).
    pub fn dir_name(&self) -> Option<String> {
        self.name().map(|name| format!("{name}{KEY_SEPARATOR}"))
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketId({:?})", self.as_str())
    }
}
