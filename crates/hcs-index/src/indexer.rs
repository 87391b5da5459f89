//! Ancestor-bucket computation and child-name extraction.
//!
//! For a key `a/b/c` the buckets are every directory level above the leaf,
//! root first: `.`, `a`, `a/b`. The key contributes one member to each:
//! `a/` to the root, `b/` to `a`, and `c` to `a/b`. A trailing `/` on a member
//! marks a name that has further descendants and can itself be listed.

use hcs_types::{normalize_prefix, KEY_SEPARATOR};

use crate::bucket::BucketId;

/// One `(bucket, child)` pair of the secondary index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Membership {
    pub bucket: BucketId,
    pub child: String,
}

/// The ancestor buckets of `key`, root first.
///
/// The leaf is a member of its parent's bucket, not a bucket of its own. A
/// key ending in `/` names a directory, so the key itself is included as the
/// last bucket.
///
/// ```
/// use hcs_index::buckets_of;
///
/// let names = |key| buckets_of(key).iter().map(|b| b.to_string()).collect::<Vec<_>>();
/// assert_eq!(names(""), vec!["."]);
/// assert_eq!(names("a"), vec!["."]);
/// assert_eq!(names("a/b"), vec![".", "a"]);
/// ```
pub fn buckets_of(key: &str) -> Vec<BucketId> {
    let mut buckets = vec![BucketId::root()];
    buckets.extend(
        key.match_indices(KEY_SEPARATOR)
            .map(|(idx, _)| BucketId::from_path(&key[..idx])),
    );
    buckets
}

/// The member name `key` contributes to `bucket`.
///
/// Returns the next path segment below `bucket`, with a trailing `/` when the
/// key continues past it. Returns `None` when `bucket` is not a proper
/// ancestor of `key`.
pub fn child_name_of(key: &str, bucket: &BucketId) -> Option<String> {
    let rest = if bucket.is_root() {
        key
    } else {
        key.strip_prefix(bucket.path())?
            .strip_prefix(KEY_SEPARATOR)?
    };
    if rest.is_empty() {
        return None;
    }
    Some(match rest.find(KEY_SEPARATOR) {
        Some(idx) => rest[..=idx].to_string(),
        None => rest.to_string(),
    })
}

/// The bucket one level above `bucket`, used when cascading cleanup upwards.
pub fn parent_bucket(bucket: &BucketId) -> Option<BucketId> {
    bucket.parent()
}

/// The bucket a listing of `prefix` reads.
///
/// `""`, `"foo"` and `"foo/"` map to `.`, `foo` and `foo` respectively.
pub fn bucket_for_prefix(prefix: &str) -> BucketId {
    BucketId::from_path(normalize_prefix(prefix))
}

/// Every index entry that must exist for `key` to be listable, root first.
pub fn memberships(key: &str) -> Vec<Membership> {
    buckets_of(key)
        .into_iter()
        .filter_map(|bucket| {
            let child = child_name_of(key, &bucket)?;
            Some(Membership { bucket, child })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(key: &str) -> Vec<String> {
        buckets_of(key).iter().map(|b| b.to_string()).collect()
    }

    // -----------------------------------------------------------------------
    // buckets_of
    // -----------------------------------------------------------------------

    #[test]
    fn bucket_expectations() {
        let expectations: &[(&str, &[&str])] = &[
            ("", &["."]),
            ("a", &["."]),
            ("a/b", &[".", "a"]),
            ("a/b/c/d/e", &[".", "a", "a/b", "a/b/c", "a/b/c/d"]),
        ];
        for (input, expected) in expectations {
            assert_eq!(names(input), *expected, "bad buckets for {input:?}");
        }
    }

    #[test]
    fn directory_key_includes_itself() {
        assert_eq!(names("a/b/"), vec![".", "a", "a/b"]);
    }

    // -----------------------------------------------------------------------
    // child_name_of
    // -----------------------------------------------------------------------

    #[test]
    fn child_of_root() {
        assert_eq!(child_name_of("foo", &BucketId::root()).as_deref(), Some("foo"));
        assert_eq!(
            child_name_of("foo/bar", &BucketId::root()).as_deref(),
            Some("foo/")
        );
    }

    #[test]
    fn child_of_nested_bucket() {
        let bucket = BucketId::from_path("foo/bar");
        assert_eq!(child_name_of("foo/bar/baz", &bucket).as_deref(), Some("baz"));
        assert_eq!(
            child_name_of("foo/bar/baz/qux", &bucket).as_deref(),
            Some("baz/")
        );
    }

    #[test]
    fn child_requires_segment_boundary() {
        // "ab/c" is not below "a" even though it shares a string prefix.
        assert!(child_name_of("ab/c", &BucketId::from_path("a")).is_none());
    }

    #[test]
    fn child_of_self_or_unrelated_is_none() {
        assert!(child_name_of("a/b", &BucketId::from_path("a/b")).is_none());
        assert!(child_name_of("x/y", &BucketId::from_path("a")).is_none());
        assert!(child_name_of("", &BucketId::root()).is_none());
    }

    // -----------------------------------------------------------------------
    // prefixes and memberships
    // -----------------------------------------------------------------------

    #[test]
    fn prefix_normalisation() {
        assert_eq!(bucket_for_prefix(""), BucketId::root());
        assert_eq!(bucket_for_prefix("foo"), BucketId::from_path("foo"));
        assert_eq!(bucket_for_prefix("foo/"), BucketId::from_path("foo"));
        assert_eq!(bucket_for_prefix("foo/bar/").as_str(), "foo/bar");
    }

    #[test]
    fn memberships_of_nested_key() {
        let got: Vec<(String, String)> = memberships("a/b/c")
            .into_iter()
            .map(|m| (m.bucket.to_string(), m.child))
            .collect();
        assert_eq!(
            got,
            vec![
                (".".to_string(), "a/".to_string()),
                ("a".to_string(), "b/".to_string()),
                ("a/b".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn memberships_of_top_level_key() {
        let got = memberships("foo");
        assert_eq!(got.len(), 1);
        assert!(got[0].bucket.is_root());
        assert_eq!(got[0].child, "foo");
    }

    #[test]
    fn parent_bucket_cascades_to_root() {
        let mut bucket = BucketId::from_path("a/b/c");
        let mut seen = vec![bucket.to_string()];
        while let Some(parent) = parent_bucket(&bucket) {
            seen.push(parent.to_string());
            bucket = parent;
        }
        assert_eq!(seen, vec!["a/b/c", "a/b", "a", "."]);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn key_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z0-9_-]{1,6}", 1..8).prop_map(|segments| segments.join("/"))
    }

    proptest! {
        #[test]
        fn one_bucket_per_directory_level(key in key_strategy()) {
            let segments = key.split('/').count();
            prop_assert_eq!(buckets_of(&key).len(), segments);
        }

        #[test]
        fn buckets_are_ancestors_in_order(key in key_strategy()) {
            let buckets = buckets_of(&key);
            prop_assert!(buckets[0].is_root());
            for (depth, bucket) in buckets.iter().enumerate() {
                prop_assert_eq!(bucket.depth(), depth);
                if !bucket.is_root() {
                    let dir = format!("{}/", bucket.path());
                    prop_assert!(key.starts_with(&dir));
                }
            }
        }

        #[test]
        fn every_bucket_gets_exactly_one_member(key in key_strategy()) {
            let members = memberships(&key);
            prop_assert_eq!(members.len(), buckets_of(&key).len());
            // Only the deepest member is a leaf name.
            let (last, rest) = members.split_last().unwrap();
            prop_assert!(!last.child.ends_with('/'));
            for m in rest {
                prop_assert!(m.child.ends_with('/'));
            }
        }

        #[test]
        fn members_reassemble_the_key(key in key_strategy()) {
            let rebuilt: String = memberships(&key).into_iter().map(|m| m.child).collect();
            prop_assert_eq!(rebuilt, key);
        }

        #[test]
        fn dir_names_match_parent_membership(key in key_strategy()) {
            for m in memberships(&key) {
                if let Some(parent) = parent_bucket(&m.bucket) {
                    let expected = child_name_of(&key, &parent);
                    prop_assert_eq!(m.bucket.dir_name(), expected);
                }
            }
        }
    }
}
