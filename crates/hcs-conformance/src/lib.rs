//! Behavioural conformance suite for [`Backend`] implementations.
//!
//! Every backend a secrets manager may be configured with must pass the same
//! generic exercise: basic CRUD, listing with file/directory name pairs,
//! deletion that leaves no empty directories behind, and prefix listing at
//! several depths. The suite drives the backend only through the [`Backend`]
//! trait and panics with a description of the first step that misbehaves.
//!
//! Both exercises expect an empty backend and leave it empty on success.

use hcs_backend::{Backend, BackendResult, Entry, RequestContext};

/// Install a test-friendly `tracing` subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

async fn sorted_list<B: Backend + ?Sized>(backend: &B, ctx: &RequestContext, prefix: &str) -> Vec<String> {
    let mut keys = expect_ok(backend.list(ctx, prefix).await, "list", prefix);
    keys.sort();
    keys
}

fn expect_ok<T>(result: BackendResult<T>, op: &str, key: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{op} {key:?} failed: {err}"),
    }
}

async fn put<B: Backend + ?Sized>(backend: &B, ctx: &RequestContext, key: &str, value: &[u8]) {
    expect_ok(backend.put(ctx, &Entry::new(key, value)).await, "put", key);
}

async fn delete<B: Backend + ?Sized>(backend: &B, ctx: &RequestContext, key: &str) {
    expect_ok(backend.delete(ctx, key).await, "delete", key);
}

async fn get<B: Backend + ?Sized>(backend: &B, ctx: &RequestContext, key: &str) -> Option<Entry> {
    expect_ok(backend.get(ctx, key).await, "get", key)
}

/// CRUD and listing behaviour, including cleanup of nested directories.
pub async fn exercise_backend<B: Backend + ?Sized>(backend: &B) {
    let ctx = RequestContext::background();

    assert!(
        sorted_list(backend, &ctx, "").await.is_empty(),
        "backend must start empty"
    );

    // Deleting a missing key is not an error, and reading one yields nothing.
    delete(backend, &ctx, "foo").await;
    assert!(get(backend, &ctx, "foo").await.is_none(), "missing key returned an entry");

    put(backend, &ctx, "foo", b"test").await;
    let entry = get(backend, &ctx, "foo").await.expect("foo missing after put");
    assert_eq!(entry, Entry::new("foo", b"test".as_slice()), "foo round trip");
    assert_eq!(sorted_list(backend, &ctx, "").await, vec!["foo"], "root after put foo");

    delete(backend, &ctx, "foo").await;
    assert!(sorted_list(backend, &ctx, "").await.is_empty(), "root after delete foo");
    assert!(get(backend, &ctx, "foo").await.is_none(), "foo present after delete");

    // Repeated puts of one key.
    put(backend, &ctx, "foo", b"test").await;
    put(backend, &ctx, "foo", b"test").await;
    let entry = get(backend, &ctx, "foo").await.expect("foo missing after double put");
    assert_eq!(entry.value, b"test", "foo after double put");

    // A name can be both a leaf and a directory.
    put(backend, &ctx, "foo/bar", b"baz").await;
    let entry = get(backend, &ctx, "foo/bar").await.expect("foo/bar missing after put");
    assert_eq!(entry.value, b"baz", "foo/bar round trip");
    assert_eq!(
        sorted_list(backend, &ctx, "").await,
        vec!["foo", "foo/"],
        "root lists leaf and directory"
    );

    // Deleting the leaf keeps its namesake directory.
    delete(backend, &ctx, "foo").await;
    assert!(
        get(backend, &ctx, "foo/bar").await.is_some(),
        "deleting foo removed foo/bar"
    );

    // Removing a deeply nested key leaves no empty directories.
    put(backend, &ctx, "foo/nested1/nested2/nested3", b"baz").await;
    delete(backend, &ctx, "foo/nested1/nested2/nested3").await;
    assert_eq!(
        sorted_list(backend, &ctx, "foo/").await,
        vec!["bar"],
        "nested artifacts left under foo/"
    );

    // A directory survives while any child remains.
    put(backend, &ctx, "foo/zip", b"zap").await;
    delete(backend, &ctx, "foo/bar").await;
    assert_eq!(
        sorted_list(backend, &ctx, "").await,
        vec!["foo/"],
        "foo/ dropped while foo/zip remains"
    );

    // And disappears with the last one.
    delete(backend, &ctx, "foo/zip").await;
    assert!(
        sorted_list(backend, &ctx, "").await.is_empty(),
        "foo/ left behind after its last child"
    );

    // Deleting one of two siblings keeps the shared ancestors.
    put(backend, &ctx, "foo/nested1/nested2/value1", b"baz").await;
    put(backend, &ctx, "foo/nested1/nested2/value2", b"baz").await;
    delete(backend, &ctx, "foo/nested1/nested2/value2").await;
    assert_eq!(
        sorted_list(backend, &ctx, "").await,
        vec!["foo/"],
        "shared ancestors removed with one sibling"
    );

    delete(backend, &ctx, "foo/nested1/nested2/value1").await;
    assert!(
        sorted_list(backend, &ctx, "").await.is_empty(),
        "ancestors left behind after the last nested key"
    );
}

/// Listing at several depths of one branch.
pub async fn exercise_backend_list_prefix<B: Backend + ?Sized>(backend: &B) {
    let ctx = RequestContext::background();
    let keys = ["foo", "foo/bar", "foo/bar/baz"];

    for key in keys {
        put(backend, &ctx, key, b"test").await;
    }

    assert_eq!(
        sorted_list(backend, &ctx, "").await,
        vec!["foo", "foo/"],
        "list of root"
    );
    assert_eq!(
        sorted_list(backend, &ctx, "foo/").await,
        vec!["bar", "bar/"],
        "list of foo/"
    );
    assert_eq!(
        sorted_list(backend, &ctx, "foo/bar/").await,
        vec!["baz"],
        "list of foo/bar/"
    );

    for key in keys {
        delete(backend, &ctx, key).await;
    }
    assert!(
        sorted_list(backend, &ctx, "").await.is_empty(),
        "entries left behind after cleanup"
    );
}
