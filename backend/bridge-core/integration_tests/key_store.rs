use bridge_core::error::key_store::KeyStoreError;
use bridge_core::key_store::{FileKeyStore, SharedKeyStore};

use common::RedactedSharedKey;

use tempfile::TempDir;

#[test]
fn given_empty_dir_when_retrieving_then_none() {
    let dir = TempDir::new().expect("temp dir");
    let store = FileKeyStore::new(dir.path());

    assert!(store.retrieve().expect("missing key is not an error").is_none());
}

#[test]
fn given_saved_key_when_retrieved_by_new_store_then_same_key() {
    // GIVEN: A key saved by one store
    let dir = TempDir::new().expect("temp dir");
    let key = RedactedSharedKey::from_bytes(&[42u8; 64]);
    FileKeyStore::new(dir.path()).save(&key).expect("saves");

    // WHEN: A fresh store for the same directory reads it (next session)
    let loaded = FileKeyStore::new(dir.path()).retrieve().expect("reads");

    // THEN: Same key
    assert_eq!(loaded, Some(key));
}

/// **VALUE**: The key file is private to its owner.
///
/// **WHY THIS MATTERS**: Anyone who can read it can decrypt every credential
/// exchanged with the peer.
///
/// **BUG THIS CATCHES**: Writing with the default umask-derived mode.
#[cfg(unix)]
#[test]
fn given_saved_key_when_inspecting_file_then_mode_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("temp dir");
    let mut store = FileKeyStore::new(dir.path());
    store
        .save(&RedactedSharedKey::from_bytes(&[1u8; 64]))
        .expect("saves");

    let mode = std::fs::metadata(store.path())
        .expect("key file exists")
        .permissions()
        .mode();

    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn given_empty_key_file_when_retrieving_then_corrupted() {
    let dir = TempDir::new().expect("temp dir");
    let store = FileKeyStore::new(dir.path());
    std::fs::write(store.path(), "  \n").expect("writes");

    let result = store.retrieve();

    assert!(matches!(result, Err(KeyStoreError::Corrupted { .. })));
}

#[test]
fn given_saved_key_when_cleaned_twice_then_gone_and_no_error() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = FileKeyStore::new(dir.path());
    store
        .save(&RedactedSharedKey::from_bytes(&[1u8; 64]))
        .expect("saves");

    store.clean().expect("removes");
    store.clean().expect("removing nothing is fine");

    assert!(!store.path().exists());
    assert!(store.retrieve().expect("reads").is_none());
}
