use prover_core::blob::BlobStore;
use prover_core::cascade::{self, CascadeStats};
use prover_core::hierarchy::{self, FileUpload};
use prover_core::storage::Database;
use prover_core::Error;
use tempfile::{tempdir, TempDir};

/// Layout (owner alice unless noted):
///   a/
///     a1.c
///     b/
///       b1.c
///       c/
///         c1.c
///   d/
///     d1.c
///   bob: e/
struct Tree {
    a: i64,
    b: i64,
    c: i64,
    d: i64,
    e: i64,
    a1: i64,
    b1: i64,
    c1: i64,
    d1: i64,
}

fn setup() -> (Database, BlobStore, TempDir) {
    let db = Database::open_in_memory().unwrap();
    let dir = tempdir().unwrap();
    let blobs = BlobStore::open(dir.path()).unwrap();
    (db, blobs, dir)
}

fn file(db: &Database, blobs: &BlobStore, name: &str, parent_id: i64) -> i64 {
    hierarchy::create_file(
        db,
        blobs,
        &FileUpload {
            owner: "alice",
            name,
            bytes: name.as_bytes(),
            description: None,
            parent_id: Some(parent_id),
        },
    )
    .unwrap()
}

fn build_tree(db: &Database, blobs: &BlobStore) -> Tree {
    let a = hierarchy::create_directory(db, "alice", "a", None, None).unwrap();
    let b = hierarchy::create_directory(db, "alice", "b", None, Some(a)).unwrap();
    let c = hierarchy::create_directory(db, "alice", "c", None, Some(b)).unwrap();
    let d = hierarchy::create_directory(db, "alice", "d", None, None).unwrap();
    let e = hierarchy::create_directory(db, "bob", "e", None, None).unwrap();
    Tree {
        a,
        b,
        c,
        d,
        e,
        a1: file(db, blobs, "a1.c", a),
        b1: file(db, blobs, "b1.c", b),
        c1: file(db, blobs, "c1.c", c),
        d1: file(db, blobs, "d1.c", d),
    }
}

fn dir_available(db: &Database, id: i64) -> bool {
    db.get_directory(id).unwrap().unwrap().availability_flag
}

fn file_available(db: &Database, id: i64) -> bool {
    db.get_file(id).unwrap().unwrap().availability_flag
}

#[test]
fn test_delete_subtree_marks_everything_below() {
    let (db, blobs, _dir) = setup();
    let t = build_tree(&db, &blobs);

    let stats = cascade::delete_subtree(&db, t.a).unwrap();
    assert_eq!(
        stats,
        CascadeStats {
            directories: 3,
            files: 3
        }
    );

    for id in [t.a, t.b, t.c] {
        assert!(!dir_available(&db, id));
    }
    for id in [t.a1, t.b1, t.c1] {
        assert!(!file_available(&db, id));
    }

    // Unrelated trees untouched.
    assert!(dir_available(&db, t.d));
    assert!(dir_available(&db, t.e));
    assert!(file_available(&db, t.d1));
}

#[test]
fn test_delete_subtree_keeps_rows() {
    let (db, blobs, _dir) = setup();
    let t = build_tree(&db, &blobs);
    cascade::delete_subtree(&db, t.a).unwrap();

    let count: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM directory", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 5);
    let count: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 4);
    assert!(blobs.path("c1.c").exists());
}

#[test]
fn test_delete_subtree_is_idempotent() {
    let (db, blobs, _dir) = setup();
    let t = build_tree(&db, &blobs);

    cascade::delete_subtree(&db, t.a).unwrap();
    let again = cascade::delete_subtree(&db, t.a).unwrap();
    assert_eq!(again, CascadeStats::default());

    for id in [t.a, t.b, t.c] {
        assert!(!dir_available(&db, id));
    }
    assert!(dir_available(&db, t.d));
}

#[test]
fn test_cascade_descends_into_already_deleted_children() {
    let (db, blobs, _dir) = setup();
    let t = build_tree(&db, &blobs);

    // c is gone on its own first; a's cascade must still visit it.
    cascade::delete_subtree(&db, t.c).unwrap();
    assert!(!file_available(&db, t.c1));
    assert!(dir_available(&db, t.b));

    let stats = cascade::delete_subtree(&db, t.a).unwrap();
    assert_eq!(
        stats,
        CascadeStats {
            directories: 2,
            files: 2
        }
    );
    assert!(!dir_available(&db, t.b));
    assert!(!file_available(&db, t.b1));
}

#[test]
fn test_deleted_subtree_disappears_from_listings() {
    let (db, blobs, _dir) = setup();
    let t = build_tree(&db, &blobs);
    cascade::delete_subtree(&db, t.b).unwrap();

    let listing = hierarchy::list_children(&db, Some(t.a), "alice").unwrap();
    assert!(listing.directories.is_empty());
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].id, t.a1);

    assert!(matches!(
        hierarchy::list_children(&db, Some(t.b), "alice").unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        hierarchy::get_file(&db, t.c1, "alice").unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_delete_subtree_missing_directory() {
    let (db, _blobs, _dir) = setup();
    let err = cascade::delete_subtree(&db, 77).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_delete_directory_requires_ownership() {
    let (db, blobs, _dir) = setup();
    let t = build_tree(&db, &blobs);

    let err = cascade::delete_directory(&db, t.a, "bob").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(dir_available(&db, t.a));

    cascade::delete_directory(&db, t.a, "alice").unwrap();
    assert!(!dir_available(&db, t.c));

    // A second owner-facing delete no longer sees the directory.
    let err = cascade::delete_directory(&db, t.a, "alice").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_delete_file_is_soft() {
    let (db, blobs, _dir) = setup();
    let t = build_tree(&db, &blobs);

    cascade::delete_file(&db, t.d1, "alice").unwrap();
    assert!(!file_available(&db, t.d1));
    assert!(blobs.path("d1.c").exists());
    assert!(hierarchy::list_children(&db, Some(t.d), "alice")
        .unwrap()
        .files
        .is_empty());

    let err = cascade::delete_file(&db, t.d1, "alice").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_purge_file_removes_row_and_blob() {
    let (db, blobs, _dir) = setup();
    let t = build_tree(&db, &blobs);

    assert!(matches!(
        cascade::purge_file(&db, &blobs, t.d1, "bob").unwrap_err(),
        Error::NotFound(_)
    ));

    cascade::delete_file(&db, t.d1, "alice").unwrap();
    cascade::purge_file(&db, &blobs, t.d1, "alice").unwrap();
    assert!(db.get_file(t.d1).unwrap().is_none());
    assert!(!blobs.path("d1.c").exists());
    assert!(db.get_file(t.c1).unwrap().is_some());
}
