use kskcache::db::DB;
use tempfile::TempDir;

/// Crée un index temporaire pour les tests
fn create_test_db() -> (TempDir, DB) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = DB::init(&temp_dir.path().join("index.db")).unwrap();
    (temp_dir, db)
}

#[test]
fn test_db_init() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = DB::init(&temp_dir.path().join("index.db"));
    assert!(db.is_ok());
}

#[test]
fn test_upsert_and_get() {
    let (_dir, db) = create_test_db();

    db.upsert("spot-1", "http://cdn/spot-1.mp4", "/cache/a.mp4", 1234, Some("abcd"))
        .unwrap();

    let entry = db.get("spot-1").unwrap().unwrap();
    assert_eq!(entry.media_id, "spot-1");
    assert_eq!(entry.source_url, "http://cdn/spot-1.mp4");
    assert_eq!(entry.local_path, "/cache/a.mp4");
    assert_eq!(entry.size_bytes, 1234);
    assert_eq!(entry.checksum.as_deref(), Some("abcd"));
    assert!(!entry.downloaded_at.is_empty());

    assert!(db.get("unknown").unwrap().is_none());
}

#[test]
fn test_upsert_replaces_existing() {
    let (_dir, db) = create_test_db();

    db.upsert("spot-1", "http://cdn/v1.mp4", "/cache/a.mp4", 100, None)
        .unwrap();
    db.upsert("spot-1", "http://cdn/v2.mp4", "/cache/b.mp4", 200, None)
        .unwrap();

    let entry = db.get("spot-1").unwrap().unwrap();
    assert_eq!(entry.source_url, "http://cdn/v2.mp4");
    assert_eq!(entry.size_bytes, 200);
    assert_eq!(db.count().unwrap(), 1);
}

#[test]
fn test_total_size_and_count() {
    let (_dir, db) = create_test_db();

    assert_eq!(db.total_size().unwrap(), 0);
    db.upsert("a", "http://cdn/a", "/cache/a", 100, None).unwrap();
    db.upsert("b", "http://cdn/b", "/cache/b", 250, None).unwrap();

    assert_eq!(db.count().unwrap(), 2);
    assert_eq!(db.total_size().unwrap(), 350);

    db.delete("a").unwrap();
    assert_eq!(db.count().unwrap(), 1);
    assert_eq!(db.total_size().unwrap(), 250);
}

#[test]
fn test_lru_order_follows_access_then_insertion() {
    let (_dir, db) = create_test_db();

    db.upsert("a", "http://cdn/a", "/cache/a", 1, None).unwrap();
    db.upsert("b", "http://cdn/b", "/cache/b", 1, None).unwrap();
    db.upsert("c", "http://cdn/c", "/cache/c", 1, None).unwrap();

    // Accès à "a" : il devient le plus récent
    std::thread::sleep(std::time::Duration::from_millis(10));
    db.touch("a").unwrap();

    let order: Vec<String> = db
        .lru_order()
        .unwrap()
        .into_iter()
        .map(|e| e.media_id)
        .collect();
    assert_eq!(order, vec!["b", "c", "a"]);
}

#[test]
fn test_lru_tie_broken_by_insertion_order() {
    let (_dir, db) = create_test_db();

    // Insertions rapprochées : en cas d'égalité de timestamp, l'ordre
    // d'insertion (seq) départage.
    db.upsert("first", "http://cdn/1", "/cache/1", 1, None).unwrap();
    db.upsert("second", "http://cdn/2", "/cache/2", 1, None).unwrap();

    let order: Vec<String> = db
        .lru_order()
        .unwrap()
        .into_iter()
        .map(|e| e.media_id)
        .collect();
    assert_eq!(order[0], "first");
}

#[test]
fn test_purge() {
    let (_dir, db) = create_test_db();

    db.upsert("a", "http://cdn/a", "/cache/a", 1, None).unwrap();
    db.upsert("b", "http://cdn/b", "/cache/b", 1, None).unwrap();
    db.purge().unwrap();

    assert_eq!(db.count().unwrap(), 0);
    assert_eq!(db.total_size().unwrap(), 0);
}
