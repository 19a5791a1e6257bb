mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kskcache::{ContentStore, Error, PlaylistItem, SyncEvent, SyncProgressCallback};
use tempfile::TempDir;

const BODY: &[u8] = b"0123456789abcdef0123456789abcdef"; // 32 octets

fn create_test_store(budget: u64) -> (TempDir, ContentStore) {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = ContentStore::new(temp_dir.path(), budget, Duration::from_secs(5)).unwrap();
    (temp_dir, store)
}

fn item(media_id: &str, url: &str) -> PlaylistItem {
    PlaylistItem {
        media_id: media_id.to_string(),
        url: format!("{}/{}.mp4", url, media_id),
        media_type: Some("video".into()),
        duration_secs: Some(10.0),
        display_name: None,
    }
}

/// Attend que le transfert en vol pour cette clé soit entièrement réglé
/// (entrée commise, éviction post-téléchargement faite, map nettoyée).
async fn wait_settled(store: &ContentStore, media_id: &str) {
    while store.current_download(media_id).await.is_some() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_ensure_downloads_and_caches() {
    let server = common::serve_bytes(BODY.to_vec(), 200, Duration::ZERO).await;
    let (_dir, store) = create_test_store(1024 * 1024);

    let spot = item("spot-1", &server.url);
    let path = store.ensure(&spot).await.unwrap();

    assert!(path.exists());
    assert_eq!(std::fs::read(&path).unwrap(), BODY);
    assert!(store.is_cached("spot-1"));
    assert_eq!(store.total_size().unwrap(), BODY.len() as u64);

    // Second appel : servi depuis le cache, aucune nouvelle requête
    let again = store.ensure(&spot).await.unwrap();
    assert_eq!(again, path);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_concurrent_ensure_single_download() {
    // Réponse retardée pour laisser les appelants concurrents s'empiler
    let server = common::serve_bytes(BODY.to_vec(), 200, Duration::from_millis(300)).await;
    let (_dir, store) = create_test_store(1024 * 1024);

    let spot = item("spot-1", &server.url);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let spot = spot.clone();
        handles.push(tokio::spawn(async move { store.ensure(&spot).await }));
    }

    for handle in handles {
        let path = handle.await.unwrap().unwrap();
        assert!(path.exists());
    }

    // Tous les appelants ont rejoint le même transfert
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_ensure_failure_propagates_no_path() {
    let server = common::serve_bytes(b"gone".to_vec(), 404, Duration::ZERO).await;
    let (dir, store) = create_test_store(1024 * 1024);

    let spot = item("spot-1", &server.url);
    let err = store.ensure(&spot).await.unwrap_err();
    assert!(matches!(err, Error::Fetch { .. }));

    assert!(!store.is_cached("spot-1"));
    wait_settled(&store, "spot-1").await;

    // Aucun fichier partiel ne survit à l'échec
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() != "index.db")
        .collect();
    assert!(leftovers.is_empty(), "leftovers: {:?}", leftovers);
}

#[tokio::test]
async fn test_self_heal_when_file_deleted_externally() {
    let server = common::serve_bytes(BODY.to_vec(), 200, Duration::ZERO).await;
    let (_dir, store) = create_test_store(1024 * 1024);

    let spot = item("spot-1", &server.url);
    let path = store.ensure(&spot).await.unwrap();
    assert!(store.is_cached("spot-1"));

    // Suppression du fichier sous les pieds du cache
    std::fs::remove_file(&path).unwrap();

    assert!(!store.is_cached("spot-1"));
    // L'entrée orpheline a été retirée de l'index
    assert_eq!(store.stats().unwrap().count, 0);

    // Un nouvel ensure re-télécharge proprement
    let path = store.ensure(&spot).await.unwrap();
    assert!(path.exists());
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_eviction_respects_budget_and_lru_order() {
    let server = common::serve_bytes(BODY.to_vec(), 200, Duration::ZERO).await;
    // Budget : 2 éléments et demi
    let (_dir, store) = create_test_store(BODY.len() as u64 * 2 + 10);

    for id in ["a", "b", "c"] {
        store.ensure(&item(id, &server.url)).await.unwrap();
        wait_settled(&store, id).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Le budget est tenu après chaque téléchargement : "a", le plus ancien,
    // a été évincé par l'arrivée de "c".
    assert!(store.total_size().unwrap() <= store.budget_bytes());
    assert!(!store.is_cached("a"));
    assert!(store.is_cached("b"));
    assert!(store.is_cached("c"));
}

#[tokio::test]
async fn test_resolve_protects_from_next_eviction() {
    let server = common::serve_bytes(BODY.to_vec(), 200, Duration::ZERO).await;
    let (_dir, store) = create_test_store(1024 * 1024);

    for id in ["a", "b"] {
        store.ensure(&item(id, &server.url)).await.unwrap();
        wait_settled(&store, id).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // "a" est accédé : "b" devient le plus ancien
    assert!(store.resolve("a").unwrap().is_some());

    store.evict_to(BODY.len() as u64).await.unwrap();

    assert!(store.is_cached("a"));
    assert!(!store.is_cached("b"));
}

#[tokio::test]
async fn test_clear_removes_everything() {
    let server = common::serve_bytes(BODY.to_vec(), 200, Duration::ZERO).await;
    let (dir, store) = create_test_store(1024 * 1024);

    store.ensure(&item("a", &server.url)).await.unwrap();
    store.ensure(&item("b", &server.url)).await.unwrap();
    for id in ["a", "b"] {
        wait_settled(&store, id).await;
    }

    store.clear().await.unwrap();

    assert_eq!(store.stats().unwrap().count, 0);
    assert_eq!(store.total_size().unwrap(), 0);
    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() != "index.db")
        .collect();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_consolidate_drops_stale_entries_and_orphans() {
    let server = common::serve_bytes(BODY.to_vec(), 200, Duration::ZERO).await;
    let (dir, store) = create_test_store(1024 * 1024);

    let path = store.ensure(&item("a", &server.url)).await.unwrap();
    wait_settled(&store, "a").await;

    // Entrée sans fichier + fichier sans entrée + .part abandonné
    std::fs::remove_file(&path).unwrap();
    std::fs::write(dir.path().join("deadbeef.mp4"), b"orphan").unwrap();
    std::fs::write(dir.path().join("cafe.mp4.part"), b"partial").unwrap();

    store.consolidate().await.unwrap();

    assert_eq!(store.stats().unwrap().count, 0);
    assert!(!dir.path().join("deadbeef.mp4").exists());
    assert!(!dir.path().join("cafe.mp4.part").exists());
    assert!(dir.path().join("index.db").exists());
}

#[tokio::test]
async fn test_sync_playlist_tolerates_individual_failures() {
    let good = common::serve_bytes(BODY.to_vec(), 200, Duration::ZERO).await;
    let bad = common::serve_bytes(b"gone".to_vec(), 404, Duration::ZERO).await;
    let (_dir, store) = create_test_store(1024 * 1024);

    let items = vec![
        item("a", &good.url),
        item("broken", &bad.url),
        item("b", &good.url),
    ];

    let aggregates = Arc::new(AtomicUsize::new(0));
    let progress: SyncProgressCallback = {
        let aggregates = aggregates.clone();
        Arc::new(move |event| {
            if let SyncEvent::Aggregate { .. } = event {
                aggregates.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    let results = store.sync_playlist(&items, Some(progress)).await;

    assert_eq!(results.len(), 3);
    assert!(results["a"].is_some());
    assert!(results["b"].is_some());
    assert!(results["broken"].is_none());
    // Une progression agrégée par élément traité
    assert_eq!(aggregates.load(Ordering::SeqCst), 3);
}
