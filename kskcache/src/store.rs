//! Content Store : index persistant clé→fichier avec budget de taille,
//! éviction LRU et téléchargements dédupliqués.
//!
//! Le store est l'unique propriétaire de l'index et de la map des
//! téléchargements en vol. La map est la seule structure mutée depuis
//! plusieurs chemins d'appel concurrents ; le "check-then-insert" d'un
//! nouveau transfert est atomique sous son verrou en écriture.
//!
//! Invariant : une entrée d'index implique un fichier présent. Un
//! consommateur qui trouve le fichier manquant supprime l'entrée
//! (auto-réparation) au lieu de remonter une erreur.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tokio::sync::RwLock;

use crate::db::DB;
use crate::error::{Error, NetworkError, Result};
use crate::fetch::{Download, Fetcher, ProgressCallback};

/// Nom du fichier d'index dans le répertoire du cache
const INDEX_FILE: &str = "index.db";

/// Diviseur du budget donnant la réservation par défaut quand la taille
/// réelle d'un transfert n'est pas connue avant le stream
const DEFAULT_RESERVE_DIVISOR: u64 = 10;

/// Timeout de téléchargement par défaut
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Élément de playlist tel que fourni par la source distante
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    /// Identifiant externe stable du média
    pub media_id: String,
    /// URL source
    pub url: String,
    /// Type de média ("video", "image", ...)
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    /// Durée d'affichage en secondes
    #[serde(default, rename = "duration")]
    pub duration_secs: Option<f64>,
    /// Nom lisible pour les logs et l'UI opérateur
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Agrégats du cache exposés au canal de statut opérateur
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub total_bytes: u64,
    pub usage_percent: f64,
}

/// Événement de progression d'une synchronisation de playlist
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Progression en octets d'un élément en cours de transfert
    Item {
        media_id: String,
        received: u64,
        expected: Option<u64>,
    },
    /// Progression agrégée de la passe de synchronisation
    Aggregate { completed: usize, total: usize },
}

/// Callback de progression de synchronisation
pub type SyncProgressCallback = Arc<dyn Fn(SyncEvent) + Send + Sync>;

/// Cache média persistant, borné en taille
///
/// Conçu pour être partagé : `ContentStore` se clone en surface (Arc
/// interne) et toutes les opérations prennent `&self`.
#[derive(Clone)]
pub struct ContentStore {
    inner: Arc<Inner>,
}

struct Inner {
    dir: PathBuf,
    budget_bytes: u64,
    db: DB,
    fetcher: Fetcher,
    /// Map des transferts en vol (media_id -> Download)
    downloads: RwLock<HashMap<String, Arc<Download>>>,
}

impl ContentStore {
    /// Ouvre (ou crée) un cache dans `dir` avec un budget en octets
    pub fn new(dir: &Path, budget_bytes: u64, download_timeout: Duration) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db = DB::init(&dir.join(INDEX_FILE))?;
        let fetcher = Fetcher::new(download_timeout).map_err(|e| Error::Client(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                dir: dir.to_path_buf(),
                budget_bytes,
                db,
                fetcher,
                downloads: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// Répertoire du cache
    pub fn cache_dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Chemin du fichier d'index SQLite
    pub fn index_path(&self) -> PathBuf {
        self.inner.dir.join(INDEX_FILE)
    }

    /// Budget de taille configuré, en octets
    pub fn budget_bytes(&self) -> u64 {
        self.inner.budget_bytes
    }

    /// Indique si un média est en cache (entrée d'index **et** fichier)
    ///
    /// Une entrée dont le fichier a disparu est supprimée de l'index avant
    /// de retourner `false`.
    pub fn is_cached(&self, media_id: &str) -> bool {
        match self.inner.entry_with_file(media_id) {
            Ok(entry) => entry.is_some(),
            Err(err) => {
                tracing::warn!("Cache lookup failed for {}: {}", media_id, err);
                false
            }
        }
    }

    /// Résout le chemin local d'un média en cache
    ///
    /// Met à jour la date de dernier accès (tracking LRU). Retourne
    /// `Ok(None)` si le média n'est pas en cache, y compris après
    /// auto-réparation d'une entrée orpheline.
    pub fn resolve(&self, media_id: &str) -> Result<Option<PathBuf>> {
        match self.inner.entry_with_file(media_id)? {
            Some(entry) => {
                self.inner.db.touch(media_id)?;
                Ok(Some(PathBuf::from(entry.local_path)))
            }
            None => Ok(None),
        }
    }

    /// Garantit qu'un média est en cache et retourne son chemin local
    ///
    /// Retour immédiat si déjà en cache. Sinon rejoint le transfert en vol
    /// pour cette clé s'il existe, ou en démarre un. En cas d'échec du
    /// téléchargement l'erreur [`Error::Fetch`] ne propage aucun chemin :
    /// l'appelant bascule sur la lecture en streaming de l'URL source.
    pub async fn ensure(&self, item: &PlaylistItem) -> Result<PathBuf> {
        self.ensure_with_progress(item, None).await
    }

    /// Variante de [`ensure`](Self::ensure) avec progression en octets
    ///
    /// Si un transfert est déjà en vol pour cette clé, le callback du
    /// premier appelant reste en place et celui-ci est ignoré.
    pub async fn ensure_with_progress(
        &self,
        item: &PlaylistItem,
        on_progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        if let Some(path) = self.resolve(&item.media_id)? {
            return Ok(path);
        }

        let download = {
            let mut downloads = self.inner.downloads.write().await;
            match downloads.get(&item.media_id) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight download for {}", item.media_id);
                    existing.clone()
                }
                None => {
                    let download = Download::new(&item.media_id);
                    downloads.insert(item.media_id.clone(), download.clone());
                    self.inner
                        .clone()
                        .spawn_transfer(item.clone(), download.clone(), on_progress);
                    download
                }
            }
        };

        download.wait().await.map_err(|source| Error::Fetch {
            media_id: item.media_id.clone(),
            source,
        })?;

        match self.resolve(&item.media_id)? {
            Some(path) => Ok(path),
            None => Err(Error::NotCached(item.media_id.clone())),
        }
    }

    /// Synchronise une playlist complète, séquentiellement
    ///
    /// Tolère les échecs individuels : un élément dont le téléchargement
    /// échoue est mappé sur `None` ("rester en streaming distant") sans
    /// interrompre le reste de la passe. Émet la progression par élément et
    /// la progression agrégée complétés/total.
    pub async fn sync_playlist(
        &self,
        items: &[PlaylistItem],
        on_progress: Option<SyncProgressCallback>,
    ) -> HashMap<String, Option<PathBuf>> {
        let total = items.len();
        let mut results = HashMap::new();
        let mut completed = 0usize;

        for item in items {
            let item_progress: Option<ProgressCallback> = on_progress.clone().map(|cb| {
                let media_id = item.media_id.clone();
                Arc::new(move |received: u64, expected: Option<u64>| {
                    cb(SyncEvent::Item {
                        media_id: media_id.clone(),
                        received,
                        expected,
                    })
                }) as ProgressCallback
            });

            match self.ensure_with_progress(item, item_progress).await {
                Ok(path) => {
                    results.insert(item.media_id.clone(), Some(path));
                }
                Err(err) => {
                    tracing::warn!(
                        "Playlist sync: {} stays on remote streaming ({})",
                        item.media_id,
                        err
                    );
                    results.insert(item.media_id.clone(), None);
                }
            }

            completed += 1;
            if let Some(cb) = &on_progress {
                cb(SyncEvent::Aggregate { completed, total });
            }
        }

        results
    }

    /// Taille totale indexée, en octets
    pub fn total_size(&self) -> Result<u64> {
        Ok(self.inner.db.total_size()?)
    }

    /// Agrégats du cache (nombre d'entrées, octets, pourcentage du budget)
    pub fn stats(&self) -> Result<CacheStats> {
        let count = self.inner.db.count()?;
        let total_bytes = self.inner.db.total_size()?;
        let usage_percent = if self.inner.budget_bytes > 0 {
            (total_bytes as f64 / self.inner.budget_bytes as f64) * 100.0
        } else {
            0.0
        };
        Ok(CacheStats {
            count,
            total_bytes,
            usage_percent,
        })
    }

    /// Évince les entrées les moins récemment accédées jusqu'à ce que
    /// l'usage soit au plus `target_bytes`
    ///
    /// Les égalités de dernier accès sont départagées par ordre
    /// d'insertion. Une clé avec un transfert en vol n'est jamais candidate.
    pub async fn evict_to(&self, target_bytes: u64) -> Result<usize> {
        self.inner.evict_to_target(target_bytes).await
    }

    /// Vide entièrement le cache (action opérateur explicite)
    ///
    /// Supprime toutes les entrées d'index et tous les fichiers du
    /// répertoire du cache, à l'exception de l'index lui-même.
    pub async fn clear(&self) -> Result<()> {
        self.inner.db.purge()?;

        let mut entries = tokio::fs::read_dir(&self.inner.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && path != self.inner.dir.join(INDEX_FILE) {
                tokio::fs::remove_file(&path).await?;
            }
        }

        tracing::info!("Cache cleared");
        Ok(())
    }

    /// Consolide le cache au démarrage
    ///
    /// Supprime les entrées d'index dont le fichier a disparu et les
    /// fichiers (y compris les `.part` abandonnés) sans entrée d'index.
    /// À appeler avant les premiers téléchargements.
    pub async fn consolidate(&self) -> Result<()> {
        let mut dropped = 0usize;
        let mut known: HashSet<PathBuf> = HashSet::new();

        for entry in self.inner.db.all()? {
            let path = PathBuf::from(&entry.local_path);
            if path.exists() {
                known.insert(path);
            } else {
                tracing::warn!(
                    "Cache entry {} lost its file, dropping stale entry",
                    entry.media_id
                );
                self.inner.db.delete(&entry.media_id)?;
                dropped += 1;
            }
        }

        let mut orphans = 0usize;
        let mut entries = tokio::fs::read_dir(&self.inner.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && path != self.inner.dir.join(INDEX_FILE) && !known.contains(&path)
            {
                tokio::fs::remove_file(&path).await?;
                orphans += 1;
            }
        }

        if dropped > 0 || orphans > 0 {
            tracing::info!(
                "Cache consolidated: {} stale entries dropped, {} orphan files removed",
                dropped,
                orphans
            );
        }
        Ok(())
    }

    /// Retourne le transfert en vol pour une clé, s'il existe
    pub async fn current_download(&self, media_id: &str) -> Option<Arc<Download>> {
        let downloads = self.inner.downloads.read().await;
        downloads.get(media_id).cloned()
    }
}

impl Inner {
    /// Récupère une entrée dont le fichier est encore présent
    ///
    /// Auto-réparation : une entrée dont le fichier manque est supprimée de
    /// l'index et `Ok(None)` est retourné.
    fn entry_with_file(&self, media_id: &str) -> Result<Option<crate::db::CacheEntry>> {
        match self.db.get(media_id)? {
            Some(entry) => {
                if Path::new(&entry.local_path).exists() {
                    Ok(Some(entry))
                } else {
                    tracing::warn!(
                        "Cache entry {} lost its file, dropping stale entry",
                        media_id
                    );
                    self.db.delete(media_id)?;
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Chemin du fichier de cache pour une clé
    ///
    /// Format : `{sha1(media_id)}.{extension}` — la clé externe peut
    /// contenir des caractères hostiles aux systèmes de fichiers.
    fn media_path(&self, media_id: &str, url: &str) -> PathBuf {
        let stem = hex::encode(Sha1::digest(media_id.as_bytes()));
        self.dir.join(format!("{}.{}", stem, file_extension(url)))
    }

    fn spawn_transfer(
        self: Arc<Self>,
        item: PlaylistItem,
        download: Arc<Download>,
        on_progress: Option<ProgressCallback>,
    ) {
        tokio::spawn(async move {
            let dest = self.media_path(&item.media_id, &item.url);

            // Pré-réservation : éviction LRU pour loger la taille estimée du
            // transfert avant qu'il ne commence. La taille réelle n'étant pas
            // connue, une fraction fixe du budget sert d'estimation prudente.
            let estimate = self.budget_bytes / DEFAULT_RESERVE_DIVISOR;
            let target = self.budget_bytes.saturating_sub(estimate);
            if let Err(err) = self.evict_to_target(target).await {
                tracing::warn!("Cache pre-reservation failed: {}", err);
            }

            let progress = {
                let dl = download.clone();
                let outer = on_progress.clone();
                Arc::new(move |received: u64, expected: Option<u64>| {
                    dl.update_progress(received, expected);
                    if let Some(cb) = &outer {
                        cb(received, expected);
                    }
                }) as ProgressCallback
            };

            match self.fetcher.download(&item.url, &dest, Some(progress)).await {
                Ok(outcome) => {
                    let committed = self.db.upsert(
                        &item.media_id,
                        &item.url,
                        &dest.to_string_lossy(),
                        outcome.size_bytes,
                        Some(&outcome.checksum),
                    );
                    match committed {
                        Ok(()) => {
                            tracing::debug!(
                                "Cached {} ({} bytes)",
                                item.media_id,
                                outcome.size_bytes
                            );
                            // Le budget reste tenu même quand la taille réelle
                            // dépasse l'estimation de pré-réservation.
                            if let Err(err) = self.evict_to_target(self.budget_bytes).await {
                                tracing::warn!("Post-download eviction failed: {}", err);
                            }
                            download.settle_ok();
                        }
                        Err(err) => {
                            tracing::warn!(
                                "Failed to commit cache entry for {}: {}",
                                item.media_id,
                                err
                            );
                            let _ = std::fs::remove_file(&dest);
                            download.settle_err(NetworkError::Io(err.to_string()));
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!("Download failed for {}: {}", item.media_id, err);
                    download.settle_err(err);
                }
            }

            self.downloads.write().await.remove(&item.media_id);
        });
    }

    async fn evict_to_target(&self, target: u64) -> Result<usize> {
        let mut total = self.db.total_size()?;
        if total <= target {
            return Ok(0);
        }

        let in_flight: HashSet<String> = {
            let downloads = self.downloads.read().await;
            downloads.keys().cloned().collect()
        };

        let before = total;
        let mut removed = 0usize;
        for entry in self.db.lru_order()? {
            if total <= target {
                break;
            }
            // Une clé en cours de téléchargement n'est jamais évincée
            if in_flight.contains(&entry.media_id) {
                continue;
            }

            if let Err(err) = std::fs::remove_file(&entry.local_path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        "Failed to remove evicted file {}: {}",
                        entry.local_path,
                        err
                    );
                }
            }
            self.db.delete(&entry.media_id)?;
            total = total.saturating_sub(entry.size_bytes);
            removed += 1;
        }

        if removed > 0 {
            tracing::info!(
                "LRU eviction: removed {} entries ({} -> {} bytes)",
                removed,
                before,
                total
            );
        }

        Ok(removed)
    }
}

/// Extension de fichier déduite de l'URL source, "bin" par défaut
fn file_extension(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('/').next().and_then(|name| {
        let (_, ext) = name.rsplit_once('.')?;
        (!ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .then(|| ext.to_ascii_lowercase())
    });
    ext.unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("http://cdn.example/spot.mp4"), "mp4");
        assert_eq!(file_extension("http://cdn.example/spot.mp4?token=abc"), "mp4");
        assert_eq!(file_extension("http://cdn.example/stream"), "bin");
        assert_eq!(file_extension("http://cdn.example/archive.tar.gz"), "gz");
    }
}
