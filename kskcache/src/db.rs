//! Module de gestion de la base de données SQLite du cache média
//!
//! Ce module fournit l'index persistant des médias en cache : une table
//! unique clé→fichier avec comptabilité de taille et tracking des accès
//! pour la politique d'éviction LRU.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

/// Entrée de cache représentant un média dans l'index
#[derive(Debug, Serialize, Clone)]
pub struct CacheEntry {
    /// Identifiant externe stable du média
    pub media_id: String,
    /// URL source du média
    pub source_url: String,
    /// Chemin local du fichier en cache
    pub local_path: String,
    /// Taille du fichier en octets
    pub size_bytes: u64,
    /// Somme de contrôle SHA-256 (hex), si calculée
    pub checksum: Option<String>,
    /// Date/heure du téléchargement (RFC3339)
    pub downloaded_at: String,
    /// Date/heure du dernier accès (RFC3339)
    pub last_accessed: String,
    /// Ordre d'insertion, départage des égalités LRU
    pub seq: i64,
}

/// Index SQLite du cache média
///
/// Gère les métadonnées des médias en cache :
/// - Clé externe (media_id) et chemin local
/// - Comptabilité de taille pour le budget disque
/// - Tracking des accès (last_accessed, seq) pour la LRU
#[derive(Debug)]
pub struct DB {
    conn: Mutex<Connection>,
}

impl DB {
    /// Initialise l'index dans le fichier donné
    pub fn init(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS media (
                media_id TEXT PRIMARY KEY,
                source_url TEXT NOT NULL,
                local_path TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                checksum TEXT,
                downloaded_at TEXT NOT NULL,
                last_accessed TEXT NOT NULL,
                seq INTEGER NOT NULL
            )",
            [],
        )?;

        // Index composite pour la politique LRU (last_accessed puis ordre d'insertion)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_media_lru ON media (last_accessed ASC, seq ASC)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Ajoute ou remplace une entrée dans l'index
    ///
    /// Le numéro de séquence (ordre d'insertion) est attribué de façon
    /// monotone au moment de l'insertion.
    pub fn upsert(
        &self,
        media_id: &str,
        source_url: &str,
        local_path: &str,
        size_bytes: u64,
        checksum: Option<&str>,
    ) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO media (media_id, source_url, local_path, size_bytes, checksum,
                                downloaded_at, last_accessed, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6,
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM media))
             ON CONFLICT(media_id) DO UPDATE SET
                 source_url = excluded.source_url,
                 local_path = excluded.local_path,
                 size_bytes = excluded.size_bytes,
                 checksum = excluded.checksum,
                 downloaded_at = excluded.downloaded_at,
                 last_accessed = excluded.last_accessed",
            params![
                media_id,
                source_url,
                local_path,
                size_bytes as i64,
                checksum,
                now
            ],
        )?;

        Ok(())
    }

    /// Récupère une entrée par sa clé
    pub fn get(&self, media_id: &str) -> rusqlite::Result<Option<CacheEntry>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT media_id, source_url, local_path, size_bytes, checksum,
                    downloaded_at, last_accessed, seq
             FROM media WHERE media_id = ?1",
            [media_id],
            Self::map_row,
        )
        .optional()
    }

    /// Met à jour la date de dernier accès (tracking LRU)
    pub fn touch(&self, media_id: &str) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE media SET last_accessed = ?1 WHERE media_id = ?2",
            params![Utc::now().to_rfc3339(), media_id],
        )?;
        Ok(())
    }

    /// Supprime une entrée de l'index
    pub fn delete(&self, media_id: &str) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM media WHERE media_id = ?1", [media_id])?;
        Ok(())
    }

    /// Supprime toutes les entrées de l'index
    pub fn purge(&self) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM media", [])?;
        Ok(())
    }

    /// Retourne toutes les entrées de l'index
    pub fn all(&self) -> rusqlite::Result<Vec<CacheEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT media_id, source_url, local_path, size_bytes, checksum,
                    downloaded_at, last_accessed, seq
             FROM media",
        )?;
        let rows = stmt.query_map([], Self::map_row)?;
        rows.collect()
    }

    /// Retourne les entrées dans l'ordre d'éviction LRU
    ///
    /// Ordre : dernier accès le plus ancien d'abord, départage par ordre
    /// d'insertion.
    pub fn lru_order(&self) -> rusqlite::Result<Vec<CacheEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT media_id, source_url, local_path, size_bytes, checksum,
                    downloaded_at, last_accessed, seq
             FROM media ORDER BY last_accessed ASC, seq ASC",
        )?;
        let rows = stmt.query_map([], Self::map_row)?;
        rows.collect()
    }

    /// Nombre d'entrées dans l'index
    pub fn count(&self) -> rusqlite::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Taille totale en octets de tous les fichiers indexés
    pub fn total_size(&self) -> rusqlite::Result<u64> {
        let conn = self.conn.lock().unwrap();
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM media",
            [],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CacheEntry> {
        let size: i64 = row.get(3)?;
        Ok(CacheEntry {
            media_id: row.get(0)?,
            source_url: row.get(1)?,
            local_path: row.get(2)?,
            size_bytes: size.max(0) as u64,
            checksum: row.get(4)?,
            downloaded_at: row.get(5)?,
            last_accessed: row.get(6)?,
            seq: row.get(7)?,
        })
    }
}
