//! Marqueur de dernière version appliquée.
//!
//! Un petit fichier texte dans le répertoire d'état, écrit atomiquement.
//! Lu au démarrage par le boot de mise à jour, et consommé indirectement
//! par la garde de crash via la version courante du binaire.

use std::path::Path;

const VERSION_FILE: &str = "version.txt";

/// Lit la dernière version appliquée, `None` si absente ou vide
pub fn read_last_applied(state_dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(state_dir.join(VERSION_FILE)).ok()?;
    let trimmed = content.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Écrit atomiquement le marqueur de version appliquée
pub fn write_last_applied(state_dir: &Path, version: &str) -> std::io::Result<()> {
    kskutils::atomic_write(&state_dir.join(VERSION_FILE), version.as_bytes())
}
