//! Écriture atomique des fichiers d'état persistés.
//!
//! Tous les états qui doivent survivre à une coupure de courant (record de
//! crash, marqueur de version) passent par ce module : écriture dans un
//! fichier temporaire voisin puis `rename`, pour qu'une relecture ne voie
//! jamais un contenu tronqué.

use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Écrit `bytes` dans `path` de façon atomique (temp + rename).
///
/// Le fichier temporaire est créé dans le même répertoire que la cible pour
/// garantir que le `rename` reste sur le même système de fichiers.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let tmp = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Sérialise `value` en JSON et l'écrit atomiquement dans `path`.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &json)
}

/// Charge un fichier JSON persisté.
///
/// Retourne `Ok(None)` si le fichier est absent **ou** illisible/corrompu :
/// un état persisté invalide est abandonné (avec un `warn!`) et l'appelant
/// repart sur ses valeurs par défaut. La corruption n'est jamais propagée.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path=%path.display(), "Failed to read state file: {}", err);
            }
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path=%path.display(),
                "Discarding corrupted state file: {}",
                err
            );
            None
        }
    }
}
