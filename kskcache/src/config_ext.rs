//! Extension de kskconfig pour le cache média
//!
//! Ce module fournit le trait `ContentStoreConfigExt` qui ajoute à
//! `kskconfig::Config` les accesseurs du cache média et un constructeur.

use std::path::Path;
use std::time::Duration;

use kskconfig::Config;

use crate::store::{ContentStore, DEFAULT_DOWNLOAD_TIMEOUT};
use crate::Result;

const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_BUDGET_MB: u64 = 2048;

/// Trait d'extension pour configurer le cache média via kskconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use kskconfig::get_config;
/// use kskcache::ContentStoreConfigExt;
///
/// let config = get_config();
/// let store = config.create_content_store()?;
/// ```
pub trait ContentStoreConfigExt {
    /// Répertoire du cache média (default: "cache", créé si absent)
    fn get_cache_dir(&self) -> anyhow::Result<String>;

    /// Budget de taille du cache en octets (default: 2048 MiB)
    fn get_cache_budget_bytes(&self) -> u64;

    /// Timeout de téléchargement (default: 120 s)
    fn get_download_timeout(&self) -> Duration;

    /// Construit un [`ContentStore`] à partir de la configuration
    fn create_content_store(&self) -> Result<ContentStore>;
}

impl ContentStoreConfigExt for Config {
    fn get_cache_dir(&self) -> anyhow::Result<String> {
        self.get_managed_dir(&["cache", "directory"], DEFAULT_CACHE_DIR)
    }

    fn get_cache_budget_bytes(&self) -> u64 {
        self.get_u64_or(&["cache", "budget_mb"], DEFAULT_BUDGET_MB) * 1024 * 1024
    }

    fn get_download_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64_or(
            &["cache", "download_timeout_secs"],
            DEFAULT_DOWNLOAD_TIMEOUT.as_secs(),
        ))
    }

    fn create_content_store(&self) -> Result<ContentStore> {
        let dir = self
            .get_cache_dir()
            .map_err(|e| crate::Error::Io(std::io::Error::other(e.to_string())))?;
        ContentStore::new(
            Path::new(&dir),
            self.get_cache_budget_bytes(),
            self.get_download_timeout(),
        )
    }
}
