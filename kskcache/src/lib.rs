//! # kskcache - Cache média persistant de KioskCore
//!
//! Cette crate fournit le cache local de médias du kiosque : un index
//! SQLite clé→fichier borné en taille, rempli par un téléchargeur
//! dédupliqué, avec éviction LRU et auto-réparation des entrées orphelines.
//!
//! ## Vue d'ensemble
//!
//! - Stocker les médias de la playlist sur disque avec un index SQLite
//! - Dédupliquer les téléchargements concurrents d'une même clé
//! - Tenir un budget de taille par éviction LRU (départage par insertion)
//! - Survivre aux fichiers supprimés sous ses pieds (auto-réparation)
//! - Tolérer les échecs réseau : un média non mis en cache reste lisible
//!   en streaming distant, la lecture ne s'arrête jamais pour autant
//!
//! ## Architecture
//!
//! ```text
//! kskcache
//!     ├── db.rs     - Index SQLite (entrées, tailles, accès LRU)
//!     ├── fetch.rs  - Téléchargeur streaming + handle de transfert partagé
//!     └── store.rs  - Content Store (ensure/resolve/evict/sync)
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use kskcache::{ContentStore, PlaylistItem};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> kskcache::Result<()> {
//!     let store = ContentStore::new(
//!         Path::new("./cache"),
//!         2 * 1024 * 1024 * 1024,
//!         Duration::from_secs(120),
//!     )?;
//!
//!     let item = PlaylistItem {
//!         media_id: "spot-42".into(),
//!         url: "https://cdn.example.com/spot-42.mp4".into(),
//!         media_type: Some("video".into()),
//!         duration_secs: None,
//!         display_name: Some("Spot 42".into()),
//!     };
//!
//!     match store.ensure(&item).await {
//!         Ok(path) => println!("Lecture locale : {:?}", path),
//!         Err(kskcache::Error::Fetch { .. }) => {
//!             println!("Lecture en streaming : {}", item.url)
//!         }
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```

pub mod db;
mod error;
pub mod fetch;
mod store;

#[cfg(feature = "kskconfig")]
mod config_ext;

// Réexports publics
pub use error::{Error, NetworkError, Result};
pub use fetch::{Download, DownloadOutcome, Fetcher, ProgressCallback};
pub use store::{
    CacheStats, ContentStore, PlaylistItem, SyncEvent, SyncProgressCallback,
    DEFAULT_DOWNLOAD_TIMEOUT,
};

#[cfg(feature = "kskconfig")]
pub use config_ext::ContentStoreConfigExt;
