//! Détection de boucle de crash sur redémarrages successifs.
//!
//! Le compteur survit au processus : un record unique est persisté
//! atomiquement dans le répertoire d'état. Chaque démarrage l'incrémente ;
//! un changement de version le remet d'abord à zéro (un nouveau binaire
//! repart avec un budget neuf) ; une fenêtre de stabilité écoulée sans
//! redémarrage pardonne tout l'historique.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Nombre de démarrages consécutifs déclenchant le Safe Mode
pub const MAX_CRASHES: u32 = 3;

/// Fenêtre de stabilité : un processus vivant aussi longtemps est réputé
/// sain et son historique de crash est pardonné
pub const STABILITY_WINDOW: Duration = Duration::from_secs(30);

const CRASH_FILE: &str = "crash.json";

/// Record de crash persisté (un seul par device)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CrashRecord {
    count: u32,
    last_version: String,
    last_crash: Option<DateTime<Utc>>,
}

/// Verdict d'un démarrage
#[derive(Debug, Clone)]
pub struct BootReport {
    /// Nombre de démarrages consécutifs sans fenêtre de stabilité
    pub crash_count: u32,
    /// La version a changé depuis le dernier démarrage
    pub version_changed: bool,
    /// Safe Mode : l'appelant doit suspendre auto-restart et auto-update
    pub safe_mode: bool,
}

/// Garde anti boucle de crash
///
/// Conçue pour être partagée derrière un `Arc` (le timer de stabilité en
/// garde une référence).
pub struct CrashGuard {
    path: PathBuf,
    current_version: String,
    record: Mutex<CrashRecord>,
}

impl CrashGuard {
    /// Charge (ou initialise) le record de crash du répertoire d'état
    ///
    /// Un record corrompu est abandonné : on repart des valeurs par défaut,
    /// jamais d'erreur remontée.
    pub fn new(state_dir: &Path, current_version: &str) -> Self {
        let path = state_dir.join(CRASH_FILE);
        let record: CrashRecord = kskutils::load_json(&path).unwrap_or_default();
        Self {
            path,
            current_version: current_version.to_string(),
            record: Mutex::new(record),
        }
    }

    /// Enregistre un démarrage du processus
    ///
    /// Si la version a changé depuis le dernier démarrage, le compteur est
    /// d'abord remis à zéro. Le compteur est ensuite incrémenté et persisté.
    /// `safe_mode` est vrai dès [`MAX_CRASHES`] démarrages consécutifs.
    pub fn register_boot(&self) -> Result<BootReport> {
        let mut record = self.record.lock().unwrap();

        let version_changed = record.last_version != self.current_version;
        if version_changed {
            record.count = 0;
            record.last_version = self.current_version.clone();
        }

        record.count += 1;
        record.last_crash = Some(Utc::now());
        kskutils::save_json(&self.path, &*record)?;

        let safe_mode = record.count >= MAX_CRASHES;
        if safe_mode {
            tracing::warn!(
                "Crash loop detected ({} consecutive starts), entering safe mode",
                record.count
            );
        }

        Ok(BootReport {
            crash_count: record.count,
            version_changed,
            safe_mode,
        })
    }

    /// Compteur courant de démarrages consécutifs
    pub fn crash_count(&self) -> u32 {
        self.record.lock().unwrap().count
    }

    /// Remet le compteur à zéro (le processus est réputé stable)
    pub fn mark_stable(&self) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        if record.count > 0 {
            record.count = 0;
            kskutils::save_json(&self.path, &*record)?;
            tracing::info!("Stability window elapsed, crash history forgiven");
        }
        Ok(())
    }

    /// Programme la remise à zéro du compteur après la fenêtre de stabilité
    ///
    /// Seuls les redémarrages survenant **avant** l'échéance comptent comme
    /// des crashs : si le processus vit jusqu'ici, l'historique est pardonné.
    pub fn start_stability_timer(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.start_stability_timer_after(STABILITY_WINDOW)
    }

    /// Variante à fenêtre explicite, pour les tests
    pub fn start_stability_timer_after(
        self: &Arc<Self>,
        window: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let guard = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Err(err) = guard.mark_stable() {
                tracing::warn!("Failed to persist stability reset: {}", err);
            }
        })
    }
}
