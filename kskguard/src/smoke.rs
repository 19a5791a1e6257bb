//! Checks de santé pré-installation (smoke tests).
//!
//! Exécutés une fois qu'un paquet de mise à jour est entièrement téléchargé,
//! avant son application. Sémantique ET : l'installation n'a lieu que si
//! chaque check exécuté passe. Un check dont la mesure est indisponible est
//! sauté, pas échoué (l'espace disque est consultatif). En cas d'échec le
//! device continue sur la version courante et les raisons détaillées sont
//! remontées au canal de statut opérateur.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use sysinfo::Disks;

/// Plancher d'espace disque libre exigé avant installation
pub const MIN_FREE_DISK_BYTES: u64 = 500 * 1024 * 1024;

/// Délai entre le feu vert et l'application effective, pour laisser une
/// lecture en cours se terminer proprement
pub const INSTALL_DELAY: Duration = Duration::from_secs(5);

/// Issue d'un check individuel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckOutcome {
    Pass,
    Fail,
    /// Mesure indisponible : le check ne compte ni pour ni contre
    Skipped,
}

/// Résultat d'un check individuel
#[derive(Debug, Clone, Serialize)]
pub struct SmokeCheckResult {
    pub name: &'static str,
    pub outcome: CheckOutcome,
    pub detail: String,
}

/// Rapport agrégé d'une passe de checks
#[derive(Debug, Clone, Serialize)]
pub struct SmokeReport {
    pub results: Vec<SmokeCheckResult>,
}

impl SmokeReport {
    /// Feu vert : aucun check exécuté n'a échoué
    pub fn pass(&self) -> bool {
        !self
            .results
            .iter()
            .any(|r| r.outcome == CheckOutcome::Fail)
    }

    /// Checks en échec, avec leurs détails
    pub fn failures(&self) -> Vec<&SmokeCheckResult> {
        self.results
            .iter()
            .filter(|r| r.outcome == CheckOutcome::Fail)
            .collect()
    }
}

/// Porte de sécurité pré-installation
#[derive(Debug, Clone)]
pub struct UpdateGate {
    decoder_binary: PathBuf,
    database_file: PathBuf,
    install_root: PathBuf,
    min_free_bytes: u64,
}

impl UpdateGate {
    /// Crée une porte pour les prérequis du device
    ///
    /// # Arguments
    ///
    /// * `decoder_binary` - Binaire décodeur requis par la nouvelle version
    /// * `database_file` - Index local du cache (absent ou lisible et non vide)
    /// * `install_root` - Répertoire dont le volume doit avoir l'espace requis
    pub fn new(decoder_binary: &Path, database_file: &Path, install_root: &Path) -> Self {
        Self {
            decoder_binary: decoder_binary.to_path_buf(),
            database_file: database_file.to_path_buf(),
            install_root: install_root.to_path_buf(),
            min_free_bytes: MIN_FREE_DISK_BYTES,
        }
    }

    /// Ajuste le plancher d'espace disque (tests)
    pub fn with_min_free_bytes(mut self, min_free_bytes: u64) -> Self {
        self.min_free_bytes = min_free_bytes;
        self
    }

    /// Exécute tous les checks et agrège le rapport
    pub fn evaluate(&self) -> SmokeReport {
        let results = vec![
            self.check_decoder_binary(),
            self.check_database_file(),
            self.check_disk_space(),
        ];

        for failure in results.iter().filter(|r| r.outcome == CheckOutcome::Fail) {
            tracing::warn!("Smoke check '{}' failed: {}", failure.name, failure.detail);
        }

        let report = SmokeReport { results };
        if report.pass() {
            tracing::info!("Smoke checks passed, update cleared for install");
        } else {
            tracing::warn!(
                "Update blocked by {} failing smoke check(s), staying on current version",
                report.failures().len()
            );
        }
        report
    }

    /// Attend le délai fixe entre feu vert et application
    pub async fn install_delay() {
        tokio::time::sleep(INSTALL_DELAY).await;
    }

    /// Binaire prérequis présent et lisible
    fn check_decoder_binary(&self) -> SmokeCheckResult {
        let name = "decoder-binary";
        match std::fs::File::open(&self.decoder_binary) {
            Ok(mut file) => {
                let mut byte = [0u8; 1];
                match file.read(&mut byte) {
                    Ok(_) => SmokeCheckResult {
                        name,
                        outcome: CheckOutcome::Pass,
                        detail: format!("{} readable", self.decoder_binary.display()),
                    },
                    Err(err) => SmokeCheckResult {
                        name,
                        outcome: CheckOutcome::Fail,
                        detail: format!("{} unreadable: {}", self.decoder_binary.display(), err),
                    },
                }
            }
            Err(err) => SmokeCheckResult {
                name,
                outcome: CheckOutcome::Fail,
                detail: format!("{} missing: {}", self.decoder_binary.display(), err),
            },
        }
    }

    /// Index local absent, ou lisible et non vide
    fn check_database_file(&self) -> SmokeCheckResult {
        let name = "local-database";
        if !self.database_file.exists() {
            return SmokeCheckResult {
                name,
                outcome: CheckOutcome::Pass,
                detail: "absent (fresh install)".to_string(),
            };
        }
        match std::fs::metadata(&self.database_file) {
            Ok(meta) if meta.len() > 0 => SmokeCheckResult {
                name,
                outcome: CheckOutcome::Pass,
                detail: format!("{} bytes", meta.len()),
            },
            Ok(_) => SmokeCheckResult {
                name,
                outcome: CheckOutcome::Fail,
                detail: format!("{} is empty", self.database_file.display()),
            },
            Err(err) => SmokeCheckResult {
                name,
                outcome: CheckOutcome::Fail,
                detail: format!("{} unreadable: {}", self.database_file.display(), err),
            },
        }
    }

    /// Espace disque libre au-dessus du plancher — sautable quand la mesure
    /// est indisponible, l'espace disque est consultatif
    fn check_disk_space(&self) -> SmokeCheckResult {
        let name = "disk-space";
        let disks = Disks::new_with_refreshed_list();

        // Volume portant install_root : point de montage préfixe le plus long
        let available = disks
            .list()
            .iter()
            .filter(|disk| self.install_root.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space());

        match available {
            Some(available) if available >= self.min_free_bytes => SmokeCheckResult {
                name,
                outcome: CheckOutcome::Pass,
                detail: format!("{} bytes available", available),
            },
            Some(available) => SmokeCheckResult {
                name,
                outcome: CheckOutcome::Fail,
                detail: format!(
                    "{} bytes available, {} required",
                    available, self.min_free_bytes
                ),
            },
            None => SmokeCheckResult {
                name,
                outcome: CheckOutcome::Skipped,
                detail: "disk space query unavailable".to_string(),
            },
        }
    }
}
