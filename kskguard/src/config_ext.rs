//! Extension de kskconfig pour les gardes

use std::path::Path;

use kskconfig::Config;

use crate::alert::AlertClient;
use crate::crash::CrashGuard;

const DEFAULT_STATE_DIR: &str = "state";

/// Trait d'extension pour configurer les gardes via kskconfig
pub trait GuardConfigExt {
    /// Répertoire d'état persisté (default: "state", créé si absent)
    fn get_state_dir(&self) -> anyhow::Result<String>;

    /// Endpoint d'alerte critique, `None` si non configuré
    fn get_alert_url(&self) -> Option<String>;

    /// Construit la garde de crash pour la version courante du binaire
    fn create_crash_guard(&self, current_version: &str) -> anyhow::Result<CrashGuard>;

    /// Construit le client d'alerte critique
    fn create_alert_client(&self) -> AlertClient;
}

impl GuardConfigExt for Config {
    fn get_state_dir(&self) -> anyhow::Result<String> {
        self.get_managed_dir(&["guard", "state_directory"], DEFAULT_STATE_DIR)
    }

    fn get_alert_url(&self) -> Option<String> {
        self.get_optional_string(&["guard", "alert_url"])
    }

    fn create_crash_guard(&self, current_version: &str) -> anyhow::Result<CrashGuard> {
        let state_dir = self.get_state_dir()?;
        Ok(CrashGuard::new(Path::new(&state_dir), current_version))
    }

    fn create_alert_client(&self) -> AlertClient {
        AlertClient::new(self.get_alert_url())
    }
}
