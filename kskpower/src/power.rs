//! Séquence d'économie d'énergie.
//!
//! Ordre strict : calcul du réveil (abandon si aucun), extinction de
//! l'écran, installation de la minuterie de réveil, attente de grâce
//! annulable, mise en veille. L'échec d'une étape avorte les suivantes —
//! le planificateur ne met jamais le device en veille sans minuterie de
//! réveil confirmée.

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio_util::sync::CancellationToken;

use crate::error::{PowerScheduleError, Result};
use crate::platform::{platform_power_control, PowerControl};
use crate::schedule::{calculate_next_wake_time, WakeSchedule};

/// Planificateur d'alimentation du device
pub struct PowerScheduler {
    control: Box<dyn PowerControl>,
}

impl PowerScheduler {
    /// Crée un planificateur sur une capacité de contrôle donnée
    pub fn new(control: Box<dyn PowerControl>) -> Self {
        Self { control }
    }

    /// Crée un planificateur sur l'implémentation de l'OS courant
    pub fn with_platform_default() -> Self {
        Self::new(platform_power_control())
    }

    /// Engage la séquence d'économie d'énergie
    ///
    /// Calcule le prochain réveil (abandon immédiat si aucun jour actif),
    /// éteint l'écran, installe la minuterie de réveil (remplaçant toute
    /// minuterie antérieure), attend `grace_period` — annulable, pour
    /// qu'une mise à jour de playlist tardive ou une action opérateur
    /// puisse encore être observée — puis met le device en veille.
    ///
    /// Retourne l'instant de réveil installé. Sur échec d'une étape, les
    /// étapes restantes sont abandonnées et l'écran est rallumé : le device
    /// reste en marche plutôt que de risquer de ne jamais se réveiller.
    pub async fn enter_power_save(
        &self,
        schedule: &WakeSchedule,
        grace_period: Duration,
        cancel: &CancellationToken,
    ) -> Result<NaiveDateTime> {
        self.enter_power_save_at(schedule, grace_period, cancel, Local::now().naive_local())
            .await
    }

    /// Variante à horloge explicite, pour les tests
    pub async fn enter_power_save_at(
        &self,
        schedule: &WakeSchedule,
        grace_period: Duration,
        cancel: &CancellationToken,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        let wake_at = calculate_next_wake_time(schedule, now)?;
        tracing::info!("Entering power save, next wake at {}", wake_at);

        self.control.display_off()?;

        if let Err(err) = self.control.install_wake_timer(wake_at) {
            tracing::warn!("Wake timer install failed, aborting power-down: {}", err);
            let _ = self.control.display_on();
            return Err(err);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Power-down cancelled during grace period");
                let _ = self.control.cancel_wake_timer();
                let _ = self.control.display_on();
                return Err(PowerScheduleError::Cancelled);
            }
            _ = tokio::time::sleep(grace_period) => {}
        }

        if let Err(err) = self.control.hibernate() {
            tracing::warn!("Hibernate failed, device stays running: {}", err);
            let _ = self.control.display_on();
            return Err(err);
        }

        Ok(wake_at)
    }

    /// Rallume l'écran (retour d'une période d'économie d'énergie)
    pub fn wake_display(&self) -> Result<()> {
        self.control.display_on()
    }
}
