//! Calcul du prochain réveil planifié.
//!
//! Fonction pure sur `NaiveDateTime` (heure murale locale) : le cœur de
//! l'algorithme reste indépendant de la plateforme et déterministe en test.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{PowerScheduleError, Result};

/// Avance de démarrage : le device doit avoir fini de booter à l'heure
/// planifiée
const LEAD_MINUTES: i64 = 1;

/// Fenêtre de recherche bornée, garantit la terminaison
const LOOKAHEAD_DAYS: i64 = 7;

/// Planning d'ouverture du device
///
/// Une seule heure de démarrage quotidienne ; les jours actifs suivent la
/// numérotation ISO (1 = lundi ... 7 = dimanche).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeSchedule {
    /// Heure de démarrage "HH:MM"
    pub start_time: String,
    /// Jours actifs (1 = lundi ... 7 = dimanche)
    pub active_days: Vec<u8>,
}

/// Calcule le prochain réveil : le plus proche instant futur tombant un
/// jour actif à l'heure de démarrage, moins l'avance de boot
///
/// Balaye jour par jour sur une fenêtre de 7 jours. Échoue avec
/// [`PowerScheduleError::NoActiveDay`] si aucun jour actif n'existe dans la
/// fenêtre — un planning « jamais actif » est une erreur dure, pas un
/// renoncement silencieux à l'extinction.
pub fn calculate_next_wake_time(
    schedule: &WakeSchedule,
    now: NaiveDateTime,
) -> Result<NaiveDateTime> {
    let start = NaiveTime::parse_from_str(&schedule.start_time, "%H:%M")
        .map_err(|_| PowerScheduleError::InvalidStartTime(schedule.start_time.clone()))?;

    for offset in 0..=LOOKAHEAD_DAYS {
        let day = now.date() + Duration::days(offset);
        let weekday = day.weekday().number_from_monday() as u8;
        if !schedule.active_days.contains(&weekday) {
            continue;
        }

        let candidate = day.and_time(start) - Duration::minutes(LEAD_MINUTES);
        if candidate > now {
            return Ok(candidate);
        }
    }

    Err(PowerScheduleError::NoActiveDay)
}
