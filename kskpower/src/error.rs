//! Types d'erreurs pour kskpower

/// Erreurs de planification d'alimentation
///
/// Toutes interrompent la séquence d'extinction : le device reste allumé
/// plutôt que de risquer de ne jamais se réveiller.
#[derive(Debug, thiserror::Error)]
pub enum PowerScheduleError {
    #[error("no active day within the lookahead window")]
    NoActiveDay,

    #[error("invalid start time '{0}' (expected HH:MM)")]
    InvalidStartTime(String),

    #[error("display control failed: {0}")]
    Display(String),

    #[error("wake timer install failed: {0}")]
    WakeTimer(String),

    #[error("hibernate failed: {0}")]
    Hibernate(String),

    #[error("power-down sequence cancelled")]
    Cancelled,
}

/// Type Result spécialisé pour kskpower
pub type Result<T> = std::result::Result<T, PowerScheduleError>;
