//! Types d'erreurs pour kskplayer

/// Erreurs de lecture
///
/// Une erreur de lecture est récupérée par l'orchestrateur en passant à
/// l'élément suivant de la playlist. Elle ne redémarre jamais le processus
/// principal.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("decoder binary not found")]
    DecoderNotFound,

    #[error("decoder spawn failed: {0}")]
    Spawn(String),

    #[error("decoder exited with code {0}")]
    Exit(i32),

    #[error("decoder wait failed: {0}")]
    Wait(String),
}

/// Type Result spécialisé pour kskplayer
pub type Result<T> = std::result::Result<T, PlaybackError>;
