//! Types d'erreurs pour kskcache

/// Erreur réseau lors d'un transfert.
///
/// Clonable : plusieurs appelants peuvent attendre le même téléchargement et
/// chacun doit pouvoir observer l'échec.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transfer I/O error: {0}")]
    Io(String),
}

impl NetworkError {
    /// Classe une erreur reqwest dans la taxonomie réseau.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_redirect() {
            NetworkError::TooManyRedirects
        } else if let Some(status) = err.status() {
            NetworkError::Status(status.as_u16())
        } else {
            NetworkError::Connect(err.to_string())
        }
    }
}

/// Erreurs du Content Store
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Le téléchargement a échoué : l'élément n'est **pas** en cache.
    /// L'appelant doit basculer sur la lecture en streaming distant,
    /// jamais interrompre la lecture.
    #[error("download failed for {media_id}: {source}")]
    Fetch {
        media_id: String,
        #[source]
        source: NetworkError,
    },

    #[error("media not cached: {0}")]
    NotCached(String),

    #[error("HTTP client initialization failed: {0}")]
    Client(String),

    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Type Result spécialisé pour kskcache
pub type Result<T> = std::result::Result<T, Error>;
