//! Types d'erreurs pour kskguard

/// Erreurs de persistance de l'état de garde
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to persist guard state: {0}")]
    Persist(#[from] std::io::Error),
}

/// Type Result spécialisé pour kskguard
pub type Result<T> = std::result::Result<T, Error>;
