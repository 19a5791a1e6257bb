//! Téléchargement des médias vers le cache.
//!
//! Le `Fetcher` streame une URL vers un fichier temporaire voisin
//! (`*.part`) puis le renomme une fois le transfert complet : un fichier de
//! destination présent est toujours complet. Tout échec supprime le fichier
//! partiel et remonte une [`NetworkError`].
//!
//! L'objet [`Download`] représente un transfert en cours partagé entre
//! plusieurs appelants : le Content Store en garde un par `media_id` et les
//! demandes concurrentes pour la même clé attendent le même transfert.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::NetworkError;

/// Délai de connexion fixe
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Nombre maximal de redirections suivies (anti-boucle)
const MAX_REDIRECTS: usize = 10;
/// Période de scrutation des attentes sur un transfert en cours
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Callback de progression : (octets reçus, taille attendue si connue)
pub type ProgressCallback = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Résultat d'un transfert complet
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// Taille finale du fichier en octets
    pub size_bytes: u64,
    /// Somme de contrôle SHA-256 (hex) calculée au fil du stream
    pub checksum: String,
}

/// Client de téléchargement du cache
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Crée un fetcher avec un timeout global de transfert
    pub fn new(download_timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(download_timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| NetworkError::Connect(e.to_string()))?;

        Ok(Self { client })
    }

    /// Télécharge `url` vers `dest`
    ///
    /// Les octets sont écrits dans `dest` suffixé `.part`, renommé en `dest`
    /// une fois le stream terminé. En cas d'échec (timeout, statut non-2xx,
    /// connexion coupée, erreur disque) le fichier partiel est supprimé.
    ///
    /// # Arguments
    ///
    /// * `url` - URL source
    /// * `dest` - Chemin final du fichier
    /// * `on_progress` - Callback optionnel appelé à chaque chunk reçu
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: Option<ProgressCallback>,
    ) -> Result<DownloadOutcome, NetworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(NetworkError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()));
        }

        let expected = response.content_length();
        let part = part_path(dest);

        let result = Self::stream_to_file(response, &part, expected, on_progress).await;

        match result {
            Ok(outcome) => {
                if let Err(err) = tokio::fs::rename(&part, dest).await {
                    remove_partial(&part);
                    return Err(NetworkError::Io(err.to_string()));
                }
                Ok(outcome)
            }
            Err(err) => {
                remove_partial(&part);
                Err(err)
            }
        }
    }

    async fn stream_to_file(
        response: reqwest::Response,
        part: &Path,
        expected: Option<u64>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<DownloadOutcome, NetworkError> {
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| NetworkError::Io(e.to_string()))?;

        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut received: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(NetworkError::from_reqwest)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| NetworkError::Io(e.to_string()))?;

            hasher.update(&chunk);
            received += chunk.len() as u64;
            if let Some(ref progress) = on_progress {
                progress(received, expected);
            }
        }

        file.flush()
            .await
            .map_err(|e| NetworkError::Io(e.to_string()))?;

        Ok(DownloadOutcome {
            size_bytes: received,
            checksum: hex::encode(hasher.finalize()),
        })
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn remove_partial(part: &Path) {
    if let Err(err) = std::fs::remove_file(part) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path=%part.display(), "Failed to remove partial file: {}", err);
        }
    }
}

/// État interne d'un transfert en cours
#[derive(Debug, Clone, Default)]
struct DownloadState {
    /// Octets reçus depuis la source
    received: u64,
    /// Taille attendue (si annoncée par le serveur)
    expected: Option<u64>,
    /// Transfert réglé (succès ou échec), entrée d'index commise
    finished: bool,
    /// Erreur éventuelle du transfert
    error: Option<NetworkError>,
}

/// Transfert en cours partagé entre appelants
///
/// Le Content Store conserve un `Arc<Download>` par `media_id` en vol ; les
/// appels `ensure` concurrents pour la même clé attendent tous ce même objet
/// au lieu de lancer un second transfert.
#[derive(Debug)]
pub struct Download {
    media_id: String,
    state: RwLock<DownloadState>,
}

impl Download {
    pub(crate) fn new(media_id: &str) -> Arc<Self> {
        Arc::new(Self {
            media_id: media_id.to_string(),
            state: RwLock::new(DownloadState::default()),
        })
    }

    /// Identifiant du média en cours de transfert
    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    /// Octets reçus
    pub fn received(&self) -> u64 {
        self.state.read().unwrap().received
    }

    /// Taille attendue, si connue
    pub fn expected(&self) -> Option<u64> {
        self.state.read().unwrap().expected
    }

    /// Transfert réglé ?
    pub fn finished(&self) -> bool {
        self.state.read().unwrap().finished
    }

    /// Erreur éventuelle du transfert
    pub fn error(&self) -> Option<NetworkError> {
        self.state.read().unwrap().error.clone()
    }

    pub(crate) fn update_progress(&self, received: u64, expected: Option<u64>) {
        let mut state = self.state.write().unwrap();
        state.received = received;
        state.expected = expected;
    }

    /// Marque le transfert comme réussi. À n'appeler qu'une fois l'entrée
    /// d'index commise : `finished` implique "visible dans le cache".
    pub(crate) fn settle_ok(&self) {
        let mut state = self.state.write().unwrap();
        state.finished = true;
    }

    pub(crate) fn settle_err(&self, err: NetworkError) {
        let mut state = self.state.write().unwrap();
        state.error = Some(err);
        state.finished = true;
    }

    /// Attend que le transfert soit réglé
    pub async fn wait(&self) -> Result<(), NetworkError> {
        loop {
            {
                let state = self.state.read().unwrap();
                if let Some(ref error) = state.error {
                    return Err(error.clone());
                }
                if state.finished {
                    return Ok(());
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
