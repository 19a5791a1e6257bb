//! Supervision du processus décodeur externe.
//!
//! Machine à états sur un slot unique : `Idle -> Launching -> Playing ->
//! (Idle | Failed)`. Le superviseur possède au plus un processus enfant à la
//! fois ; `play()` arrête complètement le décodeur courant (terminaison
//! gracieuse puis kill forcé, sortie confirmée) avant d'en lancer un autre —
//! jamais deux décodeurs vivants simultanément.

use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::Mutex;

use crate::command::DecoderCommand;
use crate::error::{PlaybackError, Result};

/// Période de scrutation de l'état du processus enfant
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Délai de terminaison gracieuse par défaut avant kill forcé
pub const DEFAULT_TERM_GRACE: Duration = Duration::from_secs(3);

/// États observables du superviseur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Aucun décodeur en cours
    Idle,
    /// Décodeur en cours de lancement
    Launching,
    /// Décodeur vivant, lecture en cours
    Playing,
    /// Dernière lecture terminée en erreur
    Failed,
}

/// Processus décodeur actif dans le slot
struct Active {
    child: Child,
    generation: u64,
}

/// Superviseur du décodeur externe
///
/// Conçu pour être partagé derrière un `Arc` : toutes les opérations
/// prennent `&self`. Le flux d'appel nominal est séquentiel (l'orchestrateur
/// enchaîne les éléments de playlist) ; les appels concurrents restent sûrs,
/// le dernier `play()` gagne et les précédents se résolvent comme des arrêts.
pub struct PlaybackSupervisor {
    command: DecoderCommand,
    term_grace: Duration,
    slot: Mutex<Option<Active>>,
    state: StdMutex<PlayerState>,
    generation: AtomicU64,
}

impl PlaybackSupervisor {
    /// Crée un superviseur pour une commande décodeur donnée
    pub fn new(command: DecoderCommand, term_grace: Duration) -> Self {
        Self {
            command,
            term_grace,
            slot: Mutex::new(None),
            state: StdMutex::new(PlayerState::Idle),
            generation: AtomicU64::new(0),
        }
    }

    /// Crée un superviseur avec le décodeur localisé sur la machine
    pub fn with_default_decoder() -> Result<Self> {
        let command = DecoderCommand::locate().ok_or(PlaybackError::DecoderNotFound)?;
        Ok(Self::new(command, DEFAULT_TERM_GRACE))
    }

    /// Le décodeur est-il localisable, sans lancer de lecture ?
    pub fn is_available(&self) -> bool {
        self.command.is_available()
    }

    /// État courant du superviseur
    pub fn state(&self) -> PlayerState {
        *self.state.lock().unwrap()
    }

    /// PID du décodeur en cours, s'il y en a un
    pub async fn current_pid(&self) -> Option<u32> {
        let slot = self.slot.lock().await;
        slot.as_ref().and_then(|active| active.child.id())
    }

    /// Lance la lecture d'un média (chemin local ou URL)
    ///
    /// Arrête d'abord tout décodeur en cours (sortie confirmée), puis lance
    /// le nouveau processus. Se résout quand le décodeur sort avec le code 0
    /// ou sur signal (terminaison normale) ; échoue avec
    /// [`PlaybackError::Exit`] pour tout code non nul et
    /// [`PlaybackError::Spawn`] si le lancement échoue.
    pub async fn play(&self, media: impl AsRef<OsStr>) -> Result<()> {
        self.stop().await;

        self.set_state(PlayerState::Launching);
        let mut cmd = self.command.build(media.as_ref());
        let child = cmd.spawn().map_err(|err| {
            self.set_state(PlayerState::Failed);
            PlaybackError::Spawn(err.to_string())
        })?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            "Decoder launched (pid {:?}, gen {})",
            child.id(),
            generation
        );

        // Installe le processus dans le slot. Si un play concurrent l'a
        // rempli entre temps, son occupant est arrêté : un seul décodeur
        // vivant à la fois.
        let mut incoming = Some(Active { child, generation });
        loop {
            let previous = {
                let mut slot = self.slot.lock().await;
                match slot.take() {
                    None => {
                        *slot = incoming.take();
                        None
                    }
                    Some(previous) => Some(previous),
                }
            };
            match previous {
                None => break,
                Some(mut previous) => self.terminate(&mut previous.child).await,
            }
        }
        self.set_state(PlayerState::Playing);

        self.wait_exit(generation).await
    }

    /// Attend la sortie du processus de la génération donnée
    async fn wait_exit(&self, generation: u64) -> Result<()> {
        loop {
            {
                let mut slot = self.slot.lock().await;
                match slot.as_mut() {
                    Some(active) if active.generation == generation => {
                        match active.child.try_wait() {
                            Ok(Some(status)) => {
                                *slot = None;
                                drop(slot);
                                return self.finish(status);
                            }
                            Ok(None) => {}
                            Err(err) => {
                                *slot = None;
                                drop(slot);
                                self.set_state(PlayerState::Failed);
                                return Err(PlaybackError::Wait(err.to_string()));
                            }
                        }
                    }
                    // Slot vide ou repris par un play plus récent : le
                    // processus a été arrêté, terminaison normale.
                    _ => return Ok(()),
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Arrête le décodeur en cours
    ///
    /// Idempotent : sans décodeur actif, ne fait rien. Envoie une demande de
    /// terminaison gracieuse puis, passé le délai de grâce, un kill forcé.
    /// Ne retourne qu'après confirmation de la sortie du processus.
    pub async fn stop(&self) {
        let active = { self.slot.lock().await.take() };
        if let Some(mut active) = active {
            tracing::debug!("Stopping decoder (gen {})", active.generation);
            self.terminate(&mut active.child).await;
            self.set_state(PlayerState::Idle);
        }
    }

    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                // Terminaison gracieuse d'abord
                unsafe {
                    libc::kill(pid as i32, libc::SIGTERM);
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }

        match tokio::time::timeout(self.term_grace, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("Decoder exited after terminate: {:?}", status);
            }
            Ok(Err(err)) => {
                tracing::warn!("Failed to reap decoder: {}", err);
            }
            Err(_) => {
                tracing::warn!("Decoder ignored terminate, killing");
                if let Err(err) = child.kill().await {
                    tracing::warn!("Failed to kill decoder: {}", err);
                }
            }
        }
    }

    fn finish(&self, status: std::process::ExitStatus) -> Result<()> {
        match status.code() {
            // Code 0 ou sortie sur signal : terminaison normale
            Some(0) | None => {
                self.set_state(PlayerState::Idle);
                Ok(())
            }
            Some(code) => {
                self.set_state(PlayerState::Failed);
                Err(PlaybackError::Exit(code))
            }
        }
    }

    fn set_state(&self, state: PlayerState) {
        *self.state.lock().unwrap() = state;
    }
}
