//! Extension de kskconfig pour le superviseur de lecture

use std::path::PathBuf;
use std::time::Duration;

use kskconfig::Config;

use crate::command::DecoderCommand;
use crate::error::{PlaybackError, Result};
use crate::supervisor::{PlaybackSupervisor, DEFAULT_TERM_GRACE};

/// Trait d'extension pour configurer le superviseur via kskconfig
pub trait PlayerConfigExt {
    /// Chemin de décodeur imposé par la configuration, s'il y en a un
    fn get_decoder_override(&self) -> Option<PathBuf>;

    /// Délai de terminaison gracieuse avant kill forcé (default: 3 s)
    fn get_terminate_grace(&self) -> Duration;

    /// Construit un [`PlaybackSupervisor`] à partir de la configuration
    fn create_supervisor(&self) -> Result<PlaybackSupervisor>;
}

impl PlayerConfigExt for Config {
    fn get_decoder_override(&self) -> Option<PathBuf> {
        self.get_optional_string(&["player", "decoder"]).map(PathBuf::from)
    }

    fn get_terminate_grace(&self) -> Duration {
        Duration::from_millis(self.get_u64_or(
            &["player", "terminate_grace_ms"],
            DEFAULT_TERM_GRACE.as_millis() as u64,
        ))
    }

    fn create_supervisor(&self) -> Result<PlaybackSupervisor> {
        let command = match self.get_decoder_override() {
            Some(program) => DecoderCommand::hardened(program),
            None => DecoderCommand::locate().ok_or(PlaybackError::DecoderNotFound)?,
        };
        Ok(PlaybackSupervisor::new(command, self.get_terminate_grace()))
    }
}
