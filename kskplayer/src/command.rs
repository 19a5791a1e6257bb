//! Construction de la ligne de commande du décodeur externe.
//!
//! Le décodeur est invoqué avec un jeu d'arguments fixe et durci : plein
//! écran sans bordure, toujours au premier plan, sortie accélérée
//! matériellement, audio coupé, aucun binding d'entrée utilisateur, pas de
//! boucle, fermeture automatique en fin de flux. Exactement un argument
//! positionnel (chemin local ou URL du média).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// Nom du binaire décodeur
#[cfg(windows)]
pub const DECODER_BINARY: &str = "mpv.exe";
#[cfg(not(windows))]
pub const DECODER_BINARY: &str = "mpv";

/// Jeu d'arguments durci : aucune surface de contrôle, aucune entrée
/// utilisateur, pas de boucle, fermeture en fin de flux.
const HARDENED_ARGS: &[&str] = &[
    "--fullscreen",
    "--no-border",
    "--ontop",
    "--hwdec=auto",
    "--mute=yes",
    "--no-input-default-bindings",
    "--no-input-cursor",
    "--no-osc",
    "--loop-file=no",
    "--keep-open=no",
    "--no-terminal",
    "--really-quiet",
];

/// Commande de lancement du décodeur
#[derive(Debug, Clone)]
pub struct DecoderCommand {
    program: PathBuf,
    base_args: Vec<String>,
}

impl DecoderCommand {
    /// Localise le décodeur et construit la commande durcie
    ///
    /// Ordre de recherche : binaire embarqué à côté de l'exécutable, puis
    /// `PATH` système.
    pub fn locate() -> Option<Self> {
        locate_decoder().map(Self::hardened)
    }

    /// Commande durcie pour un binaire décodeur donné
    pub fn hardened(program: PathBuf) -> Self {
        Self {
            program,
            base_args: HARDENED_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Commande arbitraire, pour les tests et les décodeurs de substitution
    pub fn custom(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            base_args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Le binaire est-il localisable, sans lancer de lecture ?
    pub fn is_available(&self) -> bool {
        if self.program.components().count() > 1 {
            return self.program.is_file();
        }
        // Nom nu : résolution via PATH
        find_in_path(self.program.as_os_str()).is_some()
    }

    /// Chemin du binaire configuré
    pub fn program(&self) -> &Path {
        &self.program
    }

    pub(crate) fn build(&self, media: &OsStr) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .arg(media)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// Cherche le binaire décodeur : embarqué d'abord, puis PATH
fn locate_decoder() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let bundled = dir.join(DECODER_BINARY);
            if bundled.is_file() {
                return Some(bundled);
            }
        }
    }
    find_in_path(OsStr::new(DECODER_BINARY))
}

fn find_in_path(binary: &OsStr) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(binary);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_command_availability() {
        #[cfg(unix)]
        {
            assert!(DecoderCommand::custom("/bin/sh", &[]).is_available());
            assert!(!DecoderCommand::custom("/nonexistent/decoder", &[]).is_available());
        }
    }

    #[test]
    fn test_bare_name_resolves_via_path() {
        #[cfg(unix)]
        {
            assert!(DecoderCommand::custom("sh", &[]).is_available());
            assert!(!DecoderCommand::custom("no-such-decoder-binary", &[]).is_available());
        }
    }
}
