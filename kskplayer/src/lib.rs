//! # kskplayer - Supervision du décodeur de KioskCore
//!
//! Cette crate pilote le processus décodeur externe qui affiche les médias
//! du kiosque :
//! - Localisation du binaire (embarqué puis `PATH`)
//! - Jeu d'arguments fixe et durci (plein écran, muet, aucune entrée)
//! - Machine à états sur un slot unique, un seul processus à la fois
//! - Arrêt gracieux avec escalade en kill forcé
//!
//! # Exemple
//!
//! ```no_run
//! use kskplayer::PlaybackSupervisor;
//!
//! # #[tokio::main]
//! # async fn main() -> kskplayer::Result<()> {
//! let supervisor = PlaybackSupervisor::with_default_decoder()?;
//!
//! match supervisor.play("/var/cache/kiosk/spot.mp4").await {
//!     Ok(()) => println!("Lecture terminée"),
//!     Err(err) => println!("Lecture échouée, élément suivant : {}", err),
//! }
//! # Ok(())
//! # }
//! ```

mod command;
mod error;
mod supervisor;

#[cfg(feature = "kskconfig")]
mod config_ext;

// Réexports publics
pub use command::{DecoderCommand, DECODER_BINARY};
pub use error::{PlaybackError, Result};
pub use supervisor::{PlaybackSupervisor, PlayerState, DEFAULT_TERM_GRACE};

#[cfg(feature = "kskconfig")]
pub use config_ext::PlayerConfigExt;
