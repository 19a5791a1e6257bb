//! # kskguard - Garde de résilience de KioskCore
//!
//! Cette crate regroupe les deux gardes qui maintiennent le device en vie
//! sans opérateur :
//!
//! - **CrashGuard** : compteur de redémarrages persisté détectant les
//!   boucles de crash. Trois démarrages consécutifs sans fenêtre de
//!   stabilité font entrer le device en Safe Mode (auto-restart et
//!   auto-update suspendus) avec une alerte critique « fire-and-forget ».
//! - **UpdateGate** : smoke tests pré-installation. Une mise à jour
//!   entièrement téléchargée n'est appliquée que si chaque check exécuté
//!   passe ; sinon le device reste sur la version courante.
//!
//! # Exemple
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use kskguard::{AlertClient, CrashGuard};
//!
//! # #[tokio::main]
//! # async fn main() -> kskguard::Result<()> {
//! let state_dir = Path::new("/var/lib/kioskcore");
//! let guard = Arc::new(CrashGuard::new(state_dir, env!("CARGO_PKG_VERSION")));
//!
//! let report = guard.register_boot()?;
//! if report.safe_mode {
//!     let alert = AlertClient::crash_loop_alert(
//!         report.crash_count,
//!         env!("CARGO_PKG_VERSION"),
//!         "device-42",
//!     );
//!     AlertClient::new(Some("https://ops.example/alerts".into())).send(alert);
//! } else {
//!     guard.start_stability_timer();
//! }
//! # Ok(())
//! # }
//! ```

mod alert;
mod crash;
mod error;
mod smoke;
pub mod version;

#[cfg(feature = "kskconfig")]
mod config_ext;

// Réexports publics
pub use alert::{AlertClient, AlertMetadata, CriticalAlert, ALERT_TIMEOUT};
pub use crash::{BootReport, CrashGuard, MAX_CRASHES, STABILITY_WINDOW};
pub use error::{Error, Result};
pub use smoke::{
    CheckOutcome, SmokeCheckResult, SmokeReport, UpdateGate, INSTALL_DELAY, MIN_FREE_DISK_BYTES,
};

#[cfg(feature = "kskconfig")]
pub use config_ext::GuardConfigExt;
