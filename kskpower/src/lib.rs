//! # kskpower - Planification d'alimentation de KioskCore
//!
//! Cette crate calcule le prochain réveil planifié du kiosque et pilote la
//! séquence extinction d'écran / minuterie de réveil / mise en veille.
//!
//! L'algorithme de planification est une fonction pure sur l'heure murale
//! locale ; les primitives OS sont isolées derrière la capacité
//! [`PowerControl`] avec une implémentation par plateforme choisie au
//! démarrage — le cœur se teste avec une implémentation factice.
//!
//! # Exemple
//!
//! ```no_run
//! use std::time::Duration;
//! use kskpower::{PowerScheduler, WakeSchedule};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let schedule = WakeSchedule {
//!     start_time: "08:00".into(),
//!     active_days: vec![1, 2, 3, 4, 5], // lundi à vendredi
//! };
//!
//! let scheduler = PowerScheduler::with_platform_default();
//! let cancel = CancellationToken::new();
//!
//! match scheduler
//!     .enter_power_save(&schedule, Duration::from_secs(30), &cancel)
//!     .await
//! {
//!     Ok(wake_at) => println!("En veille, réveil à {}", wake_at),
//!     Err(err) => println!("Extinction annulée, device laissé allumé : {}", err),
//! }
//! # }
//! ```

mod error;
mod platform;
mod power;
mod schedule;

#[cfg(feature = "kskconfig")]
mod config_ext;

// Réexports publics
pub use error::{PowerScheduleError, Result};
pub use platform::{platform_power_control, PowerControl, WAKE_TASK_NAME};
pub use power::PowerScheduler;
pub use schedule::{calculate_next_wake_time, WakeSchedule};

#[cfg(feature = "kskconfig")]
pub use config_ext::PowerConfigExt;
