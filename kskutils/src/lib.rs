//! # kskutils - Utilitaires partagés de KioskCore
//!
//! Cette crate regroupe les petites briques communes aux autres crates :
//! - Écriture atomique des fichiers d'état persistés (temp + rename)
//! - Identité matérielle du device (machine-id ou UUID persisté)
//! - Chaîne descriptive du système d'exploitation

mod atomic;
mod device;

pub use atomic::{atomic_write, load_json, save_json};
pub use device::device_hardware_id;

/// Retourne une chaîne décrivant le système d'exploitation et sa version.
///
/// Utilise la crate `os_info` pour obtenir de manière portable et fiable
/// les informations sur le système d'exploitation courant.
///
/// # Format
/// - macOS: "Macos/15.1"
/// - Linux: "Linux/6.5.0" ou "Ubuntu/22.04"
/// - Windows: "Windows/10.0.19045"
/// - Autre: "{OS}/Unknown"
pub fn get_os_string() -> String {
    let info = os_info::get();
    let os_type = format!("{:?}", info.os_type());

    let version = info.version();
    if version != &os_info::Version::Unknown {
        format!("{}/{}", os_type, version)
    } else {
        format!("{}/Unknown", os_type)
    }
}
