//! Identité matérielle du device.
//!
//! L'alerte critique envoyée en cas de crash-loop doit identifier le device
//! de façon stable. On lit l'identifiant machine fourni par l'OS quand il
//! existe, sinon on génère un UUID v4 persisté dans le répertoire d'état.

use std::path::Path;

use uuid::Uuid;

/// Retourne un identifiant stable pour ce device.
///
/// Ordre de résolution :
/// 1. `/etc/machine-id` (Linux) ou `/var/db/SystemConfiguration` équivalent
/// 2. UUID v4 généré une seule fois et persisté dans `state_dir/device_id`
pub fn device_hardware_id(state_dir: &Path) -> String {
    if let Some(id) = read_os_machine_id() {
        return id;
    }

    let id_file = state_dir.join("device_id");
    if let Ok(existing) = std::fs::read_to_string(&id_file) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let generated = Uuid::new_v4().to_string();
    if let Err(err) = crate::atomic_write(&id_file, generated.as_bytes()) {
        tracing::warn!("Failed to persist generated device id: {}", err);
    }
    generated
}

fn read_os_machine_id() -> Option<String> {
    for candidate in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
        if let Ok(content) = std::fs::read_to_string(candidate) {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let first = device_hardware_id(dir.path());
        let second = device_hardware_id(dir.path());
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
