//! Contrôle d'alimentation spécifique à la plateforme.
//!
//! Les primitives OS (minuterie de réveil, signal d'alimentation écran,
//! mise en veille) sont isolées derrière la capacité [`PowerControl`], une
//! implémentation par OS choisie au démarrage. L'algorithme de
//! planification reste neutre et se teste avec une implémentation factice.

use chrono::NaiveDateTime;

use crate::error::Result;
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
use crate::error::PowerScheduleError;

/// Nom de l'unique tâche de réveil planifiée
pub const WAKE_TASK_NAME: &str = "kioskcore-wake";

/// Capacité de contrôle d'alimentation
///
/// Invariant : au plus une minuterie de réveil existe à la fois —
/// `install_wake_timer` remplace toute minuterie antérieure.
pub trait PowerControl: Send + Sync {
    /// Rallume l'affichage
    fn display_on(&self) -> Result<()>;

    /// Éteint l'affichage
    fn display_off(&self) -> Result<()>;

    /// Installe l'unique minuterie de réveil pour l'instant donné (heure
    /// locale), remplaçant toute minuterie antérieure
    fn install_wake_timer(&self, at: NaiveDateTime) -> Result<()>;

    /// Annule la minuterie de réveil, sans erreur si aucune n'existe
    fn cancel_wake_timer(&self) -> Result<()>;

    /// Met le device en veille prolongée
    fn hibernate(&self) -> Result<()>;
}

/// Implémentation pour l'OS courant
pub fn platform_power_control() -> Box<dyn PowerControl> {
    #[cfg(target_os = "linux")]
    {
        Box::new(linux::LinuxPowerControl)
    }
    #[cfg(target_os = "windows")]
    {
        Box::new(windows::WindowsPowerControl)
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Box::new(UnsupportedPowerControl)
    }
}

/// Exécute une commande système, stderr en détail d'erreur
#[allow(dead_code)]
fn run_os_command(program: &str, args: &[&str]) -> std::result::Result<(), String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|err| format!("{} failed to start: {}", program, err))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!("{} exited with {}: {}", program, output.status, stderr.trim()))
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use super::{run_os_command, PowerControl, Result};
    use crate::error::PowerScheduleError;
    use chrono::NaiveDateTime;

    /// Contrôle d'alimentation Linux : `xset` pour l'écran, `rtcwake` pour
    /// l'alarme RTC, `systemctl suspend` pour la veille.
    pub struct LinuxPowerControl;

    impl PowerControl for LinuxPowerControl {
        fn display_on(&self) -> Result<()> {
            run_os_command("xset", &["dpms", "force", "on"])
                .map_err(PowerScheduleError::Display)
        }

        fn display_off(&self) -> Result<()> {
            run_os_command("xset", &["dpms", "force", "off"])
                .map_err(PowerScheduleError::Display)
        }

        fn install_wake_timer(&self, at: NaiveDateTime) -> Result<()> {
            // L'alarme RTC est unique : le réarmement remplace l'alarme
            // antérieure. On efface d'abord pour les noyaux qui refusent un
            // réarmement direct.
            let _ = run_os_command("rtcwake", &["-m", "disable"]);
            let date = at.format("%Y-%m-%d %H:%M:%S").to_string();
            run_os_command("rtcwake", &["-m", "no", "--date", &date])
                .map_err(PowerScheduleError::WakeTimer)
        }

        fn cancel_wake_timer(&self) -> Result<()> {
            run_os_command("rtcwake", &["-m", "disable"]).map_err(PowerScheduleError::WakeTimer)
        }

        fn hibernate(&self) -> Result<()> {
            run_os_command("systemctl", &["suspend"]).map_err(PowerScheduleError::Hibernate)
        }
    }
}

#[cfg(target_os = "windows")]
mod windows {
    use super::{run_os_command, PowerControl, Result, WAKE_TASK_NAME};
    use crate::error::PowerScheduleError;
    use chrono::NaiveDateTime;

    /// Contrôle d'alimentation Windows : broadcast `WM_SYSCOMMAND` pour
    /// l'écran, tâche planifiée nommée pour le réveil, `shutdown /h` pour
    /// la veille prolongée.
    pub struct WindowsPowerControl;

    const DISPLAY_OFF_PS: &str = "(Add-Type '[DllImport(\"user32.dll\")]public static extern int SendMessage(int hWnd,int hMsg,int wParam,int lParam);' -Name P -PassThru)::SendMessage(0xffff,0x0112,0xF170,2)";
    const DISPLAY_ON_PS: &str = "(Add-Type '[DllImport(\"user32.dll\")]public static extern int SendMessage(int hWnd,int hMsg,int wParam,int lParam);' -Name P -PassThru)::SendMessage(0xffff,0x0112,0xF170,-1)";

    impl PowerControl for WindowsPowerControl {
        fn display_on(&self) -> Result<()> {
            run_os_command("powershell", &["-NoProfile", "-Command", DISPLAY_ON_PS])
                .map_err(PowerScheduleError::Display)
        }

        fn display_off(&self) -> Result<()> {
            run_os_command("powershell", &["-NoProfile", "-Command", DISPLAY_OFF_PS])
                .map_err(PowerScheduleError::Display)
        }

        fn install_wake_timer(&self, at: NaiveDateTime) -> Result<()> {
            // /F remplace la tâche existante : une seule minuterie nommée
            let st = at.format("%H:%M").to_string();
            let sd = at.format("%d/%m/%Y").to_string();
            run_os_command(
                "schtasks",
                &[
                    "/Create", "/F",
                    "/TN", WAKE_TASK_NAME,
                    "/SC", "ONCE",
                    "/ST", &st,
                    "/SD", &sd,
                    "/TR", "cmd /c exit",
                ],
            )
            .map_err(PowerScheduleError::WakeTimer)
        }

        fn cancel_wake_timer(&self) -> Result<()> {
            // Sans erreur si la tâche n'existe pas
            let _ = run_os_command("schtasks", &["/Delete", "/F", "/TN", WAKE_TASK_NAME]);
            Ok(())
        }

        fn hibernate(&self) -> Result<()> {
            run_os_command("shutdown", &["/h"]).map_err(PowerScheduleError::Hibernate)
        }
    }
}

/// Plateforme sans contrôle d'alimentation : chaque opération échoue, donc
/// la séquence d'extinction avorte toujours et le device reste allumé.
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
pub struct UnsupportedPowerControl;

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
impl PowerControl for UnsupportedPowerControl {
    fn display_on(&self) -> Result<()> {
        Err(PowerScheduleError::Display("unsupported platform".into()))
    }

    fn display_off(&self) -> Result<()> {
        Err(PowerScheduleError::Display("unsupported platform".into()))
    }

    fn install_wake_timer(&self, _at: NaiveDateTime) -> Result<()> {
        Err(PowerScheduleError::WakeTimer("unsupported platform".into()))
    }

    fn cancel_wake_timer(&self) -> Result<()> {
        Ok(())
    }

    fn hibernate(&self) -> Result<()> {
        Err(PowerScheduleError::Hibernate("unsupported platform".into()))
    }
}
