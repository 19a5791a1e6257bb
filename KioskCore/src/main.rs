use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kskcache::{ContentStore, ContentStoreConfigExt, PlaylistItem};
use kskconfig::get_config;
use kskguard::{version, AlertClient, GuardConfigExt, UpdateGate};
use kskplayer::{DecoderCommand, PlaybackSupervisor, PlayerConfigExt};
use kskpower::{PowerConfigExt, PowerScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Période entre deux synchronisations de playlist
const TICK_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ========== PHASE 1 : Garde de crash ==========

    let config = get_config();
    let state_dir = config.get_state_dir()?;
    let device_id = kskutils::device_hardware_id(Path::new(&state_dir));
    info!("🖥️ KioskCore {} on {} ({})", VERSION, kskutils::get_os_string(), device_id);

    let guard = Arc::new(config.create_crash_guard(VERSION)?);
    let boot = guard.register_boot()?;

    if boot.version_changed {
        version::write_last_applied(Path::new(&state_dir), VERSION)?;
        info!("📦 Version {} marked as applied", VERSION);
    }

    let safe_mode = boot.safe_mode;
    if safe_mode {
        warn!(
            "🚨 Safe mode after {} consecutive starts: auto-update and auto-restart suspended",
            boot.crash_count
        );
        let alert = AlertClient::crash_loop_alert(boot.crash_count, VERSION, &device_id);
        config.create_alert_client().send(alert);
    } else {
        guard.start_stability_timer();
    }

    // ========== PHASE 2 : Cache média ==========

    info!("📦 Initializing media cache...");
    let store = config.create_content_store()?;
    store.consolidate().await?;
    let stats = store.stats()?;
    info!(
        "✅ Cache ready: {} entries, {:.1}% of budget",
        stats.count, stats.usage_percent
    );

    // ========== PHASE 3 : Décodeur ==========

    let supervisor = match config.create_supervisor() {
        Ok(supervisor) => {
            info!("✅ Decoder available");
            Some(Arc::new(supervisor))
        }
        Err(err) => {
            warn!("⚠️ Decoder unavailable, playback disabled: {}", err);
            None
        }
    };

    // ========== PHASE 4 : Boucle principale ==========

    let power = PowerScheduler::with_platform_default();
    // Le device peut sortir d'un réveil planifié : écran dans un état connu
    if let Err(err) = power.wake_display() {
        warn!("⚠️ Display wake failed: {}", err);
    }

    let shutdown = CancellationToken::new();

    info!("✅ KioskCore is ready!");
    info!("Press Ctrl+C to stop...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                shutdown.cancel();
                if let Some(supervisor) = &supervisor {
                    supervisor.stop().await;
                }
                break;
            }
            outcome = playlist_tick(&store, supervisor.as_deref(), safe_mode) => {
                // Playlist vide : rien à afficher avant le prochain créneau
                // planifié, extinction jusqu'au réveil. Tout échec laisse le
                // device allumé.
                if matches!(outcome, TickOutcome::NothingToShow) && !safe_mode {
                    let schedule = config.get_wake_schedule();
                    match power
                        .enter_power_save(&schedule, config.get_grace_period(), &shutdown)
                        .await
                    {
                        Ok(wake_at) => info!("⏰ Back from power save (wake was set for {})", wake_at),
                        Err(err) => warn!("Power save aborted, staying awake: {}", err),
                    }
                }
            }
        }

        // Une mise à jour complètement téléchargée passe la porte de
        // sécurité ; si elle a le feu vert, le processus se termine pour
        // laisser l'updater externe l'appliquer et relancer dans le chemin
        // de boot de la garde de crash.
        if handle_staged_update(Path::new(&state_dir), &store, safe_mode).await {
            info!("Restarting for update install...");
            if let Some(supervisor) = &supervisor {
                supervisor.stop().await;
            }
            break;
        }

        tokio::time::sleep(TICK_INTERVAL).await;
    }

    Ok(())
}

/// Soumet une mise à jour stagée aux smoke checks pré-installation.
///
/// Retourne `true` si l'installation a le feu vert (après le délai laissant
/// une lecture en cours se terminer). En cas d'échec des checks le device
/// continue sur la version courante, raisons détaillées dans les logs.
async fn handle_staged_update(state_dir: &Path, store: &ContentStore, safe_mode: bool) -> bool {
    if safe_mode {
        return false;
    }
    let staged = state_dir.join("staged_update");
    if !staged.exists() {
        return false;
    }

    let Some(decoder) = DecoderCommand::locate() else {
        warn!("Update blocked: decoder binary not found");
        return false;
    };

    let gate = UpdateGate::new(decoder.program(), &store.index_path(), state_dir);
    let report = gate.evaluate();
    if !report.pass() {
        for failure in report.failures() {
            warn!("Update check '{}': {}", failure.name, failure.detail);
        }
        return false;
    }

    UpdateGate::install_delay().await;
    true
}

enum TickOutcome {
    /// Des éléments ont été affichés (ou la source était injoignable)
    Played,
    /// La source a répondu : aucune playlist assignée
    NothingToShow,
}

/// Un tick de playlist : récupération de la liste distante, synchronisation
/// du cache, lecture des éléments dans l'ordre.
async fn playlist_tick(
    store: &ContentStore,
    supervisor: Option<&PlaybackSupervisor>,
    safe_mode: bool,
) -> TickOutcome {
    let Some(items) = fetch_playlist().await else {
        return TickOutcome::Played;
    };
    if items.is_empty() {
        return TickOutcome::NothingToShow;
    }

    // En safe mode on continue d'afficher ce qu'on a, mais sans
    // re-télécharger : pas de nouveau point de défaillance au boot.
    let resolved = if safe_mode {
        items
            .iter()
            .map(|item| (item.media_id.clone(), store.resolve(&item.media_id).ok().flatten()))
            .collect()
    } else {
        store.sync_playlist(&items, None).await
    };

    let Some(supervisor) = supervisor else {
        return TickOutcome::Played;
    };

    for item in &items {
        // Chemin local si en cache, sinon bascule en streaming distant
        let media = match resolved.get(&item.media_id) {
            Some(Some(path)) => path.to_string_lossy().to_string(),
            _ => item.url.clone(),
        };

        if let Err(err) = supervisor.play(&media).await {
            warn!("Playback failed for {}, skipping: {}", item.media_id, err);
        }
    }

    TickOutcome::Played
}

/// Récupère la playlist assignée depuis la source distante (collaborateur
/// externe, lecture seule).
async fn fetch_playlist() -> Option<Vec<PlaylistItem>> {
    let config = get_config();
    let url = config.get_optional_string(&["playlist", "source_url"])?;

    let response = match reqwest::get(&url).await {
        Ok(response) => response,
        Err(err) => {
            warn!("Playlist fetch failed: {}", err);
            return None;
        }
    };

    match response.json::<Vec<PlaylistItem>>().await {
        Ok(items) => Some(items),
        Err(err) => {
            warn!("Playlist source returned malformed JSON: {}", err);
            None
        }
    }
}
