#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use kskplayer::{DecoderCommand, PlaybackError, PlaybackSupervisor, PlayerState};

/// Décodeur de substitution : un shell dont le média (l'argument
/// positionnel, vu comme `$0` par `sh -c`) pilote le comportement.
fn fake_decoder() -> PlaybackSupervisor {
    let command = DecoderCommand::custom(
        "sh",
        &[
            "-c",
            r#"case "$0" in long) sleep 30 ;; fail) exit 1 ;; *) exit 0 ;; esac"#,
        ],
    );
    PlaybackSupervisor::new(command, Duration::from_secs(2))
}

async fn wait_for_state(supervisor: &PlaybackSupervisor, state: PlayerState) {
    for _ in 0..100 {
        if supervisor.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("state {:?} never reached (now {:?})", state, supervisor.state());
}

#[tokio::test]
async fn test_play_exit_zero_resolves() {
    let supervisor = fake_decoder();

    supervisor.play("ok").await.unwrap();
    assert_eq!(supervisor.state(), PlayerState::Idle);
}

#[tokio::test]
async fn test_play_nonzero_exit_rejects() {
    let supervisor = fake_decoder();

    let err = supervisor.play("fail").await.unwrap_err();
    assert!(matches!(err, PlaybackError::Exit(1)));
    assert_eq!(supervisor.state(), PlayerState::Failed);
}

#[tokio::test]
async fn test_spawn_failure_rejects() {
    let command = DecoderCommand::custom("/nonexistent/decoder", &[]);
    let supervisor = PlaybackSupervisor::new(command, Duration::from_secs(1));

    let err = supervisor.play("anything").await.unwrap_err();
    assert!(matches!(err, PlaybackError::Spawn(_)));
    assert_eq!(supervisor.state(), PlayerState::Failed);
}

#[tokio::test]
async fn test_stop_is_idempotent_when_idle() {
    let supervisor = fake_decoder();

    supervisor.stop().await;
    supervisor.stop().await;
    assert_eq!(supervisor.state(), PlayerState::Idle);
}

#[tokio::test]
async fn test_stop_terminates_running_decoder() {
    let supervisor = Arc::new(fake_decoder());

    let player = supervisor.clone();
    let handle = tokio::spawn(async move { player.play("long").await });

    wait_for_state(&supervisor, PlayerState::Playing).await;
    let pid = supervisor.current_pid().await.unwrap();

    supervisor.stop().await;

    // Le processus est sorti et a été récolté avant le retour de stop()
    let alive = unsafe { libc::kill(pid as i32, 0) } == 0;
    assert!(!alive, "decoder pid {} still alive after stop()", pid);
    assert_eq!(supervisor.state(), PlayerState::Idle);

    // L'appel play interrompu se résout comme une terminaison normale
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_play_replaces_running_decoder() {
    let supervisor = Arc::new(fake_decoder());

    let player = supervisor.clone();
    let first = tokio::spawn(async move { player.play("long").await });

    wait_for_state(&supervisor, PlayerState::Playing).await;
    let first_pid = supervisor.current_pid().await.unwrap();

    // Le second play arrête d'abord le décodeur en cours (sortie
    // confirmée), puis lance et joue le sien jusqu'au bout.
    supervisor.play("ok").await.unwrap();

    let first_alive = unsafe { libc::kill(first_pid as i32, 0) } == 0;
    assert!(!first_alive, "first decoder survived the second play()");
    assert_eq!(supervisor.state(), PlayerState::Idle);

    first.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_is_available_probes_without_launching() {
    let supervisor = fake_decoder();
    assert!(supervisor.is_available());

    let missing = PlaybackSupervisor::new(
        DecoderCommand::custom("/nonexistent/decoder", &[]),
        Duration::from_secs(1),
    );
    assert!(!missing.is_available());
}
