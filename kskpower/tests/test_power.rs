use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use kskpower::{PowerControl, PowerScheduleError, PowerScheduler, WakeSchedule};
use tokio_util::sync::CancellationToken;

/// Implémentation factice enregistrant l'ordre des appels, avec pannes
/// injectables par étape.
#[derive(Default)]
struct FakePowerControl {
    calls: Arc<Mutex<Vec<&'static str>>>,
    fail_display_off: bool,
    fail_wake_timer: bool,
    fail_hibernate: bool,
}

impl FakePowerControl {
    fn new() -> (Self, Arc<Mutex<Vec<&'static str>>>) {
        let fake = Self::default();
        let calls = fake.calls.clone();
        (fake, calls)
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PowerControl for FakePowerControl {
    fn display_on(&self) -> kskpower::Result<()> {
        self.record("display_on");
        Ok(())
    }

    fn display_off(&self) -> kskpower::Result<()> {
        self.record("display_off");
        if self.fail_display_off {
            return Err(PowerScheduleError::Display("injected".into()));
        }
        Ok(())
    }

    fn install_wake_timer(&self, _at: NaiveDateTime) -> kskpower::Result<()> {
        self.record("install_wake_timer");
        if self.fail_wake_timer {
            return Err(PowerScheduleError::WakeTimer("injected".into()));
        }
        Ok(())
    }

    fn cancel_wake_timer(&self) -> kskpower::Result<()> {
        self.record("cancel_wake_timer");
        Ok(())
    }

    fn hibernate(&self) -> kskpower::Result<()> {
        self.record("hibernate");
        if self.fail_hibernate {
            return Err(PowerScheduleError::Hibernate("injected".into()));
        }
        Ok(())
    }
}

fn monday_morning() -> NaiveDateTime {
    NaiveDate::from_isoywd_opt(2026, 31, Weekday::Mon)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

fn weekdays() -> WakeSchedule {
    WakeSchedule {
        start_time: "08:00".into(),
        active_days: vec![1, 2, 3, 4, 5],
    }
}

#[tokio::test]
async fn test_power_save_sequence_order() {
    let (fake, calls) = FakePowerControl::new();
    let scheduler = PowerScheduler::new(Box::new(fake));
    let cancel = CancellationToken::new();

    let wake_at = scheduler
        .enter_power_save_at(&weekdays(), Duration::from_millis(10), &cancel, monday_morning())
        .await
        .unwrap();

    assert_eq!(wake_at.format("%H:%M").to_string(), "07:59");
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["display_off", "install_wake_timer", "hibernate"]
    );
}

#[tokio::test]
async fn test_no_active_day_aborts_before_any_side_effect() {
    let (fake, calls) = FakePowerControl::new();
    let scheduler = PowerScheduler::new(Box::new(fake));
    let cancel = CancellationToken::new();

    let schedule = WakeSchedule {
        start_time: "08:00".into(),
        active_days: vec![],
    };
    let err = scheduler
        .enter_power_save_at(&schedule, Duration::from_millis(10), &cancel, monday_morning())
        .await
        .unwrap_err();

    assert!(matches!(err, PowerScheduleError::NoActiveDay));
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wake_timer_failure_never_hibernates() {
    let (mut fake, calls) = FakePowerControl::new();
    fake.fail_wake_timer = true;
    let scheduler = PowerScheduler::new(Box::new(fake));
    let cancel = CancellationToken::new();

    let err = scheduler
        .enter_power_save_at(&weekdays(), Duration::from_millis(10), &cancel, monday_morning())
        .await
        .unwrap_err();

    assert!(matches!(err, PowerScheduleError::WakeTimer(_)));
    // Pas de mise en veille sans réveil confirmé ; l'écran est restauré
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["display_off", "install_wake_timer", "display_on"]
    );
}

#[tokio::test]
async fn test_display_failure_aborts_remaining_steps() {
    let (mut fake, calls) = FakePowerControl::new();
    fake.fail_display_off = true;
    let scheduler = PowerScheduler::new(Box::new(fake));
    let cancel = CancellationToken::new();

    let err = scheduler
        .enter_power_save_at(&weekdays(), Duration::from_millis(10), &cancel, monday_morning())
        .await
        .unwrap_err();

    assert!(matches!(err, PowerScheduleError::Display(_)));
    assert_eq!(*calls.lock().unwrap(), vec!["display_off"]);
}

#[tokio::test]
async fn test_cancellation_during_grace_period() {
    let (fake, calls) = FakePowerControl::new();
    let scheduler = PowerScheduler::new(Box::new(fake));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = scheduler
        .enter_power_save_at(&weekdays(), Duration::from_secs(60), &cancel, monday_morning())
        .await
        .unwrap_err();

    assert!(matches!(err, PowerScheduleError::Cancelled));
    // La minuterie installée est retirée et l'écran restauré, pas de veille
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "display_off",
            "install_wake_timer",
            "cancel_wake_timer",
            "display_on"
        ]
    );
}

#[tokio::test]
async fn test_hibernate_failure_restores_display() {
    let (mut fake, calls) = FakePowerControl::new();
    fake.fail_hibernate = true;
    let scheduler = PowerScheduler::new(Box::new(fake));
    let cancel = CancellationToken::new();

    let err = scheduler
        .enter_power_save_at(&weekdays(), Duration::from_millis(10), &cancel, monday_morning())
        .await
        .unwrap_err();

    assert!(matches!(err, PowerScheduleError::Hibernate(_)));
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["display_off", "install_wake_timer", "hibernate", "display_on"]
    );
}
