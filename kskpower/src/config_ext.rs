//! Extension de kskconfig pour le planificateur d'alimentation

use std::time::Duration;

use kskconfig::Config;
use serde_yaml::Value;

use crate::schedule::WakeSchedule;

const DEFAULT_START_TIME: &str = "08:00";
const DEFAULT_GRACE_PERIOD_MS: u64 = 30_000;

/// Trait d'extension pour configurer le planificateur via kskconfig
pub trait PowerConfigExt {
    /// Planning de réveil configuré (default: 08:00 du lundi au vendredi)
    fn get_wake_schedule(&self) -> WakeSchedule;

    /// Délai de grâce avant mise en veille (default: 30 s)
    fn get_grace_period(&self) -> Duration;
}

impl PowerConfigExt for Config {
    fn get_wake_schedule(&self) -> WakeSchedule {
        let start_time = self
            .get_optional_string(&["power", "start_time"])
            .unwrap_or_else(|| DEFAULT_START_TIME.to_string());

        let active_days = match self.get_value(&["power", "active_days"]) {
            Ok(Value::Sequence(days)) => days
                .iter()
                .filter_map(|v| v.as_u64())
                .filter(|d| (1..=7u64).contains(d))
                .map(|d| d as u8)
                .collect(),
            _ => vec![1, 2, 3, 4, 5],
        };

        WakeSchedule {
            start_time,
            active_days,
        }
    }

    fn get_grace_period(&self) -> Duration {
        Duration::from_millis(self.get_u64_or(
            &["power", "grace_period_ms"],
            DEFAULT_GRACE_PERIOD_MS,
        ))
    }
}
