//! Alerte critique distante en cas de boucle de crash.
//!
//! Un seul appel POST par détection, « fire-and-forget » avec timeout
//! borné : un échec de livraison est loggé localement et ne bloque jamais
//! le démarrage. Aucune relance synchrone.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

/// Timeout de livraison de l'alerte
pub const ALERT_TIMEOUT: Duration = Duration::from_secs(5);

/// Charge utile de l'alerte critique
#[derive(Debug, Clone, Serialize)]
pub struct CriticalAlert {
    pub severity: String,
    pub message: String,
    pub metadata: AlertMetadata,
}

/// Contexte device joint à l'alerte
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMetadata {
    pub crash_count: u32,
    pub version: String,
    pub device_hardware_id: String,
    pub os: String,
    pub timestamp: String,
}

/// Client d'alerte critique
pub struct AlertClient {
    endpoint: Option<String>,
    client: Option<reqwest::Client>,
}

impl AlertClient {
    /// Crée un client pour l'endpoint configuré (`None` = alertes locales)
    pub fn new(endpoint: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(ALERT_TIMEOUT)
            .build()
            .map_err(|err| {
                tracing::warn!("Alert HTTP client unavailable: {}", err);
                err
            })
            .ok();

        Self { endpoint, client }
    }

    /// Construit l'alerte de boucle de crash pour ce device
    pub fn crash_loop_alert(
        crash_count: u32,
        version: &str,
        device_hardware_id: &str,
    ) -> CriticalAlert {
        CriticalAlert {
            severity: "critical".to_string(),
            message: "Crash loop detected, device entered safe mode".to_string(),
            metadata: AlertMetadata {
                crash_count,
                version: version.to_string(),
                device_hardware_id: device_hardware_id.to_string(),
                os: kskutils::get_os_string(),
                timestamp: Utc::now().to_rfc3339(),
            },
        }
    }

    /// Envoie l'alerte en tâche de fond, sans jamais bloquer l'appelant
    ///
    /// Timeout, statut non-2xx ou absence d'endpoint : loggé, jamais
    /// remonté, jamais relancé.
    pub fn send(&self, alert: CriticalAlert) -> tokio::task::JoinHandle<()> {
        let endpoint = self.endpoint.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let Some(endpoint) = endpoint else {
                tracing::info!("No alert endpoint configured, critical alert kept local");
                return;
            };
            let Some(client) = client else {
                tracing::warn!("Alert HTTP client unavailable, critical alert kept local");
                return;
            };

            match client.post(&endpoint).json(&alert).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("Critical alert delivered to {}", endpoint);
                }
                Ok(response) => {
                    tracing::warn!(
                        "Critical alert rejected by {}: HTTP {}",
                        endpoint,
                        response.status()
                    );
                }
                Err(err) => {
                    tracing::warn!("Critical alert delivery failed: {}", err);
                }
            }
        })
    }
}
