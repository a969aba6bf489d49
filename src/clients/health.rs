use std::{collections::HashMap, sync::Arc, time::Instant};

use anyhow::{Error, Result, anyhow};
use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    clients::{backend::BackendClient, storage::KeyValueStore},
    models::health::{HealthCheckResponse, HealthStatus, ServiceHealth},
};

const PROBE_KEY: &str = "@health_probe";

pub struct HealthChecker {
    store: Arc<dyn KeyValueStore>,
    backend: Arc<BackendClient>,
}

impl HealthChecker {
    pub fn new(store: Arc<dyn KeyValueStore>, backend: Arc<BackendClient>) -> Self {
        Self { store, backend }
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let (storage_health, backend_health) =
            futures_util::join!(self.check_storage(), self.check_backend());

        let mut checks = HashMap::new();
        checks.insert("storage".to_string(), storage_health);
        checks.insert("backend".to_string(), backend_health);

        let overall_status = self.determine_overall_status(&checks);

        HealthCheckResponse {
            status: overall_status,
            timestamp: Utc::now(),
            checks,
        }
    }

    async fn check_storage(&self) -> ServiceHealth {
        let start = Instant::now();

        match self.probe_storage().await {
            Ok(()) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "Storage health check passed");
                ServiceHealth::healthy(elapsed)
            }
            Err(e) => {
                warn!(error = %e, "Storage health check failed");
                ServiceHealth::unhealthy(e.to_string())
            }
        }
    }

    async fn probe_storage(&self) -> Result<(), Error> {
        let marker = Utc::now().timestamp_millis().to_string();

        self.store.set_item(PROBE_KEY, &marker).await?;
        let read_back = self.store.get_item(PROBE_KEY).await?;
        self.store.remove_item(PROBE_KEY).await?;

        if read_back.as_deref() == Some(marker.as_str()) {
            Ok(())
        } else {
            Err(anyhow!("Storage returned a stale value for the probe key"))
        }
    }

    async fn check_backend(&self) -> ServiceHealth {
        let start = Instant::now();

        match self.backend.check_health().await {
            Ok(()) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "Backend health check passed");
                ServiceHealth::healthy(elapsed)
            }
            Err(e) => {
                warn!(error = %e, "Backend health check failed");
                ServiceHealth::degraded(e.to_string())
            }
        }
    }

    fn determine_overall_status(&self, checks: &HashMap<String, ServiceHealth>) -> HealthStatus {
        if checks.values().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.values().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}
