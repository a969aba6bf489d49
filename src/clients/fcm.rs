use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::{
    clients::popup::PopupNotifier,
    config::Config,
    models::{fcm::FcmRequest, notification::Notification, retry::RetryConfig},
    utils::retry_with_backoff,
};

const FCM_SCOPES: &[&str] = &["https://www.googleapis.com/auth/firebase.messaging"];

/// Delivers popups to the configured device through the FCM HTTP v1 API.
pub struct FcmPopupNotifier {
    http_client: Client,
    base_url: String,
    fcm_project_id: String,
    device_token: String,
    retry_config: RetryConfig,
}

impl FcmPopupNotifier {
    /// `None` when no FCM project or device token is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, Error> {
        let Some((project_id, device_token)) = config.fcm_target() else {
            return Ok(None);
        };

        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.api_timeout_ms))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        info!(project_id, "FCM popup notifier initialized");

        Ok(Some(Self {
            http_client,
            base_url: config.fcm_base_url.trim_end_matches('/').to_string(),
            fcm_project_id: project_id.to_string(),
            device_token: device_token.to_string(),
            retry_config: config.retry_config(),
        }))
    }

    async fn send_once(
        http_client: Client,
        url: String,
        request: &FcmRequest,
    ) -> Result<(), Error> {
        let provider = gcp_auth::provider().await?;
        let token = provider.token(FCM_SCOPES).await?;

        let response = http_client
            .post(&url)
            .bearer_auth(token.as_str())
            .json(request)
            .send()
            .await?;

        if response.status().is_success() {
            debug!("FCM popup delivered");
            Ok(())
        } else {
            let error_text = response.text().await?;
            Err(anyhow!("FCM request failed: {}", error_text))
        }
    }
}

#[async_trait]
impl PopupNotifier for FcmPopupNotifier {
    async fn display(&self, notification: &Notification) -> Result<(), Error> {
        debug!(notification_id = %notification.id, "Sending FCM popup");

        let request = FcmRequest::for_notification(&self.device_token, notification);
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url, self.fcm_project_id
        );

        retry_with_backoff(&self.retry_config, || {
            Self::send_once(self.http_client.clone(), url.clone(), &request)
        })
        .await
    }
}
