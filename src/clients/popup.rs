use anyhow::{Error, Result};
use async_trait::async_trait;

use crate::models::notification::Notification;

/// Surfaces a stored notification as a transient OS popup.
///
/// Delivery is best-effort: callers log failures and move on, the stored
/// record is never touched.
#[async_trait]
pub trait PopupNotifier: Send + Sync {
    async fn display(&self, notification: &Notification) -> Result<(), Error>;
}
