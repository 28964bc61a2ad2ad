use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::traits::{Mailer, Template};

/// Writes notifications to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_notification(
        &self,
        recipient: &str,
        template: Template,
        context: &Value,
    ) -> Result<()> {
        info!(
            recipient,
            template = template.as_str(),
            %context,
            "notification (log mode)"
        );
        Ok(())
    }
}
