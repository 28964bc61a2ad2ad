use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::traits::{Mailer, Template};
use crate::HttpMailerConfig;

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    template: Template,
    context: &'a Value,
}

/// Hands templated messages to a mail relay over HTTP.
pub struct HttpMailer {
    client: reqwest::Client,
    config: HttpMailerConfig,
}

impl HttpMailer {
    pub fn new(config: HttpMailerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build mail relay client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_notification(
        &self,
        recipient: &str,
        template: Template,
        context: &Value,
    ) -> Result<()> {
        let msg = RelayMessage {
            from: &self.config.from,
            to: recipient,
            template,
            context,
        };

        self.client
            .post(&self.config.endpoint)
            .json(&msg)
            .send()
            .await
            .with_context(|| format!("Mail relay unreachable: {}", self.config.endpoint))?
            .error_for_status()
            .context("Mail relay rejected the message")?;

        debug!(recipient, template = template.as_str(), "notification relayed");
        Ok(())
    }
}
