use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::traits::{Mailer, Template};

#[derive(Debug, Clone)]
pub struct Notification {
    pub recipient: String,
    pub template: Template,
    pub context: Value,
}

/// Producer side of the notification worker. Enqueueing never waits.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Notification>,
}

impl NotificationQueue {
    pub(crate) fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Best-effort enqueue. Returns `false` if the notification was dropped.
    pub fn enqueue(&self, notification: Notification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(n)) => {
                warn!(
                    recipient = %n.recipient,
                    template = n.template.as_str(),
                    "notification queue full, dropping"
                );
                false
            }
            Err(TrySendError::Closed(n)) => {
                warn!(
                    recipient = %n.recipient,
                    template = n.template.as_str(),
                    "notification worker stopped, dropping"
                );
                false
            }
        }
    }
}

pub(crate) async fn run_worker(
    mailer: Arc<dyn Mailer>,
    mut rx: mpsc::Receiver<Notification>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(n) => deliver(mailer.as_ref(), n).await,
                None => break,
            },
            _ = cancel_token.cancelled() => {
                rx.close();
                while let Some(n) = rx.recv().await {
                    deliver(mailer.as_ref(), n).await;
                }
                break;
            }
        }
    }
    debug!("notification worker stopped");
}

async fn deliver(mailer: &dyn Mailer, n: Notification) {
    if let Err(e) = mailer
        .send_notification(&n.recipient, n.template, &n.context)
        .await
    {
        warn!(
            recipient = %n.recipient,
            template = n.template.as_str(),
            "notification failed: {:?}",
            e
        );
    }
}
