mod drivers;
mod queue;
mod traits;

pub use drivers::http::HttpMailer;
pub use drivers::log::LogMailer;
pub use queue::{Notification, NotificationQueue};
pub use traits::{Mailer, Template};

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Clone, Debug)]
pub struct HttpMailerConfig {
    pub endpoint: String,
    pub from: String,
}

#[derive(Clone, Debug)]
pub enum MailConfig {
    Log,
    Http(HttpMailerConfig),
}

/// Builds the configured mailer and spawns the delivery worker.
///
/// The worker stops once `cancel_token` fires, after flushing whatever is
/// already queued.
pub fn start_with_cancel_token(
    config: MailConfig,
    queue_capacity: usize,
    cancel_token: CancellationToken,
) -> anyhow::Result<(NotificationQueue, JoinHandle<()>)> {
    let mailer: Arc<dyn Mailer> = match config {
        MailConfig::Log => {
            info!("Mailer running in LOG mode, notifications are not delivered");
            Arc::new(LogMailer)
        }
        MailConfig::Http(http) => {
            info!("Mailer relaying notifications to {}", http.endpoint);
            Arc::new(HttpMailer::new(http)?)
        }
    };

    Ok(spawn(mailer, queue_capacity, cancel_token))
}

pub fn spawn(
    mailer: Arc<dyn Mailer>,
    queue_capacity: usize,
    cancel_token: CancellationToken,
) -> (NotificationQueue, JoinHandle<()>) {
    let (queue, rx) = NotificationQueue::bounded(queue_capacity);
    let handle = tokio::spawn(queue::run_worker(mailer, rx, cancel_token));
    (queue, handle)
}
