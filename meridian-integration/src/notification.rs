use async_trait::async_trait;
use meridian_core::notification::NotificationEvent;
use tracing::{error, instrument};

/// The external fan-out seam for [`NotificationEvent`]s read off the
/// internal bus (`spec.md` §6: only the fan-out itself — push, email,
/// chat — is out of scope; the trait and the bus are not). Mirrors
/// `ExchangeClient`/`LlmClient`: one call-shape, any number of concrete
/// backends.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<(), String>;
}

/// Posts each event as a JSON webhook payload, the same shape a chat-ops
/// integration (Slack/Discord incoming webhook) expects.
pub struct HttpNotificationSink {
    http: reqwest::Client,
    webhook_url: String,
}

impl HttpNotificationSink {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for HttpNotificationSink {
    #[instrument(skip(self, event))]
    async fn notify(&self, event: NotificationEvent) -> Result<(), String> {
        let response = self
            .http
            .post(&self.webhook_url)
            .json(&event)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("webhook rejected notification: {}", response.status()));
        }
        Ok(())
    }
}

/// Drain `rx` forever, forwarding each event to `sink`. Spawned as a
/// background task by whatever process owns the bus; a delivery failure is
/// logged and the loop continues rather than dropping the consumer.
pub async fn forward_to_sink(
    mut rx: crate::channel::UnboundedRx<NotificationEvent>,
    sink: std::sync::Arc<dyn NotificationSink>,
) {
    use futures::StreamExt;
    while let Some(event) = rx.next().await {
        if let Err(reason) = sink.notify(event).await {
            error!(%reason, "failed to deliver notification");
        }
    }
}
