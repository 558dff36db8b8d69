use async_nats::{Client, Subscriber};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Where the bot's replies and reactions go.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send(&self, text: &str) -> anyhow::Result<()>;
}

/// NATS message bus carrying chat lines in and bot output out.
///
/// Without a server the bus runs in local mode: output goes to stdout and
/// the caller reads input from stdin.
pub struct MessageBus {
    client: Option<Client>,
    outbound_subject: String,
}

impl MessageBus {
    pub fn new(outbound_subject: impl Into<String>) -> Self {
        Self {
            client: None,
            outbound_subject: outbound_subject.into(),
        }
    }

    /// Connect to a NATS server. If no server is available, runs in
    /// local-only mode.
    pub async fn connect(&mut self, url: &str) -> anyhow::Result<()> {
        match async_nats::connect(url).await {
            Ok(client) => {
                info!("connected to NATS at {url}");
                self.client = Some(client);
                Ok(())
            }
            Err(e) => {
                info!("NATS not available ({e}), running in local-only mode");
                Ok(())
            }
        }
    }

    /// Subscribe to inbound chat lines. `None` in local mode.
    pub async fn subscribe(&self, subject: &str) -> anyhow::Result<Option<Subscriber>> {
        match &self.client {
            Some(client) => {
                let subscriber = client
                    .subscribe(subject.to_string())
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to subscribe to {subject}: {e}"))?;
                info!(subject, "listening for chat lines");
                Ok(Some(subscriber))
            }
            None => Ok(None),
        }
    }

    /// Publish a message to a subject. No-op in local mode.
    pub async fn publish(&self, subject: &str, payload: &[u8]) -> anyhow::Result<()> {
        if let Some(client) = &self.client {
            client
                .publish(subject.to_string(), payload.to_vec().into())
                .await?;
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn outbound_subject(&self) -> &str {
        &self.outbound_subject
    }
}

#[async_trait]
impl Outbox for MessageBus {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        if self.is_connected() {
            self.publish(&self.outbound_subject, text.as_bytes()).await
        } else {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(format!("{text}\n").as_bytes()).await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}
