use futures::StreamExt;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::brain::FileBrain;
use crate::bus::{MessageBus, Outbox};
use crate::command::{Command, CommandParser, Inbound, teach_reply, undo_reply};
use crate::config::ReflexConfig;
use crate::reactor::Reactor;
use crate::types::Response;

/// What the bot did with an inbound line.
#[derive(Debug)]
pub enum Handled {
    /// A command was executed and answered.
    Replied(String),
    /// A reaction was picked and will be emitted after the reaction delay.
    Scheduled(JoinHandle<()>),
    /// Nothing to do.
    Ignored,
}

/// Routes chat lines to commands or to passive match-and-fire.
pub struct Bot {
    reactor: Arc<Reactor>,
    parser: CommandParser,
    outbox: Arc<dyn Outbox>,
    reaction_delay: Duration,
}

impl Bot {
    pub fn new(
        reactor: Arc<Reactor>,
        parser: CommandParser,
        outbox: Arc<dyn Outbox>,
        reaction_delay: Duration,
    ) -> Self {
        Self {
            reactor,
            parser,
            outbox,
            reaction_delay,
        }
    }

    pub fn reactor(&self) -> &Arc<Reactor> {
        &self.reactor
    }

    pub async fn handle(&self, text: &str) -> anyhow::Result<Handled> {
        match self.parser.classify(text) {
            Inbound::Command(Command::Teach { term, response }) => {
                let record = self.reactor.teach(&term, &response).await;
                self.reply(teach_reply(&record)).await
            }
            Inbound::Command(Command::Undo) => {
                let outcome = self.reactor.undo_last().await;
                self.reply(undo_reply(&outcome)).await
            }
            Inbound::Directed => {
                debug!("ignoring unrecognised command");
                Ok(Handled::Ignored)
            }
            Inbound::Heard => {
                let candidates = self.reactor.candidates(text).await;
                match pick(&candidates) {
                    Some(chosen) => Ok(Handled::Scheduled(self.schedule(chosen))),
                    None => Ok(Handled::Ignored),
                }
            }
        }
    }

    async fn reply(&self, text: String) -> anyhow::Result<Handled> {
        self.outbox.send(&text).await?;
        Ok(Handled::Replied(text))
    }

    /// Emit `chosen` after the reaction delay. No lock is held while
    /// waiting. The key is claimed in the ledger before sending, so a line
    /// that matched the same key during the delay does not fire it again.
    fn schedule(&self, chosen: Response) -> JoinHandle<()> {
        let reactor = Arc::clone(&self.reactor);
        let outbox = Arc::clone(&self.outbox);
        let delay = self.reaction_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !reactor.try_fire(&chosen).await {
                return;
            }
            if let Err(e) = outbox.send(&chosen.response).await {
                warn!(key = %chosen.key, "failed to emit reaction: {e:#}");
            }
        })
    }
}

/// Uniformly random candidate.
fn pick(candidates: &[Response]) -> Option<Response> {
    candidates.choose(&mut rand::thread_rng()).cloned()
}

fn track(pending: &mut Vec<JoinHandle<()>>, handled: anyhow::Result<Handled>) {
    pending.retain(|handle| !handle.is_finished());
    match handled {
        Ok(Handled::Scheduled(handle)) => pending.push(handle),
        Ok(_) => {}
        Err(e) => warn!("failed to handle message: {e:#}"),
    }
}

/// Run the bot until the input stream ends.
pub async fn run(config: ReflexConfig) -> anyhow::Result<()> {
    let brain = Arc::new(FileBrain::new(config.storage.brain_dir()));
    let reactor = Arc::new(Reactor::load(&config.react, brain).await);

    let mut bus = MessageBus::new(config.bot.outbound_subject.clone());
    if let Some(url) = &config.bot.nats_url {
        bus.connect(url).await?;
    }
    let subscriber = bus.subscribe(&config.bot.inbound_subject).await?;
    let bus = Arc::new(bus);

    let parser = CommandParser::new(&config.bot.name)
        .map_err(|e| anyhow::anyhow!("invalid bot name {:?}: {e}", config.bot.name))?;
    let bot = Bot::new(
        reactor,
        parser,
        bus.clone(),
        config.react.reaction_delay(),
    );

    info!(name = %config.bot.name, connected = bus.is_connected(), "bot started");

    let mut pending: Vec<JoinHandle<()>> = Vec::new();
    match subscriber {
        Some(mut subscriber) => {
            while let Some(message) = subscriber.next().await {
                let text = String::from_utf8_lossy(&message.payload);
                track(&mut pending, bot.handle(&text).await);
            }
        }
        None => {
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                track(&mut pending, bot.handle(&line).await);
            }
        }
    }

    // Let reactions that were already picked go out before exiting.
    drain(pending).await;
    info!("input closed, shutting down");
    Ok(())
}

/// Await every pending reaction. Returns how many tasks failed.
async fn drain(pending: Vec<JoinHandle<()>>) -> usize {
    let mut failed = 0;
    for handle in pending {
        if let Err(e) = handle.await {
            warn!("reaction task failed: {e}");
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_counts_panicked_reactions() {
        let pending = vec![
            tokio::spawn(async {}),
            tokio::spawn(async { panic!("outbox exploded") }),
        ];
        assert_eq!(drain(pending).await, 1);
    }
}
