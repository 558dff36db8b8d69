use std::sync::Arc;

use clap::{Parser, Subcommand};
use reflex::brain::FileBrain;
use reflex::command::teach_reply;
use reflex::config::{self, ReflexConfig};
use reflex::reactor::Reactor;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reflex")]
#[command(about = "A chat bot that learns terms and reacts to them")]
#[command(version)]
struct Cli {
    /// Override the brain directory
    #[arg(long, global = true, env = "REFLEX_STATE_DIR")]
    state_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for chat lines (NATS, or stdin in local mode) and react
    Run,

    /// Teach a reaction without going through chat
    Teach {
        /// Word or phrase to react to
        term: String,
        /// Text to respond with
        response: String,
    },

    /// Show which reactions a line would trigger, without firing them
    Match {
        /// Text to match
        text: String,
    },

    /// Show store size, term sizes and throttle ledger size
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = config::load()?;
    if let Some(dir) = cli.state_dir {
        config.storage.dir = Some(dir);
    }

    match cli.command {
        Commands::Run => reflex::bot::run(config).await,
        Commands::Teach { term, response } => {
            let reactor = open_reactor(&config).await;
            let record = reactor.teach(&term, &response).await;
            println!("{}", teach_reply(&record));
            Ok(())
        }
        Commands::Match { text } => {
            let reactor = open_reactor(&config).await;
            let candidates = reactor.candidates(&text).await;
            if candidates.is_empty() {
                println!("No reactions.");
            }
            for candidate in candidates {
                println!("[{}] {}", candidate.key, candidate.response);
            }
            Ok(())
        }
        Commands::Status => {
            let status = open_reactor(&config).await.status().await;
            println!("reflex v{}", env!("CARGO_PKG_VERSION"));
            println!("responses: {}/{}", status.responses, status.capacity);
            println!("terms: {}", status.terms);
            for (size, count) in status.term_sizes {
                println!("  size {size}: {count}");
            }
            println!("throttle ledger: {}", status.ledger_entries);
            Ok(())
        }
    }
}

async fn open_reactor(config: &ReflexConfig) -> Reactor {
    let brain = Arc::new(FileBrain::new(config.storage.brain_dir()));
    Reactor::load(&config.react, brain).await
}
