use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pimbridge::error::{PimError, Result};
use pimbridge::relay::{ChatRelay, PromptRelay};
use pimbridge::settings::{Mode, Settings, DEFAULT_CONFIG_FILE};
use pimbridge::store::SqliteStore;
use pimbridge::transport::Connection;

#[tokio::main]
async fn main() {
    let settings = match Settings::load(DEFAULT_CONFIG_FILE) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(settings).await {
        error!(error = %e, "pimbridge stopped");
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<()> {
    let store = match &settings.store_path {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_in_memory()?,
    };
    let connection = Connection::connect(settings.server_url.as_str());
    connection.await_ready().await?;

    match settings.mode {
        Mode::Query => {
            let relay = PromptRelay::new(&connection, Arc::new(store));
            match relay.process_prompt(&settings.prompt).await {
                Ok(outcome) => info!(?outcome, "prompt processed"),
                Err(e) => error!(error = %e, prompt = %settings.prompt, "prompt failed"),
            }
        }
        Mode::Chat => chat(&connection).await?,
    }
    connection.disconnect().await;
    Ok(())
}

/// Relays stdin lines to the backend and prints what comes back, until either side closes.
async fn chat(connection: &Connection) -> Result<()> {
    let mut incoming = connection
        .incoming()
        .ok_or_else(|| PimError::Transport("incoming frames already taken".into()))?;
    let mut relay = ChatRelay::new(connection);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(text) if text.trim().is_empty() => {}
                    Some(text) => relay.send(text.trim()).await?,
                    None => break,
                }
            }
            frame = incoming.recv() => {
                let Some(frame) = frame else { break };
                let message = relay.receive(&frame);
                println!("< {}", message.text);
            }
        }
    }
    info!(messages = relay.history().len(), "chat ended");
    Ok(())
}
