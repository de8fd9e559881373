mod config;
mod console;

use std::sync::Arc;
use std::time::Duration;

use adapter::{live_url, LiveFeed, RestClient, WsFeed};
use anyhow::Context;
use domain::AttachmentNormalizer;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use viewmodel::{Command, Controller, ViewModel};

use config::Settings;
use console::Input;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    // stdout carries the rendered tree
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::new().context("Failed to load configuration")?;

    let api = RestClient::new(
        &settings.api.base_url,
        Duration::from_secs(settings.api.timeout_secs),
    )
    .context("Failed to build API client")?;
    let normalizer = AttachmentNormalizer::new(
        &settings.storage.image_base_url,
        &settings.storage.file_base_url,
    );

    let cancel = CancellationToken::new();
    let (tx_feed, rx_feed) = mpsc::channel(100);
    let (tx_cmd, rx_cmd) = mpsc::channel(32);

    if settings.live.enabled {
        let url = live_url(&settings.api.base_url, &settings.live.path)?;
        let feed = WsFeed::new(url, Duration::from_secs(settings.live.reconnect_delay_secs));
        let cancel_for_feed = cancel.clone();

        tokio::spawn(async move {
            if let Err(e) = feed.run(tx_feed, cancel_for_feed).await {
                tracing::error!("Live feed crashed: {:?}", e);
            }
        });
    } else {
        info!("Live updates disabled");
        drop(tx_feed);
    }

    let (controller, mut rx_state) = Controller::new(Arc::new(api), ViewModel::new(normalizer));
    let controller = tokio::spawn(controller.run(rx_cmd, rx_feed, cancel.clone()));

    tokio::spawn(async move {
        while rx_state.changed().await.is_ok() {
            let frame = console::render(&rx_state.borrow_and_update());
            println!("{}", frame);
        }
    });

    println!("{}", console::USAGE);
    let session = run_console(tx_cmd).await;

    cancel.cancel();
    controller.await??;
    session?;
    info!("Bye");

    Ok(())
}

/// Returns `false` once the session should end.
async fn dispatch(line: &str, tx_cmd: &mpsc::Sender<Command>) -> bool {
    let command = match console::parse_line(line) {
        Ok(None) => return true,
        Ok(Some(Input::Quit)) => return false,
        Ok(Some(Input::Help)) => {
            println!("{}", console::USAGE);
            return true;
        }
        Ok(Some(Input::Command(command))) => command,
        Ok(Some(Input::Attach(kind, path))) => {
            match console::load_attachment(kind, &path).await {
                Ok(attachment) => Command::Attach(attachment),
                Err(e) => {
                    println!("cannot attach {}: {}", path.display(), e);
                    return true;
                }
            }
        }
        Err(e) => {
            println!("{}", e);
            return true;
        }
    };

    tx_cmd.send(command).await.is_ok()
}

/// Feeds stdin lines to the controller until `quit`, end of input, Ctrl+C
/// or SIGTERM. Dropping `tx_cmd` on return stops the controller.
async fn run_console(tx_cmd: mpsc::Sender<Command>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    let terminate = terminated();
    tokio::pin!(ctrl_c, terminate);

    loop {
        let line = tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, closing the console");
                return Ok(());
            }
            res = &mut terminate => {
                res.context("failed to listen for SIGTERM")?;
                info!("Received SIGTERM, closing the console");
                return Ok(());
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            info!("Input closed");
            return Ok(());
        };
        if !dispatch(&line, &tx_cmd).await {
            return Ok(());
        }
    }
}

#[cfg(unix)]
async fn terminated() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminated() -> std::io::Result<()> {
    std::future::pending().await
}
