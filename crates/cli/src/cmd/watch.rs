//! Watch a directory and convert Markdown files once they settle

use anyhow::{Context, Result};
use convert::PandocConverter;
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use watcher::{DebounceScheduler, WatchSession, WatchTarget};

pub async fn run(directory: &Path, recursive: bool, delay_secs: Option<u64>) -> Result<()> {
    let config = crate::config::load();

    let delay = Duration::from_secs(delay_secs.unwrap_or(config.delay_secs));
    let recursive = recursive || config.recursive;

    let root = directory
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", directory.display()))?;

    let converter = Arc::new(PandocConverter::new());
    converter
        .check_available()
        .await
        .context("conversion toolchain is not available")?;

    let scheduler = DebounceScheduler::new(delay, converter);
    let target = WatchTarget::new(root.clone(), recursive, config.extensions.clone());

    println!("Watching {} for changes to Markdown files...", root.display());
    println!(
        "Conversion triggers {} second(s) after the last change (Ctrl-C to stop)",
        delay.as_secs()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let on_change = {
        let scheduler = scheduler.clone();
        move |path| scheduler.notify(path)
    };
    let mut session = WatchSession::new(target, on_change);
    let mut session_task = tokio::spawn(async move { session.run(shutdown_rx).await });

    tokio::select! {
        // Session ended on its own: configuration or event source failure
        result = &mut session_task => {
            scheduler.shutdown();
            result.context("watch session panicked")??;
            Ok(())
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            println!("\n{}", "Stopping watcher...".yellow());

            let _ = shutdown_tx.send(true);
            let result = session_task.await.context("watch session panicked")?;
            scheduler.shutdown();
            result?;
            Ok(())
        }
    }
}
