#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
mod arg_parse;
mod common;
mod config;
mod feeds;
mod relay;
mod scheduler;
mod sender;
mod storage;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    arg_parse::CmdArgs,
    config::AppConfig,
    relay::Relay,
    scheduler::{run_once, signal_or_pending, Scheduler, SHUTDOWN_GRACE},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    common::logging::init();

    let args = CmdArgs::parse(std::env::args().collect())?;
    let config = AppConfig::load(args.config.as_deref())?;
    let mut relay = Relay::new(&config, args.dry_run)?;

    if args.once {
        run_once(&mut relay).await;
        if !relay.notifier().wait_idle(SHUTDOWN_GRACE).await {
            tracing::warn!("Exiting with messages still in flight");
        }
        return Ok(());
    }

    let mut scheduler = Scheduler::new(&config, CancellationToken::new());
    let deadline = scheduler
        .run_until(&mut relay, termination_signal(), SHUTDOWN_GRACE)
        .await;
    tracing::debug!(state = ?scheduler.state(), "Poll loop finished");

    let remaining = deadline.saturating_duration_since(Instant::now());
    if !relay.notifier().wait_idle(remaining).await {
        tracing::warn!("Exiting with messages still in flight");
    }
    tracing::info!("Stopped");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix. A listener that fails to install
/// is logged and ignored.
async fn termination_signal() {
    let ctrl_c = signal_or_pending(tokio::signal::ctrl_c(), "Ctrl-C");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = signal_or_pending(
            async {
                match signal(SignalKind::terminate())?.recv().await {
                    Some(()) => Ok::<(), std::io::Error>(()),
                    None => Err(std::io::Error::other("SIGTERM stream closed")),
                }
            },
            "SIGTERM",
        );
        tokio::select! {
            () = ctrl_c => {}
            () = sigterm => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
