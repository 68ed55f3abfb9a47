//! Random article reader
//!
//! Shows a random article, then asks for a new one each time a fetch
//! finishes, the way a reader tapping "next" would. With `--refresh-ms` the
//! requests come from an interval subscription instead.
//!
//! ```text
//! RUST_LOG=uni_dispatch_core=debug cargo run -p random-article -- --fetches 5 --fail-every 3
//! ```

mod action;
mod effects;
mod reducer;
mod service;
mod state;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uni_dispatch::prelude::*;

use crate::action::WikiAction;
use crate::reducer::reducer;
use crate::service::{ArticleService, ServiceConfig};
use crate::state::WikiState;

/// Random article reader - uni-dispatch example
#[derive(Parser, Debug)]
#[command(name = "random-article")]
#[command(about = "Fetch random articles through a uni-dispatch side effect")]
struct Args {
    /// Number of finished fetches before exiting
    #[arg(long, default_value_t = 3)]
    fetches: u32,

    /// Simulated service latency in milliseconds
    #[arg(long, default_value_t = 300)]
    latency_ms: u64,

    /// Make every n-th service call fail (0 = never)
    #[arg(long, default_value_t = 0)]
    fail_every: u32,

    /// Request a new article on this interval instead of after each fetch
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// Print every state as a JSON line
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,uni_dispatch_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let service = ArticleService::new(ServiceConfig {
        latency: Duration::from_millis(args.latency_ms),
        fail_every: args.fail_every,
    });

    let container = Container::builder(WikiState::default())
        .with_reducer(reducer)
        .add_side_effect(effects::fetch_articles(service.clone()))
        .with_middleware(ActionLoggerMiddleware::new(ActionLoggerConfig::default()))
        .with_config(ContainerConfig::labeled("random-article"))
        .start()
        .context("failed to start container")?;

    let mut subscriptions = Subscriptions::new(container.dispatcher());
    match args.refresh_ms {
        Some(ms) => {
            subscriptions.interval_immediate("refresh", Duration::from_millis(ms), || {
                WikiAction::FetchRandomArticle
            });
        }
        None => container.dispatch(WikiAction::FetchRandomArticle)?,
    }

    let mut states = container.observe();
    let mut completed = 0;
    while let Some(state) = states.recv().await {
        print_state(&state, args.json)?;

        if state.completed > completed {
            completed = state.completed;
            if completed >= args.fetches {
                break;
            }
            if args.refresh_ms.is_none() {
                container.dispatch(WikiAction::FetchRandomArticle)?;
            }
        }
    }

    subscriptions.cancel_all();
    container
        .dispose()
        .await
        .context("container stopped with an error")?;
    tracing::info!(calls = service.calls(), completed, "Reader finished");
    Ok(())
}

fn print_state(state: &WikiState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(state)?);
    } else {
        println!("{}", state.render());
    }
    Ok(())
}
