mod cli;
mod logger;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;

use flourish_core::FlourishConfig;
use flourish_core::app::{GardenObserver, Host, HostBuilder, OverlayModel};
use flourish_core::domain::{Request, Response, SiteList, parse_site_input};
use flourish_core::impls::{JsonFileStore, ManualTabSource};
use flourish_core::ports::{SystemClock, UlidGenerator};

use crate::cli::{Cli, Command, Toggle, Visit};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => FlourishConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => FlourishConfig::default(),
    };
    if let Command::Simulate { interval_ms: Some(ms), .. } = &cli.command {
        config.tick_interval_ms = *ms;
    }

    let tabs = ManualTabSource::new();
    let host = HostBuilder::new()
        .store(JsonFileStore::new(&cli.state))
        .tabs(tabs.clone())
        .config(config)
        .build()?;
    tracing::debug!(state = %cli.state.display(), "using state file");

    let result = match cli.command {
        Command::State => request(&host, Request::GetState).await,
        Command::AddProductive { site } => edit(&host, SiteList::Productive, true, &site).await,
        Command::RemoveProductive { site } => edit(&host, SiteList::Productive, false, &site).await,
        Command::AddUnproductive { site } => edit(&host, SiteList::Unproductive, true, &site).await,
        Command::RemoveUnproductive { site } => edit(&host, SiteList::Unproductive, false, &site).await,
        Command::Overlay { toggle } => {
            request(&host, Request::ToggleOverlay { enabled: toggle == Toggle::On }).await
        }
        Command::Reset => request(&host, Request::ResetScore).await,
        Command::Simulate { visits, seed, .. } => simulate(&host, &tabs, &visits, seed).await,
    };

    host.suspend().await;
    result
}

async fn request(host: &Host, request: Request) -> anyhow::Result<()> {
    match host.send(request).await? {
        Response::State(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        Response::Done => println!("ok"),
        Response::Error { error } => bail!(error),
    }
    Ok(())
}

async fn edit(host: &Host, list: SiteList, add: bool, site: &str) -> anyhow::Result<()> {
    let Some(domain) = parse_site_input(site) else {
        bail!("'{site}' is not a valid domain or URL");
    };
    let message = if add {
        Request::AddSite { list, domain }
    } else {
        Request::RemoveSite { list, domain }
    };
    request(host, message).await
}

async fn simulate(host: &Host, tabs: &ManualTabSource, visits: &[Visit], seed: Option<u64>) -> anyhow::Result<()> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let garden = Arc::new(GardenObserver::new(
        host.repo(),
        host.config().garden_rules(),
        rng,
        Arc::new(UlidGenerator::new(SystemClock)),
    ));
    let overlay = Arc::new(OverlayModel::new(host.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let observers = [
        tokio::spawn(host.observer("garden", garden).run(shutdown_rx.clone())),
        tokio::spawn(host.observer("overlay", overlay.clone()).run(shutdown_rx)),
    ];

    let interval = host.config().tick_interval();
    let played = tokio::select! {
        _ = play(tabs, &overlay, visits, interval) => true,
        _ = tokio::signal::ctrl_c() => false,
    };
    if !played {
        tracing::info!("interrupted, stopping simulation");
    }

    // 最後の tick の結果が observer に届くのを少し待つ
    tokio::time::sleep(Duration::from_millis(50)).await;
    let _ = shutdown_tx.send(true);
    for observer in observers {
        observer.await.context("observer task panicked")?;
    }

    request(host, Request::GetState).await
}

async fn play(tabs: &ManualTabSource, overlay: &OverlayModel, visits: &[Visit], interval: Duration) {
    for visit in visits {
        tabs.visit(visit.url.clone());
        tracing::info!(url = %visit.url, ticks = visit.ticks, "visiting");
        tokio::time::sleep(interval * visit.ticks).await;
        match overlay.render() {
            Some(line) => println!("{line}  <- {}", visit.url),
            None => println!("(overlay hidden)  <- {}", visit.url),
        }
    }
    tabs.blank();
}
