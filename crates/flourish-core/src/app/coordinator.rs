//! Coordinator - スコアリングとコマンドを 1 本のタスクで直列化するアクター
//!
//! # 構成
//! - `mpsc` でコマンドを受け取り、`oneshot` で応答を返す
//! - 最初の接続（リース 0→1）で tick の interval を開始する
//! - リースが 0 に戻っても interval は止めない（停止は `shutdown` のみ）
//!
//! tick とコマンドは同じループで処理されるので、互いに割り込まない。

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::scoring::ScoringEngine;
use super::state_repo::{StateRepo, fields};
use crate::bus::{Connection, LeaseCounter};
use crate::domain::classifier::normalize_domain;
use crate::domain::errors::{BusError, FlourishError, MessageError};
use crate::domain::events::Broadcast;
use crate::domain::message::{Request, Response, SiteList};

const COMMAND_BUFFER: usize = 32;

enum Command {
    Request {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    Connect {
        reply: oneshot::Sender<Connection>,
    },
}

/// Client side of a running coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Send a request and wait for its response.
    pub async fn send(&self, request: Request) -> Result<Response, BusError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Request { request, reply })
            .await
            .map_err(|_| BusError::Disconnected)?;
        rx.await.map_err(|_| BusError::NoReply)
    }

    /// Send a wire-form request.
    ///
    /// Unknown message types are ignored with a warning and answered with
    /// `null`; a known type with a bad payload is answered with an error.
    pub async fn send_json(&self, message: &Value) -> Result<Value, BusError> {
        let response = match Request::from_json(message) {
            Ok(request) => self.send(request).await?,
            Err(MessageError::UnknownType(kind)) => {
                warn!(message_type = %kind, "unknown message type");
                Response::Done
            }
            Err(e) => {
                warn!(error = %e, "rejected message");
                Response::error(e.to_string())
            }
        };
        serde_json::to_value(&response).map_err(|e| {
            error!(error = %e, "failed to encode response");
            BusError::NoReply
        })
    }

    /// Open an observer connection.
    pub async fn connect(&self) -> Result<Connection, BusError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Connect { reply })
            .await
            .map_err(|_| BusError::Disconnected)?;
        rx.await.map_err(|_| BusError::Disconnected)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A spawned coordinator task.
pub struct RunningCoordinator {
    handle: CoordinatorHandle,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RunningCoordinator {
    pub fn handle(&self) -> CoordinatorHandle {
        self.handle.clone()
    }

    /// Stop the interval, close every observer stream and wait for the task.
    pub async fn shutdown(self) {
        // receiver may already be gone if the task ended on its own
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            error!(error = %e, "coordinator task panicked");
        }
    }
}

pub struct Coordinator {
    engine: ScoringEngine,
    events: broadcast::Sender<Broadcast>,
    leases: LeaseCounter,
    tick_interval: Duration,
    ticker: Option<Interval>,
}

enum Event {
    Shutdown,
    Command(Command),
    Tick,
}

impl Coordinator {
    /// `events` must be the sender the engine broadcasts on.
    pub fn new(engine: ScoringEngine, events: broadcast::Sender<Broadcast>, tick_interval: Duration) -> Self {
        Self {
            engine,
            events,
            leases: LeaseCounter::new(),
            tick_interval,
            ticker: None,
        }
    }

    pub fn spawn(self) -> RunningCoordinator {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(rx, shutdown_rx));
        RunningCoordinator {
            handle: CoordinatorHandle { tx },
            shutdown_tx,
            join,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>, mut shutdown_rx: watch::Receiver<bool>) {
        self.start_up().await;

        loop {
            let event = tokio::select! {
                _ = shutdown_rx.changed() => Event::Shutdown,
                command = rx.recv() => match command {
                    Some(command) => Event::Command(command),
                    None => Event::Shutdown,
                },
                _ = next_tick(&mut self.ticker) => Event::Tick,
            };

            match event {
                Event::Shutdown => break,
                Event::Command(command) => self.handle(command).await,
                Event::Tick => {
                    let report = self.engine.tick().await;
                    debug!(?report, "tick");
                }
            }
        }

        info!(open_connections = self.leases.active(), "coordinator stopped");
    }

    /// Fill in missing keys and run the daily check once at wake.
    async fn start_up(&self) {
        match self.engine.repo().initialize_defaults().await {
            Ok(written) if !written.is_empty() => info!(keys = ?written, "initialized default state"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "failed to initialize state"),
        }
        if let Err(e) = self.engine.reset_if_new_day().await {
            error!(error = %e, "daily reset check failed");
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { reply } => {
                let connection = Connection::new(self.leases.acquire(), self.events.subscribe());
                if connection.is_first() && self.ticker.is_none() {
                    self.start_sampler();
                }
                debug!(open_connections = self.leases.active(), "observer connection opened");
                if reply.send(connection).is_err() {
                    debug!("connecting observer went away");
                }
            }
            Command::Request { request, reply } => {
                let response = self.handle_request(request).await;
                if reply.send(response).is_err() {
                    debug!("requester went away before the response");
                }
            }
        }
    }

    fn start_sampler(&mut self) {
        let start = tokio::time::Instant::now() + self.tick_interval;
        let mut ticker = tokio::time::interval_at(start, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
        info!(interval_ms = self.tick_interval.as_millis() as u64, "score sampler started");
    }

    async fn handle_request(&self, request: Request) -> Response {
        let message_type = request.message_type();
        match self.apply(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(message_type, error = %e, "request failed");
                Response::error(e.to_string())
            }
        }
    }

    async fn apply(&self, request: Request) -> Result<Response, FlourishError> {
        let repo = self.engine.repo();
        match request {
            Request::GetState => Ok(Response::State(Box::new(repo.get_all().await?))),
            Request::AddSite { list, domain } => {
                let domain = checked_domain(request_type(list, true), &domain)?;
                let mut sites = load_list(repo, list).await?;
                if !sites.contains(&domain) {
                    sites.push(domain.clone());
                    store_list(repo, list, &sites).await?;
                    info!(?list, %domain, "site added");
                }
                Ok(Response::Done)
            }
            Request::RemoveSite { list, domain } => {
                let domain = checked_domain(request_type(list, false), &domain)?;
                let mut sites = load_list(repo, list).await?;
                let before = sites.len();
                sites.retain(|site| *site != domain);
                if sites.len() != before {
                    store_list(repo, list, &sites).await?;
                    info!(?list, %domain, "site removed");
                }
                Ok(Response::Done)
            }
            Request::ToggleOverlay { enabled } => {
                repo.set::<fields::OverlayEnabled>(&enabled).await?;
                if self.events.send(Broadcast::OverlayVisibilityChanged { enabled }).is_err() {
                    debug!("no observers connected, broadcast dropped");
                }
                Ok(Response::Done)
            }
            Request::ResetScore => {
                self.engine.reset_score().await?;
                Ok(Response::Done)
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn request_type(list: SiteList, add: bool) -> &'static str {
    match (list, add) {
        (SiteList::Productive, true) => Request::ADD_PRODUCTIVE_SITE,
        (SiteList::Productive, false) => Request::REMOVE_PRODUCTIVE_SITE,
        (SiteList::Unproductive, true) => Request::ADD_UNPRODUCTIVE_SITE,
        (SiteList::Unproductive, false) => Request::REMOVE_UNPRODUCTIVE_SITE,
    }
}

fn checked_domain(message: &'static str, domain: &str) -> Result<String, MessageError> {
    let normalized = normalize_domain(domain);
    if normalized.is_empty() {
        return Err(MessageError::InvalidPayload {
            message,
            reason: "domain is empty".to_string(),
        });
    }
    Ok(normalized)
}

async fn load_list(repo: &StateRepo, list: SiteList) -> Result<Vec<String>, FlourishError> {
    let sites = match list {
        SiteList::Productive => repo.get::<fields::ProductiveSites>().await?,
        SiteList::Unproductive => repo.get::<fields::UnproductiveSites>().await?,
    };
    Ok(sites)
}

async fn store_list(repo: &StateRepo, list: SiteList, sites: &Vec<String>) -> Result<(), FlourishError> {
    match list {
        SiteList::Productive => repo.set::<fields::ProductiveSites>(sites).await?,
        SiteList::Unproductive => repo.set::<fields::UnproductiveSites>(sites).await?,
    }
    Ok(())
}
