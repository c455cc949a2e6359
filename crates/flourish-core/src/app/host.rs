//! Host - コーディネーターのライフサイクル
//!
//! ホスト環境はコーディネーターを好きなときに止めたり起こしたりする。
//!
//! | 操作 | 状態遷移 |
//! |---|---|
//! | `connect` / `send` | Dormant → Running（必要なら起こす） |
//! | `suspend` | Running → Dormant（interval 停止、接続は全部閉じる） |
//! | `invalidate` | * → Invalidated（終端。以降の接続は `ContextInvalidated`） |
//!
//! 起こすたびにコーディネーターは最初から始まる（日付チェックも毎回走る）。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::info;

use super::coordinator::{Coordinator, CoordinatorHandle, RunningCoordinator};
use super::scoring::ScoringEngine;
use super::state_repo::StateRepo;
use crate::bus::{Connection, Connector, ObserverHandler, ObserverLoop, ReconnectPolicy};
use crate::config::FlourishConfig;
use crate::domain::errors::BusError;
use crate::domain::message::{Request, Response};
use crate::ports::{Clock, StateStore, TabSource};

pub(crate) struct HostDeps {
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) tabs: Arc<dyn TabSource>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: FlourishConfig,
}

enum Lifecycle {
    Dormant,
    Running(RunningCoordinator),
    Invalidated,
}

/// Owns the coordinator and decides when it runs. Cheap to clone.
#[derive(Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

struct HostInner {
    deps: HostDeps,
    lifecycle: Mutex<Lifecycle>,
}

impl Host {
    pub(crate) fn new(deps: HostDeps) -> Self {
        Self {
            inner: Arc::new(HostInner {
                deps,
                lifecycle: Mutex::new(Lifecycle::Dormant),
            }),
        }
    }

    pub fn config(&self) -> &FlourishConfig {
        &self.inner.deps.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.deps.clock)
    }

    /// Typed view of the state store, for observers that write directly.
    pub fn repo(&self) -> StateRepo {
        StateRepo::new(Arc::clone(&self.inner.deps.store), self.inner.deps.clock.as_ref())
    }

    /// Start the coordinator if it is not running.
    pub async fn wake(&self) -> Result<CoordinatorHandle, BusError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        match &*lifecycle {
            Lifecycle::Invalidated => return Err(BusError::ContextInvalidated),
            Lifecycle::Running(running) if !running.handle().is_closed() => return Ok(running.handle()),
            _ => {}
        }

        let running = self.spawn_coordinator();
        let handle = running.handle();
        *lifecycle = Lifecycle::Running(running);
        info!("coordinator woken");
        Ok(handle)
    }

    pub async fn send(&self, request: Request) -> Result<Response, BusError> {
        self.wake().await?.send(request).await
    }

    pub async fn send_json(&self, message: &Value) -> Result<Value, BusError> {
        self.wake().await?.send_json(message).await
    }

    /// Tear the coordinator down. The next `connect` or `send` starts a new one.
    pub async fn suspend(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Lifecycle::Running(running) = std::mem::replace(&mut *lifecycle, Lifecycle::Dormant) {
            running.shutdown().await;
            info!("coordinator suspended");
        }
    }

    /// Tear the coordinator down for good.
    pub async fn invalidate(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Lifecycle::Running(running) = std::mem::replace(&mut *lifecycle, Lifecycle::Invalidated) {
            running.shutdown().await;
        }
        info!("context invalidated");
    }

    pub async fn is_running(&self) -> bool {
        matches!(&*self.inner.lifecycle.lock().await, Lifecycle::Running(running) if !running.handle().is_closed())
    }

    /// Observer loop connected through this host, using the configured delay.
    pub fn observer(&self, name: &'static str, handler: Arc<dyn ObserverHandler>) -> ObserverLoop {
        let policy = ReconnectPolicy::fixed(self.config().reconnect_delay());
        ObserverLoop::new(name, Arc::new(self.clone()), handler, policy)
    }

    fn spawn_coordinator(&self) -> RunningCoordinator {
        let deps = &self.inner.deps;
        let (events, _) = broadcast::channel(deps.config.broadcast_capacity);
        let engine = ScoringEngine::new(
            self.repo(),
            Arc::clone(&deps.tabs),
            Arc::clone(&deps.clock),
            events.clone(),
            deps.config.max_score,
        );
        Coordinator::new(engine, events, deps.config.tick_interval()).spawn()
    }
}

#[async_trait]
impl Connector for Host {
    async fn connect(&self) -> Result<Connection, BusError> {
        self.wake().await?.connect().await
    }
}
