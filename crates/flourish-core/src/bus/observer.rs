//! ObserverLoop - 接続を維持してブロードキャストを handler に渡す
//!
//! # フロー
//! 1. `Connector::connect()` で接続
//! 2. 接続できたら `on_connect` を呼び、ストリームが閉じるまで `on_broadcast` に渡す
//! 3. 閉じたら固定遅延の後に 1 に戻る
//!
//! 接続失敗のうち `ContextInvalidated` は終端（ログを出して停止）。
//! それ以外は同じ固定遅延で再試行する。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Connector, ReconnectPolicy};
use crate::domain::events::Broadcast;

/// Reacts to broadcasts on an observer connection.
#[async_trait]
pub trait ObserverHandler: Send + Sync {
    /// Called after every successful connect, before any broadcast.
    async fn on_connect(&self) {}

    async fn on_broadcast(&self, message: Broadcast);
}

/// Why an observer loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverExit {
    /// The hosting context was invalidated; reconnecting cannot succeed.
    Invalidated,
    /// Shutdown was requested.
    Shutdown,
}

pub struct ObserverLoop {
    name: &'static str,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn ObserverHandler>,
    policy: ReconnectPolicy,
}

impl ObserverLoop {
    pub fn new(
        name: &'static str,
        connector: Arc<dyn Connector>,
        handler: Arc<dyn ObserverHandler>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            name,
            connector,
            handler,
            policy,
        }
    }

    /// Run until shutdown (`true` sent, or the sender dropped) or invalidation.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> ObserverExit {
        let name = self.name;
        let mut attempts: u32 = 0;

        loop {
            if *shutdown_rx.borrow() {
                return ObserverExit::Shutdown;
            }

            match self.connector.connect().await {
                Ok(mut connection) => {
                    attempts = 0;
                    info!(observer = name, "observer connected");
                    self.handler.on_connect().await;

                    loop {
                        let message = tokio::select! {
                            _ = shutdown_rx.changed() => return ObserverExit::Shutdown,
                            message = connection.recv() => message,
                        };
                        match message {
                            Some(message) => self.handler.on_broadcast(message).await,
                            None => break,
                        }
                    }
                    info!(observer = name, "observer disconnected, reconnecting");
                }
                Err(e) if !self.policy.should_retry(&e) => {
                    warn!(observer = name, error = %e, "observer stopped; reload required");
                    return ObserverExit::Invalidated;
                }
                Err(e) => {
                    attempts += 1;
                    debug!(observer = name, attempts, error = %e, "connect failed, retrying");
                }
            }

            tokio::select! {
                _ = shutdown_rx.changed() => return ObserverExit::Shutdown,
                _ = tokio::time::sleep(self.policy.next_delay(attempts)) => {}
            }
        }
    }
}
