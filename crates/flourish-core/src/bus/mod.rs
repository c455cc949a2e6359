//! Bus - コーディネーターとオブザーバーをつなぐ接続
//!
//! # 構成
//! - **Connection**: ブロードキャストの受信口 + 生存リース
//! - **Connector**: 接続を開く側（`Host` が実装）
//! - **LeaseCounter**: 開いている接続の数
//! - **ObserverLoop**: 切断されたら固定遅延で再接続するループ
//!
//! ブロードキャストは fire-and-forget。受信者ごとの順序は保たれる。

pub mod lease;
pub mod observer;
pub mod reconnect;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::domain::errors::BusError;
use crate::domain::events::Broadcast;

pub use self::lease::{Lease, LeaseCounter};
pub use self::observer::{ObserverExit, ObserverHandler, ObserverLoop};
pub use self::reconnect::ReconnectPolicy;

/// One open observer connection.
///
/// Dropping it releases the lease.
#[derive(Debug)]
pub struct Connection {
    lease: Lease,
    receiver: broadcast::Receiver<Broadcast>,
}

impl Connection {
    pub fn new(lease: Lease, receiver: broadcast::Receiver<Broadcast>) -> Self {
        Self { lease, receiver }
    }

    /// This connection took the lease count from 0 to 1.
    pub fn is_first(&self) -> bool {
        self.lease.is_first()
    }

    /// Next broadcast, or `None` once the coordinator is gone.
    ///
    /// A lagging receiver skips the missed messages and keeps going.
    pub async fn recv(&mut self) -> Option<Broadcast> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "observer lagged behind, broadcasts dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Opens observer connections.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Connection, BusError>;
}
