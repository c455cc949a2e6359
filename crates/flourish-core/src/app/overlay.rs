//! OverlayModel - ページ右下に出すスコア表示の headless 版
//!
//! 接続時に `GET_STATE` で初期値を読み、以降はブロードキャストに従う。

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::host::Host;
use crate::bus::ObserverHandler;
use crate::domain::events::Broadcast;
use crate::domain::message::{Request, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlaySnapshot {
    pub score: u32,
    pub visible: bool,
    pub trend: Trend,
}

impl Default for OverlaySnapshot {
    fn default() -> Self {
        Self {
            score: 0,
            visible: true,
            trend: Trend::Rising,
        }
    }
}

impl OverlaySnapshot {
    fn apply(&mut self, message: &Broadcast) {
        match *message {
            Broadcast::ScoreUpdate { score } => {
                if score != self.score {
                    self.trend = if score > self.score { Trend::Rising } else { Trend::Falling };
                }
                self.score = score;
            }
            Broadcast::OverlayVisibilityChanged { enabled } => self.visible = enabled,
        }
    }

    /// One-line rendering; `None` while hidden.
    pub fn render(&self) -> Option<String> {
        if !self.visible {
            return None;
        }
        let icon = match self.trend {
            Trend::Rising => "📈",
            Trend::Falling => "📉",
        };
        Some(format!("{icon} {}", self.score))
    }
}

pub struct OverlayModel {
    host: Host,
    snapshot: Mutex<OverlaySnapshot>,
}

impl OverlayModel {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            snapshot: Mutex::new(OverlaySnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> OverlaySnapshot {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn render(&self) -> Option<String> {
        self.snapshot().render()
    }

    fn update(&self, f: impl FnOnce(&mut OverlaySnapshot)) {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut snapshot);
    }
}

#[async_trait]
impl ObserverHandler for OverlayModel {
    async fn on_connect(&self) {
        match self.host.send(Request::GetState).await {
            Ok(Response::State(state)) => self.update(|snapshot| {
                snapshot.score = state.score;
                snapshot.visible = state.overlay_enabled;
            }),
            Ok(other) => warn!(response = ?other, "unexpected GET_STATE response"),
            Err(e) => warn!(error = %e, "failed to load initial overlay state"),
        }
    }

    async fn on_broadcast(&self, message: Broadcast) {
        debug!(?message, "overlay update");
        self.update(|snapshot| snapshot.apply(&message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::HostBuilder;
    use crate::app::state_repo::fields;
    use crate::impls::{InMemoryStateStore, ManualTabSource};

    #[test]
    fn snapshot_follows_broadcasts() {
        let mut snapshot = OverlaySnapshot::default();
        assert_eq!(snapshot.render().as_deref(), Some("📈 0"));

        snapshot.apply(&Broadcast::ScoreUpdate { score: 12 });
        assert_eq!(snapshot.render().as_deref(), Some("📈 12"));

        snapshot.apply(&Broadcast::ScoreUpdate { score: 11 });
        assert_eq!(snapshot.render().as_deref(), Some("📉 11"));

        // 同じ値では傾向を変えない
        snapshot.apply(&Broadcast::ScoreUpdate { score: 11 });
        assert_eq!(snapshot.trend, Trend::Falling);

        snapshot.apply(&Broadcast::OverlayVisibilityChanged { enabled: false });
        assert_eq!(snapshot.render(), None);
        assert_eq!(snapshot.score, 11);
    }

    #[tokio::test]
    async fn connect_loads_the_stored_state() {
        let host = HostBuilder::new()
            .store(InMemoryStateStore::new())
            .tabs(ManualTabSource::new())
            .build()
            .unwrap();
        host.repo().set::<fields::Score>(&64).await.unwrap();
        host.repo().set::<fields::OverlayEnabled>(&false).await.unwrap();

        let overlay = OverlayModel::new(host.clone());
        overlay.on_connect().await;

        assert_eq!(
            overlay.snapshot(),
            OverlaySnapshot { score: 64, visible: false, trend: Trend::Rising }
        );
        assert_eq!(overlay.render(), None);

        overlay.on_broadcast(Broadcast::OverlayVisibilityChanged { enabled: true }).await;
        assert_eq!(overlay.render().as_deref(), Some("📈 64"));
        host.suspend().await;
    }
}
