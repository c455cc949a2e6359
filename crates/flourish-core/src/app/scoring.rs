//! ScoringEngine - 1 tick ごとのスコア更新
//!
//! # フロー（毎 tick、この順番で）
//! 1. 日付が変わっていたらリセット（score=0, plants=[]）してブロードキャスト
//! 2. アクティブなタブを取得（なし / 内部ページならスキップ）
//! 3. ホスト名を分類して delta を得る（0 ならスキップ）
//! 4. `clamp(score + delta, 0, max_score)` を保存してブロードキャスト
//!
//! 1 回の tick の失敗はログに残すだけで、次の tick には影響しない。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::state_repo::{StateRepo, StateUpdate, fields};
use crate::domain::classifier::{Classification, classify};
use crate::domain::errors::{FlourishError, StoreError};
use crate::domain::events::Broadcast;
use crate::domain::site::{extract_host, is_internal_url};
use crate::ports::{Clock, TabSource};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was still running; nothing was done.
    Overlapped,
    /// No focused tab, or the tab has no URL.
    NoActiveTab,
    /// Browser-internal page or a URL without a host.
    Ignored,
    /// The site is in neither list.
    Neutral,
    /// The score was written and broadcast.
    Scored { score: u32, delta: i32 },
    /// The tick failed; see the log.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// The daily reset ran during this tick.
    pub daily_reset: bool,
    pub outcome: TickOutcome,
}

/// `clamp(score + delta, 0, max_score)`.
pub fn apply_delta(score: u32, delta: i32, max_score: u32) -> u32 {
    (i64::from(score) + i64::from(delta)).clamp(0, i64::from(max_score)) as u32
}

pub struct ScoringEngine {
    repo: StateRepo,
    tabs: Arc<dyn TabSource>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<Broadcast>,
    max_score: u32,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the tick ends (including on early return).
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScoringEngine {
    pub fn new(
        repo: StateRepo,
        tabs: Arc<dyn TabSource>,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<Broadcast>,
        max_score: u32,
    ) -> Self {
        Self {
            repo,
            tabs,
            clock,
            events,
            max_score,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn repo(&self) -> &StateRepo {
        &self.repo
    }

    /// Run one tick. Never fails; errors are logged and reported as `Failed`.
    pub async fn tick(&self) -> TickReport {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            warn!("previous score tick still running, skipping");
            return TickReport {
                daily_reset: false,
                outcome: TickOutcome::Overlapped,
            };
        };

        let daily_reset = match self.reset_if_new_day().await {
            Ok(reset) => reset,
            Err(e) => {
                error!(error = %e, "daily reset check failed");
                return TickReport {
                    daily_reset: false,
                    outcome: TickOutcome::Failed,
                };
            }
        };

        let outcome = match self.sample_and_score().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "error updating score");
                TickOutcome::Failed
            }
        };

        TickReport { daily_reset, outcome }
    }

    /// Reset the score if the calendar day changed since the last reset.
    ///
    /// Checked on every tick: the process may sleep across midnight.
    pub async fn reset_if_new_day(&self) -> Result<bool, StoreError> {
        let last_reset = self.repo.get::<fields::LastResetDate>().await?;
        let today = self.clock.today();
        if last_reset == today {
            return Ok(false);
        }

        info!(%last_reset, %today, "new day detected, resetting score");
        let update = StateUpdate::new()
            .set::<fields::Score>(&0)?
            .set::<fields::Plants>(&Vec::new())?
            .set::<fields::LastResetDate>(&today)?
            .set::<fields::LastUpdated>(&self.now_ms())?;
        self.repo.apply(update).await?;
        self.broadcast(Broadcast::ScoreUpdate { score: 0 });
        Ok(true)
    }

    /// `RESET_SCORE`: independent of the daily check.
    pub async fn reset_score(&self) -> Result<(), StoreError> {
        let update = StateUpdate::new()
            .set::<fields::Score>(&0)?
            .set::<fields::Plants>(&Vec::new())?
            .set::<fields::LastUpdated>(&self.now_ms())?;
        self.repo.apply(update).await?;
        info!("score reset on request");
        self.broadcast(Broadcast::ScoreUpdate { score: 0 });
        Ok(())
    }

    /// Current classification of `host` against the stored lists.
    pub async fn classify_host(&self, host: &str) -> Result<Classification, StoreError> {
        let productive = self.repo.get::<fields::ProductiveSites>().await?;
        let unproductive = self.repo.get::<fields::UnproductiveSites>().await?;
        Ok(classify(host, &productive, &unproductive))
    }

    async fn sample_and_score(&self) -> Result<TickOutcome, FlourishError> {
        let Some(url) = self.tabs.active_tab().await?.and_then(|tab| tab.url) else {
            return Ok(TickOutcome::NoActiveTab);
        };
        if is_internal_url(&url) {
            return Ok(TickOutcome::Ignored);
        }
        let Some(host) = extract_host(&url) else {
            return Ok(TickOutcome::Ignored);
        };

        let delta = self.classify_host(&host).await?.delta();
        if delta == 0 {
            debug!(%host, "neutral site");
            return Ok(TickOutcome::Neutral);
        }

        let current = self.repo.get::<fields::Score>().await?;
        let score = apply_delta(current, delta, self.max_score);
        let update = StateUpdate::new()
            .set::<fields::Score>(&score)?
            .set::<fields::LastUpdated>(&self.now_ms())?;
        self.repo.apply(update).await?;

        debug!(%host, delta, score, "score updated");
        self.broadcast(Broadcast::ScoreUpdate { score });
        Ok(TickOutcome::Scored { score, delta })
    }

    fn broadcast(&self, message: Broadcast) {
        // 受信者がいなくてもエラーにしない（fire-and-forget）
        if self.events.send(message).is_err() {
            debug!("no observers connected, broadcast dropped");
        }
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }
}
