//! GardenObserver - スコアの変化に合わせて Plant を増減させる
//!
//! `SCORE_UPDATE` を受け取るたびに保存済みの Plant を読み、
//! `PlantReconciler` で目標の重さに合わせ、変化があれば書き戻す。
//! 接続直後にも現在のスコアで一度合わせる。

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::state_repo::{StateRepo, fields};
use crate::bus::ObserverHandler;
use crate::domain::errors::StoreError;
use crate::domain::events::Broadcast;
use crate::domain::reconciler::{GardenRules, PlantReconciler, ReconcileReport};
use crate::ports::IdGenerator;

pub struct GardenObserver<R> {
    repo: StateRepo,
    // 読み込みから書き戻しまでを 1 回ずつ直列化する
    reconciler: Mutex<PlantReconciler<R>>,
    ids: Arc<dyn IdGenerator>,
}

impl<R: Rng + Send> GardenObserver<R> {
    pub fn new(repo: StateRepo, rules: GardenRules, rng: R, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            repo,
            reconciler: Mutex::new(PlantReconciler::new(rules, rng)),
            ids,
        }
    }

    /// Reconcile the stored plants against `score` and persist any change.
    pub async fn reconcile(&self, score: u32) -> Result<ReconcileReport, StoreError> {
        let mut reconciler = self.reconciler.lock().await;
        let mut plants = self.repo.get::<fields::Plants>().await?;

        let report = reconciler.reconcile(&mut plants, score, self.ids.as_ref());
        if report.saturated {
            debug!(score, "garden saturated");
        }
        if !report.is_noop() {
            self.repo.set::<fields::Plants>(&plants).await?;
            debug!(score, plants = plants.len(), ?report, "garden reconciled");
        }
        Ok(report)
    }

    async fn reconcile_logged(&self, score: u32) {
        if let Err(e) = self.reconcile(score).await {
            error!(score, error = %e, "failed to reconcile garden");
        }
    }
}

#[async_trait]
impl<R: Rng + Send + 'static> ObserverHandler for GardenObserver<R> {
    async fn on_connect(&self) {
        match self.repo.get::<fields::Score>().await {
            Ok(score) => self.reconcile_logged(score).await,
            Err(e) => error!(error = %e, "failed to read score for the garden"),
        }
    }

    async fn on_broadcast(&self, message: Broadcast) {
        if let Broadcast::ScoreUpdate { score } = message {
            self.reconcile_logged(score).await;
        }
    }
}
