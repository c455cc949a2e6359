//! StateRepo - 型付きの状態アクセス
//!
//! # 学習ポイント
//! - Associated Constants / Associated Types（`StateField::KEY`, `StateField::Value`）
//! - 生の JSON ストア（`StateStore`）の上に型安全な表層を載せる
//!
//! 存在しないキー（または `null`）はデフォルト値で補完します。

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::domain::errors::StoreError;
use crate::domain::plant::Plant;
use crate::domain::state::{FlourishState, StateKey};
use crate::ports::{Clock, StateStore};

/// StateField はストレージのキーと値の型を対応付ける
///
/// # 使用例
/// ```ignore
/// let score = repo.get::<fields::Score>().await?;
/// repo.set::<fields::Score>(&(score + 1)).await?;
/// ```
pub trait StateField {
    const KEY: StateKey;
    type Value: Serialize + DeserializeOwned + Send + Sync;

    fn default_value(defaults: &FlourishState) -> Self::Value;
}

/// Marker types, one per persisted key.
pub mod fields {
    use super::*;
    use chrono::NaiveDate;

    macro_rules! state_field {
        ($name:ident, $key:ident, $ty:ty, $field:ident) => {
            pub struct $name;

            impl StateField for $name {
                const KEY: StateKey = StateKey::$key;
                type Value = $ty;

                fn default_value(defaults: &FlourishState) -> $ty {
                    defaults.$field.clone()
                }
            }
        };
    }

    state_field!(Score, Score, u32, score);
    state_field!(LastUpdated, LastUpdated, i64, last_updated);
    state_field!(LastResetDate, LastResetDate, NaiveDate, last_reset_date);
    state_field!(ProductiveSites, ProductiveSites, Vec<String>, productive_sites);
    state_field!(UnproductiveSites, UnproductiveSites, Vec<String>, unproductive_sites);
    state_field!(OverlayEnabled, OverlayEnabled, bool, overlay_enabled);
    state_field!(Plants, Plants, Vec<Plant>, plants);
}

/// A batch of typed writes applied with one `set_many`.
#[derive(Debug, Default)]
pub struct StateUpdate {
    entries: Vec<(StateKey, Value)>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<F: StateField>(mut self, value: &F::Value) -> Result<Self, StoreError> {
        self.entries.push((F::KEY, serde_json::to_value(value)?));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<StateKey> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }
}

/// Typed facade over a `StateStore`.
#[derive(Clone)]
pub struct StateRepo {
    store: Arc<dyn StateStore>,
    defaults: FlourishState,
}

impl StateRepo {
    /// Defaults are fixed when the repo is created (today / now of `clock`).
    pub fn new(store: Arc<dyn StateStore>, clock: &dyn Clock) -> Self {
        let defaults = FlourishState::initial(clock.today(), clock.now().timestamp_millis());
        Self::with_defaults(store, defaults)
    }

    pub fn with_defaults(store: Arc<dyn StateStore>, defaults: FlourishState) -> Self {
        Self { store, defaults }
    }

    pub fn defaults(&self) -> &FlourishState {
        &self.defaults
    }

    /// Stored value of `F`, or its default.
    pub async fn get<F: StateField>(&self) -> Result<F::Value, StoreError> {
        match self.store.get(F::KEY).await? {
            None | Some(Value::Null) => Ok(F::default_value(&self.defaults)),
            Some(raw) => serde_json::from_value(raw).map_err(|e| StoreError::Corrupt {
                key: F::KEY,
                reason: e.to_string(),
            }),
        }
    }

    pub async fn set<F: StateField>(&self, value: &F::Value) -> Result<(), StoreError> {
        self.store.set(F::KEY, serde_json::to_value(value)?).await
    }

    pub async fn apply(&self, update: StateUpdate) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }
        self.store.set_many(update.entries).await
    }

    /// Full snapshot: defaults overlaid with every stored key.
    pub async fn get_all(&self) -> Result<FlourishState, StoreError> {
        let stored = self.store.get_many(&StateKey::ALL).await?;
        let Value::Object(mut merged) = serde_json::to_value(&self.defaults)? else {
            return Err(StoreError::Unavailable("defaults are not an object".to_string()));
        };
        for (key, value) in stored {
            if !value.is_null() {
                merged.insert(key.as_str().to_string(), value);
            }
        }
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    /// Write defaults for keys that are missing. Existing keys are untouched.
    ///
    /// Returns the keys that were written.
    pub async fn initialize_defaults(&self) -> Result<Vec<StateKey>, StoreError> {
        let stored = self.store.get_many(&StateKey::ALL).await?;
        let Value::Object(defaults) = serde_json::to_value(&self.defaults)? else {
            return Err(StoreError::Unavailable("defaults are not an object".to_string()));
        };

        let missing: Vec<(StateKey, Value)> = StateKey::ALL
            .into_iter()
            .filter(|key| !stored.contains_key(key))
            .filter_map(|key| lookup(&defaults, key).map(|v| (key, v)))
            .collect();

        let written = missing.iter().map(|(k, _)| *k).collect();
        if !missing.is_empty() {
            self.store.set_many(missing).await?;
        }
        Ok(written)
    }
}

fn lookup(map: &Map<String, Value>, key: StateKey) -> Option<Value> {
    map.get(key.as_str()).cloned()
}

#[cfg(test)]
mod tests {
    use super::fields::*;
    use super::*;
    use crate::impls::InMemoryStateStore;
    use crate::ports::FixedClock;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    fn repo_with(store: InMemoryStateStore) -> StateRepo {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap());
        StateRepo::new(Arc::new(store), &clock)
    }

    #[tokio::test]
    async fn missing_keys_fall_back_to_defaults() {
        let repo = repo_with(InMemoryStateStore::new());

        assert_eq!(repo.get::<Score>().await.unwrap(), 0);
        assert!(repo.get::<OverlayEnabled>().await.unwrap());
        assert_eq!(
            repo.get::<LastResetDate>().await.unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
        );
        assert!(repo.get::<Plants>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn null_is_treated_as_missing() {
        let repo = repo_with(InMemoryStateStore::with_values([(StateKey::Score, Value::Null)]));
        assert_eq!(repo.get::<Score>().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn corrupt_values_name_their_key() {
        let repo = repo_with(InMemoryStateStore::with_values([(StateKey::Score, json!("lots"))]));

        let err = repo.get::<Score>().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { key: StateKey::Score, .. }));
    }

    #[tokio::test]
    async fn typed_set_and_update() {
        let repo = repo_with(InMemoryStateStore::new());

        repo.set::<Score>(&17).await.unwrap();
        let update = StateUpdate::new()
            .set::<ProductiveSites>(&vec!["github.com".to_string()])
            .unwrap()
            .set::<OverlayEnabled>(&false)
            .unwrap();
        assert_eq!(update.keys(), vec![StateKey::ProductiveSites, StateKey::OverlayEnabled]);
        repo.apply(update).await.unwrap();

        let state = repo.get_all().await.unwrap();
        assert_eq!(state.score, 17);
        assert_eq!(state.productive_sites, vec!["github.com"]);
        assert!(!state.overlay_enabled);
        assert!(state.unproductive_sites.is_empty());
    }

    #[tokio::test]
    async fn initialize_defaults_only_fills_missing_keys() {
        let store = InMemoryStateStore::with_values([(StateKey::Score, json!(250))]);
        let repo = repo_with(store.clone());

        let written = repo.initialize_defaults().await.unwrap();
        assert_eq!(written.len(), StateKey::ALL.len() - 1);
        assert!(!written.contains(&StateKey::Score));
        assert_eq!(repo.get::<Score>().await.unwrap(), 250);
        assert_eq!(store.len().await, StateKey::ALL.len());

        // 2 回目は何も書かない
        assert!(repo.initialize_defaults().await.unwrap().is_empty());
    }
}
