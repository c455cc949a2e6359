//! InMemoryStateStore - 開発・テスト用のストア
//!
//! # 実装詳細
//! - HashMap<StateKey, Value> を tokio の Mutex で保護
//! - ロックを await の跨ぎで保持しない（各メソッド内で完結）

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::StoreError;
use crate::domain::state::StateKey;
use crate::ports::StateStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    values: Arc<Mutex<HashMap<StateKey, Value>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store.
    pub fn with_values(values: impl IntoIterator<Item = (StateKey, Value)>) -> Self {
        Self {
            values: Arc::new(Mutex::new(values.into_iter().collect())),
        }
    }

    /// Number of keys actually stored.
    pub async fn len(&self) -> usize {
        self.values.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.lock().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: StateKey) -> Result<Option<Value>, StoreError> {
        Ok(self.values.lock().await.get(&key).cloned())
    }

    async fn get_many(&self, keys: &[StateKey]) -> Result<HashMap<StateKey, Value>, StoreError> {
        let values = self.values.lock().await;
        Ok(keys
            .iter()
            .filter_map(|k| values.get(k).map(|v| (*k, v.clone())))
            .collect())
    }

    async fn set_many(&self, entries: Vec<(StateKey, Value)>) -> Result<(), StoreError> {
        let mut values = self.values.lock().await;
        values.extend(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_roundtrip() {
        let store = InMemoryStateStore::new();
        assert_eq!(store.get(StateKey::Score).await.unwrap(), None);

        store.set(StateKey::Score, json!(12)).await.unwrap();
        assert_eq!(store.get(StateKey::Score).await.unwrap(), Some(json!(12)));
    }

    #[tokio::test]
    async fn get_many_skips_missing_keys() {
        let store = InMemoryStateStore::with_values([(StateKey::OverlayEnabled, json!(false))]);

        let found = store
            .get_many(&[StateKey::OverlayEnabled, StateKey::Plants])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&StateKey::OverlayEnabled], json!(false));
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let store = InMemoryStateStore::new();
        let other = store.clone();
        other
            .set_many(vec![(StateKey::Score, json!(1)), (StateKey::Plants, json!([]))])
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);
    }
}
