//! StateStore port - 永続化されたキー・バリューストア
//!
//! StateStore は生の JSON 値をキー単位で保存します。
//! 型付きのアクセス（デフォルト値の補完など）は `app::StateRepo` が担当します。
//!
//! # 実装
//! - `InMemoryStateStore`: テスト・開発用
//! - `JsonFileStore`: 1 つの JSON ファイルに保存（再起動後も残る）

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::errors::StoreError;
use crate::domain::state::StateKey;

/// StateStore は状態ブロブの唯一の保存先
///
/// # 設計原則
/// - 書き込み手は自分自身（コーディネーターと、その内側のオブザーバー）だけ
/// - 存在しないキーは `None`（デフォルト値はここでは決めない）
/// - `set_many` は複数キーをまとめて書く（1 回の永続化）
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: StateKey) -> Result<Option<Value>, StoreError>;

    /// Stored values for `keys`; missing keys are absent from the map.
    async fn get_many(&self, keys: &[StateKey]) -> Result<HashMap<StateKey, Value>, StoreError>;

    async fn set_many(&self, entries: Vec<(StateKey, Value)>) -> Result<(), StoreError>;

    async fn set(&self, key: StateKey, value: Value) -> Result<(), StoreError> {
        self.set_many(vec![(key, value)]).await
    }
}
