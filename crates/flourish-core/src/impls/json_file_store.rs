//! JsonFileStore - 1 つの JSON ファイルに状態を保存するストア
//!
//! # 実装詳細
//! - 初回アクセス時にファイルを読み込み、メモリ上にキャッシュする
//! - 書き込みは一時ファイルに書いてから rename
//! - ファイルが存在しなければ空のストアとして扱う
//! - 知らないキーは読み捨てずにそのまま書き戻す

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::domain::errors::StoreError;
use crate::domain::state::StateKey;
use crate::ports::StateStore;

pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<Option<Map<String, Value>>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::Unavailable(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    async fn persist(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, key: StateKey) -> Result<Option<Value>, StoreError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        Ok(cache.as_ref().and_then(|m| m.get(key.as_str()).cloned()))
    }

    async fn get_many(&self, keys: &[StateKey]) -> Result<HashMap<StateKey, Value>, StoreError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        let Some(map) = cache.as_ref() else {
            return Ok(HashMap::new());
        };
        Ok(keys
            .iter()
            .filter_map(|k| map.get(k.as_str()).map(|v| (*k, v.clone())))
            .collect())
    }

    async fn set_many(&self, entries: Vec<(StateKey, Value)>) -> Result<(), StoreError> {
        let mut cache = self.cache.lock().await;
        let mut map = match cache.as_ref() {
            Some(map) => map.clone(),
            None => self.load().await?,
        };
        for (key, value) in entries {
            map.insert(key.as_str().to_string(), value);
        }
        // ディスクに書けた値だけをキャッシュに載せる
        self.persist(&map).await?;
        *cache = Some(map);
        Ok(())
    }
}
