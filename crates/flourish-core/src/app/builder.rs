//! HostBuilder - Host の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use super::host::{Host, HostDeps};
use crate::config::FlourishConfig;
use crate::domain::errors::ConfigError;
use crate::ports::{Clock, StateStore, SystemClock, TabSource};

/// HostBuilder は Host を構築
///
/// # 使用例
/// ```ignore
/// let host = HostBuilder::new()
///     .store(JsonFileStore::new("flourish-state.json"))
///     .tabs(ManualTabSource::new())
///     .config(config)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - store と tabs は必須。足りなければ `BuildError::MissingComponent`
/// - config は build() 時に検証する
pub struct HostBuilder {
    store: Option<Arc<dyn StateStore>>,
    tabs: Option<Arc<dyn TabSource>>,
    clock: Arc<dyn Clock>,
    config: FlourishConfig,
}

/// BuildError は Host 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing component: {0}. Call HostBuilder::{0}() before build().")]
    MissingComponent(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl HostBuilder {
    /// 新しい HostBuilder を作成（時計は SystemClock、設定はデフォルト）
    pub fn new() -> Self {
        Self {
            store: None,
            tabs: None,
            clock: Arc::new(SystemClock),
            config: FlourishConfig::default(),
        }
    }

    pub fn store(mut self, store: impl StateStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn shared_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn tabs(mut self, tabs: impl TabSource + 'static) -> Self {
        self.tabs = Some(Arc::new(tabs));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: FlourishConfig) -> Self {
        self.config = config;
        self
    }

    /// HostBuilder を構築して Host を生成
    ///
    /// # 検証
    /// - store / tabs が設定されているか
    /// - config が妥当か（`FlourishConfig::validate`）
    pub fn build(self) -> Result<Host, BuildError> {
        let store = self.store.ok_or(BuildError::MissingComponent("store"))?;
        let tabs = self.tabs.ok_or(BuildError::MissingComponent("tabs"))?;
        self.config.validate()?;
        Ok(Host::new(HostDeps {
            store,
            tabs,
            clock: self.clock,
            config: self.config,
        }))
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryStateStore, ManualTabSource};

    #[test]
    fn test_build_success() {
        let host = HostBuilder::new()
            .store(InMemoryStateStore::new())
            .tabs(ManualTabSource::new())
            .build();
        assert!(host.is_ok());
    }

    #[test]
    fn test_build_missing_store() {
        let host = HostBuilder::new().tabs(ManualTabSource::new()).build();
        assert!(matches!(host, Err(BuildError::MissingComponent("store"))));
    }

    #[test]
    fn test_build_missing_tabs() {
        let host = HostBuilder::new().store(InMemoryStateStore::new()).build();
        assert!(matches!(host, Err(BuildError::MissingComponent("tabs"))));
    }

    #[test]
    fn test_build_invalid_config() {
        let config = FlourishConfig {
            points_per_unit: 0,
            ..FlourishConfig::default()
        };
        let host = HostBuilder::new()
            .store(InMemoryStateStore::new())
            .tabs(ManualTabSource::new())
            .config(config)
            .build();
        assert!(matches!(host, Err(BuildError::Config(ConfigError::Invalid(_)))));
    }
}
