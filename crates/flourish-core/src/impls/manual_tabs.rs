//! ManualTabSource - 手動で切り替えるタブ
//!
//! テストと CLI のシミュレーションで使います。

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::errors::TabError;
use crate::ports::{ActiveTab, TabSource};

#[derive(Debug, Clone, Default)]
enum TabState {
    #[default]
    NoTab,
    Tab(ActiveTab),
    Failing(String),
}

/// A tab source whose answer is set by hand. Clones share the same tab.
#[derive(Debug, Clone, Default)]
pub struct ManualTabSource {
    state: Arc<Mutex<TabState>>,
}

impl ManualTabSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus a tab showing `url`.
    pub fn visit(&self, url: impl Into<String>) {
        self.replace(TabState::Tab(ActiveTab { url: Some(url.into()) }));
    }

    /// Focus a tab without a URL (e.g. still loading).
    pub fn blank(&self) {
        self.replace(TabState::Tab(ActiveTab { url: None }));
    }

    /// No focused tab.
    pub fn close(&self) {
        self.replace(TabState::NoTab);
    }

    /// Make every query fail with `reason`.
    pub fn fail(&self, reason: impl Into<String>) {
        self.replace(TabState::Failing(reason.into()));
    }

    fn replace(&self, next: TabState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

#[async_trait]
impl TabSource for ManualTabSource {
    async fn active_tab(&self) -> Result<Option<ActiveTab>, TabError> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            TabState::NoTab => Ok(None),
            TabState::Tab(tab) => Ok(Some(tab.clone())),
            TabState::Failing(reason) => Err(TabError(reason.clone())),
        }
    }
}
