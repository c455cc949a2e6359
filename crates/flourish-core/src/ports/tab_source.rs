//! TabSource port - アクティブなタブの問い合わせ

use async_trait::async_trait;

use crate::domain::errors::TabError;

/// The focused tab of the focused window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTab {
    pub url: Option<String>,
}

#[async_trait]
pub trait TabSource: Send + Sync {
    /// `None` when no tab is focused.
    async fn active_tab(&self) -> Result<Option<ActiveTab>, TabError>;
}
