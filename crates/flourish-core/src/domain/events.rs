//! Events - コーディネーターから全オブザーバーへのブロードキャスト
//!
//! JSON 形式: `{"type": "SCORE_UPDATE", "payload": {"score": 12}}`

use serde::{Deserialize, Serialize};

/// Fire-and-forget notification sent to every open observer connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Broadcast {
    ScoreUpdate { score: u32 },
    OverlayVisibilityChanged { enabled: bool },
}
