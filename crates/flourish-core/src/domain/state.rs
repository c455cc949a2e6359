//! State - 永続化される状態のスナップショット
//!
//! # 設計原則
//! - 状態は 1 つの所有オブジェクト（`FlourishState`）として表現する
//! - グローバル変数は使わない。読み書きはすべて `StateStore` 経由
//! - キー名とシリアライズ形式はブラウザストレージのスキーマと同じ（camelCase）

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::plant::Plant;

/// Keys of the persisted state blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateKey {
    Score,
    LastUpdated,
    LastResetDate,
    ProductiveSites,
    UnproductiveSites,
    OverlayEnabled,
    Plants,
}

impl StateKey {
    pub const ALL: [StateKey; 7] = [
        StateKey::Score,
        StateKey::LastUpdated,
        StateKey::LastResetDate,
        StateKey::ProductiveSites,
        StateKey::UnproductiveSites,
        StateKey::OverlayEnabled,
        StateKey::Plants,
    ];

    /// Storage key name (same as the JSON field of `FlourishState`).
    pub fn as_str(self) -> &'static str {
        match self {
            StateKey::Score => "score",
            StateKey::LastUpdated => "lastUpdated",
            StateKey::LastResetDate => "lastResetDate",
            StateKey::ProductiveSites => "productiveSites",
            StateKey::UnproductiveSites => "unproductiveSites",
            StateKey::OverlayEnabled => "overlayEnabled",
            StateKey::Plants => "plants",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full snapshot of the persisted state (`GET_STATE` response).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlourishState {
    pub score: u32,

    /// Unix time in milliseconds of the last score mutation.
    pub last_updated: i64,

    /// Serialized as `YYYY-MM-DD`.
    pub last_reset_date: NaiveDate,

    pub productive_sites: Vec<String>,
    pub unproductive_sites: Vec<String>,
    pub overlay_enabled: bool,
    pub plants: Vec<Plant>,
}

impl FlourishState {
    /// Defaults for a fresh install.
    pub fn initial(today: NaiveDate, now_ms: i64) -> Self {
        Self {
            score: 0,
            last_updated: now_ms,
            last_reset_date: today,
            productive_sites: Vec::new(),
            unproductive_sites: Vec::new(),
            overlay_enabled: true,
            plants: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_match_state_fields() {
        let state = FlourishState::initial(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 0);
        let json = serde_json::to_value(&state).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), StateKey::ALL.len());
        for key in StateKey::ALL {
            assert!(obj.contains_key(key.as_str()), "missing {key}");
            assert_eq!(StateKey::from_name(key.as_str()), Some(key));
        }
    }

    #[test]
    fn reset_date_is_iso_day() {
        let state = FlourishState::initial(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(), 0);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["lastResetDate"], "2024-12-31");
        assert_eq!(json["overlayEnabled"], true);
    }

    #[test]
    fn key_serde_matches_as_str() {
        for key in StateKey::ALL {
            assert_eq!(serde_json::to_value(key).unwrap(), key.as_str());
        }
    }
}
