//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの PlantId
//! Plant の識別子には ULID (Universally Unique Lexicographically Sortable Identifier) を使います。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: timestamp が先頭にあるため、生成順序でソートできる
//! - **同一ミリ秒でも順序付け可能**: `UlidGenerator` が単調増加を保証する
//! - **文字列表現**: 26 文字の Crockford Base32（永続化スキーマの `id: string`）
//!
//! 「最も新しい Plant」は配列の位置ではなく、この ID の大小で決まります。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Identifier of a Plant.
///
/// Serialized as the bare ULID string; `Display` adds a `plant-` prefix for logs.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlantId(Ulid);

impl PlantId {
    /// ULID から PlantId を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// 生成時刻（unix ms）
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl From<Ulid> for PlantId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl FromStr for PlantId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plant-{}", self.0)
    }
}
