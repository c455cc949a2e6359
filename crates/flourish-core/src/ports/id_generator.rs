//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（単調増加）

use std::sync::{Mutex, PoisonError};
use ulid::Ulid;

use crate::domain::ids::PlantId;
use crate::ports::Clock;

/// IdGenerator はソート可能な Plant ID を生成
///
/// # 保証
/// - 生成された ID は、それまでに生成・観測された全 ID より大きい
/// - 同一ミリ秒内に複数生成しても順序が付く
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    /// Plant ID を生成
    fn generate_plant_id(&self) -> PlantId;

    /// 既存の ID を観測し、以降の ID がそれより後ろにソートされるようにする
    fn observe(&self, id: PlantId);
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// 時計が戻った場合や同一ミリ秒の場合は、直前の ULID をインクリメントします。
pub struct UlidGenerator<C> {
    clock: C,
    last: Mutex<Option<Ulid>>,
}

impl<C: Clock> UlidGenerator<C> {
    /// 新しい UlidGenerator を作成
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last: Mutex::new(None),
        }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_plant_id(&self) -> PlantId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let candidate = Ulid::from_parts(timestamp_ms, rand::random());

        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let next = match *last {
            Some(prev) if candidate <= prev => prev
                .increment()
                .unwrap_or_else(|| Ulid::from_parts(prev.timestamp_ms() + 1, 0)),
            _ => candidate,
        };
        *last = Some(next);
        PlantId::from_ulid(next)
    }

    fn observe(&self, id: PlantId) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.is_none_or(|prev| id.as_ulid() > prev) {
            *last = Some(id.as_ulid());
        }
    }
}
