//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **StateRepo**: 型付きの状態アクセス（デフォルト値の補完）
//! - **ScoringEngine**: 1 tick ごとのスコア更新と日次リセット
//! - **Coordinator**: tick とコマンドを直列化するアクター
//! - **Host / HostBuilder**: コーディネーターのライフサイクルとワイヤリング
//! - **GardenObserver**: スコアに合わせて Plant を増減
//! - **OverlayModel**: スコア表示の headless 版

pub mod builder;
pub mod coordinator;
pub mod garden;
pub mod host;
pub mod overlay;
pub mod scoring;
pub mod state_repo;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, HostBuilder};
pub use self::coordinator::{Coordinator, CoordinatorHandle, RunningCoordinator};
pub use self::garden::GardenObserver;
pub use self::host::Host;
pub use self::overlay::{OverlayModel, OverlaySnapshot, Trend};
pub use self::scoring::{ScoringEngine, TickOutcome, TickReport};
pub use self::state_repo::{StateField, StateRepo, StateUpdate, fields};
