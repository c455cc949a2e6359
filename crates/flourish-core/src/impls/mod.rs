//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStateStore**: テスト・開発用のストア
//! - **JsonFileStore**: JSON ファイルに永続化するストア（CLI 用）
//! - **ManualTabSource**: 手動で切り替えるタブ（テスト・シミュレーション用）

pub mod inmem_store;
pub mod json_file_store;
pub mod manual_tabs;

// 主要な型を再エクスポート
pub use self::inmem_store::InMemoryStateStore;
pub use self::json_file_store::JsonFileStore;
pub use self::manual_tabs::ManualTabSource;
