//! flourish-core
//!
//! Core building blocks for the Flourish productivity scorer.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（state, plant, classifier, reconciler, message, events, errors）
//! - **ports**: 抽象化レイヤー（StateStore, TabSource, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryStateStore, JsonFileStore, ManualTabSource）
//! - **bus**: 接続・リース・オブザーバーの再接続ループ
//! - **app**: アプリケーションロジック（StateRepo, ScoringEngine, Coordinator, Host, observers）
//! - **config**: TOML から読む設定値

pub mod app;
pub mod bus;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use config::FlourishConfig;
pub use domain::errors::{FlourishError, Result};
