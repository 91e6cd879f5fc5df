//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **CartService**: item を受け付け、AVAILABILITY_CHECK job を投入
//! - **ReservationWorker**: job 実行ループ（dequeue→check budget→dispatch→settle）
//! - **WorkerGroup**: 複数の worker loop の起動と shutdown
//! - **AppConfig**: 環境変数からの設定

pub mod cart;
pub mod config;
pub mod worker;
pub mod worker_group;

// 主要な型を再エクスポート
pub use self::cart::{CartError, CartService};
pub use self::config::{AppConfig, ConfigError, Environment, WorkerConfig};
pub use self::worker::{CycleOutcome, ReservationWorker};
pub use self::worker_group::WorkerGroup;
