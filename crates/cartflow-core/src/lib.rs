//! cartflow-core
//!
//! Core building blocks for the asynchronous cart reservation pipeline.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, item, job, state machine, errors）
//! - **ports**: 抽象化レイヤー（JobQueue, ItemStore, ReservationProvider, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（CartService, ReservationWorker, WorkerGroup, config）
//! - **impls**: 実装（InMemoryJobQueue, InMemoryItemStore, provider など開発用）
//! - **observability**: queue counts と tracing の初期化

pub mod domain;
pub mod ports;
pub mod app;
pub mod impls;
pub mod observability;
