//! retouch-core
//!
//! Core building blocks for the image retouch task service: admission,
//! queueing, a fixed worker pool, adaptive timeouts and record retention.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, task, payload, timeout, errors）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, WorkQueue, Enhancer, ImageFetcher）
//! - **store**: TaskStore（全タスクレコードの唯一の所有者）と sweep
//! - **app**: アプリケーションロジック（builder, manager, worker_loop, reaper_loop）
//! - **impls**: 実装（InMemoryWorkQueue, LanczosUpscaler, HttpFetcher）
//! - **config**: ServiceConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod store;

pub use crate::app::{AppBuilder, TaskManager};
pub use crate::config::ServiceConfig;
