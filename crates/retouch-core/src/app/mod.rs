//! App - アプリケーション層
//!
//! このモジュールは、ports と store を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **TaskManager**: ゲートウェイ向けの操作（submit / status / cancel / health）
//! - **WorkerPool**: タスク実行ループ（pop→process→complete/fail）
//! - **ReaperLoop**: タイムアウトの強制とレコードの回収

pub mod builder;
pub mod manager;
pub mod reaper_loop;
pub mod status;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError, RunningApp};
pub use self::manager::TaskManager;
pub use self::reaper_loop::{ReaperHandle, ReaperLoop};
pub use self::status::{Admission, HealthSnapshot, StatusReport};
pub use self::worker_loop::{WorkerDeps, WorkerPool};
