//! Ports - 抽象化レイヤー
//!
//! 外部の協力者（時刻、ID、キュー、画像変換、画像取得）へのインターフェース。
//! 実装は `impls` に置き、テストでは差し替える。

pub mod clock;
pub mod enhancer;
pub mod fetcher;
pub mod id_generator;
pub mod work_queue;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::enhancer::{EnhanceError, Enhancer};
pub use self::fetcher::{FetchError, ImageFetcher};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::work_queue::{QueueError, QueuePosition, QueuedTask, WorkQueue};
