//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryWorkQueue**: プロセス内 FIFO
//! - **LanczosUpscaler**: 既定の Enhancer（`image` クレート）
//! - **HttpFetcher**: reqwest による画像取得
//! - **probe_pixel_count**: 受付時のサイズヒント算出

pub mod http_fetcher;
pub mod image_probe;
pub mod inmem_queue;
pub mod upscaler;

pub use self::http_fetcher::HttpFetcher;
pub use self::image_probe::probe_pixel_count;
pub use self::inmem_queue::InMemoryWorkQueue;
pub use self::upscaler::LanczosUpscaler;
