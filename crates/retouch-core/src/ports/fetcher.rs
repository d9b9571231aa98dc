//! ImageFetcher port - リモート画像の取得

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("URL does not point to an image (content-type: {0})")]
    NotAnImage(String),

    #[error("image is larger than {limit} bytes")]
    TooLarge { limit: u64 },
}

/// ImageFetcher は URL から画像バイト列を取得
///
/// 実装は必ず明示的な timeout とサイズ上限を持つこと（ワーカー枠を無期限に占有しない）。
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
