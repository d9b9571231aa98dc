//! Enhancer port - 画像変換（復元・アップスケール）のブラックボックス
//!
//! 生の画像バイト列を受け取り、変換後のバイト列か失敗を返す。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("could not decode input image: {0}")]
    Decode(String),

    #[error("could not encode output image: {0}")]
    Encode(String),

    #[error("enhancement failed: {0}")]
    Failed(String),
}

/// Enhancer は CPU/GPU を占有する同期処理
///
/// # 設計原則
/// - ワーカーは `spawn_blocking` から呼ぶ（async ランタイムを塞がない）
/// - 入力ごとに独立。共有可変状態が必要なら実装側で直列化する
/// - 呼び出し中のキャンセルはできない。キャンセルは呼び出しの前後で確認される
pub trait Enhancer: Send + Sync {
    /// Short name reported by the health endpoint.
    fn name(&self) -> &str;

    fn enhance(&self, image: &[u8]) -> Result<Vec<u8>, EnhanceError>;
}
