//! # 编码错误
//!
//! 内容超出二维码容量或包含所选编码模式不支持的字符时返回，
//! 由调用方上报给用户，而不是展示空白或损坏的图片。

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("内容超出二维码容量：{bytes} 字节")]
    CapacityExceeded { bytes: usize },

    #[error("内容包含不支持的字符：{0}")]
    Unsupported(String),

    #[error("二维码渲染失败：{0}")]
    Render(String),
}
