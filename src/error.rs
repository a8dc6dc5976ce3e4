//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，汇总编码、持久化、配置、状态机各阶段的错误，
//! 宿主（UI 层）只需处理一种错误类型。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为各子模块错误提供 `From` 转换，调用侧直接 `?`。
//! - 实现 `Serialize` 将错误序列化为字符串，方便宿主通过 IPC 转发。
//! - `code()` 提供稳定的机器可读错误码，供宿主选择提示文案。

use serde::Serialize;

use crate::encoder::EncodeError;
use crate::storage::PersistError;
use crate::workflow::MachineError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 内容无法编码为二维码
    #[error("{0}")]
    Encoding(#[from] EncodeError),

    /// 图片写入失败（I/O 或 JPEG 压缩）
    #[error("{0}")]
    Persist(#[from] PersistError),

    /// 配置读写失败
    #[error("配置错误: {0}")]
    Config(String),

    /// 状态机收到非法或过期的事件
    #[error("{0}")]
    Workflow(#[from] MachineError),
}

impl AppError {
    /// 稳定错误码，宿主据此选择本地化提示。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Encoding(EncodeError::CapacityExceeded { .. }) => "encode_capacity",
            Self::Encoding(_) => "encode_failed",
            Self::Persist(PersistError::Compression(_)) => "persist_compression",
            Self::Persist(_) => "persist_failed",
            Self::Config(_) => "config",
            Self::Workflow(_) => "workflow",
        }
    }
}

/// 宿主 IPC 要求返回值实现 `Serialize`。
/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
