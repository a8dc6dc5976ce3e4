//! 预览与提示端口
//!
//! 预览对话框与用户提示由宿主 UI 实现，工作流只依赖这里的 trait。

use std::path::PathBuf;

use async_trait::async_trait;

use crate::encoder::EncodedImage;

/// 用户在预览对话框中的操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewAction {
    Dismiss,
    Save,
}

#[async_trait]
pub trait PreviewPresenter: Send + Sync {
    /// 展示位图，直到用户关闭或请求保存。
    async fn show(&self, image: &EncodedImage) -> PreviewAction;
}

/// 需要告知用户的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    EncodingFailed(String),
    SaveFailed(String),
    Saved(PathBuf),
}

pub trait UserNotifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// 只写日志的提示实现，宿主未提供提示组件时使用。
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::EncodingFailed(reason) => log::warn!("⚠️ 二维码生成失败: {}", reason),
            Notice::SaveFailed(reason) => log::error!("❌ 图片保存失败: {}", reason),
            Notice::Saved(path) => log::info!("✅ 图片已保存: {}", path.display()),
        }
    }
}
