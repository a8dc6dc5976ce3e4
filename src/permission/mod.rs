//! # 存储权限模块（permission）
//!
//! ## 设计思路
//!
//! 写入共享存储前需要与外部权限代理协商一次“写外部存储”权限。
//! 代理以异步方式给出三种结果之一：授予、需要说明理由、拒绝。
//! 原本基于回调的协议在这里表达为返回 `PermissionResponse` 的 future。
//!
//! - `PermissionBroker`：外部权限代理（系统权限框架的适配层）
//! - `RationalePrompter`：展示理由说明对话框，返回“授予 / 取消”
//! - `StoragePermissionGate`：串起上述两者的协商流程
//!
//! 协商状态只在一次保存尝试内有效，不跨尝试保存；没有超时，
//! 一直等待代理给出结果。

mod gate;

pub use gate::{GateDecision, GateEvent, GateOutcome, StoragePermissionGate};

use async_trait::async_trait;

/// 需要协商的权限种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    WriteExternalStorage,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WriteExternalStorage => "android.permission.WRITE_EXTERNAL_STORAGE",
        }
    }
}

/// 一次保存尝试中的权限状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Unrequested,
    Granted,
    RationaleNeeded,
    Denied,
}

/// 代理在需要说明理由时交回的令牌，用于继续或取消该次请求。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionToken(u64);

impl PermissionToken {
    pub fn new(request_id: u64) -> Self {
        Self(request_id)
    }

    pub fn request_id(self) -> u64 {
        self.0
    }
}

/// 代理返回的三种结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResponse {
    Granted,
    RationaleNeeded(PermissionToken),
    Denied,
}

impl PermissionResponse {
    pub fn state(&self) -> PermissionState {
        match self {
            Self::Granted => PermissionState::Granted,
            Self::RationaleNeeded(_) => PermissionState::RationaleNeeded,
            Self::Denied => PermissionState::Denied,
        }
    }
}

/// 理由说明对话框的两个选项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RationaleChoice {
    Grant,
    Cancel,
}

#[async_trait]
pub trait PermissionBroker: Send + Sync {
    /// 发起权限请求。
    async fn request(&self, permission: Permission) -> PermissionResponse;

    /// 用户在理由说明中选择“授予”后继续原请求。
    async fn continue_request(&self, token: PermissionToken) -> PermissionResponse;

    /// 用户在理由说明中选择“取消”后终止原请求。
    fn cancel_request(&self, token: PermissionToken);
}

#[async_trait]
pub trait RationalePrompter: Send + Sync {
    async fn explain(&self, permission: Permission) -> RationaleChoice;
}
