//! # 工作流状态机
//!
//! 纯状态机，不做任何 I/O。每次“生成”开启一个新周期（`CycleId`），
//! 所有事件都携带周期号，旧周期的事件一律作为过期事件拒绝。
//!
//! ```text
//! Idle ─begin─▶ ContentChecked ─encoded─▶ Previewing ─request_save─▶ PermissionPending ─Granted─▶ Saving ─finish─▶ Idle
//!                    │                         │              │                 │  ▲
//!           missing / failed                dismiss     无需权限 → Saving   Rationale │ Grant
//!                    ▼                         ▼                                ▼  │
//!                   Idle                      Idle                      RationalePending ─Cancel─▶ Idle
//! ```
//!
//! 位图只在 `Previewing`、`PermissionPending`、`RationalePending` 三个状态中持有；
//! 进入 `Saving` 时所有权移交给写入任务，其余出口直接丢弃。

use std::fmt;

use crate::encoder::EncodedImage;
use crate::permission::{PermissionState, RationaleChoice};

/// 生成周期编号，从 1 开始递增。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(u64);

impl CycleId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 对外可见的状态（不含位图）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    ContentChecked,
    Previewing,
    PermissionPending,
    RationalePending,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error("过期事件：周期 {event} 已被周期 {current} 取代")]
    Stale { event: CycleId, current: CycleId },

    #[error("非法状态转换：{state:?} 状态下不能处理 {event}")]
    InvalidTransition {
        state: WorkflowState,
        event: &'static str,
    },
}

/// `request_save` 的下一步。
#[derive(Debug)]
pub enum SaveStep {
    /// 需要先协商运行时权限
    AwaitPermission,
    /// 无需权限，直接写入
    Persist(EncodedImage),
}

/// `on_permission` 的下一步。
#[derive(Debug)]
pub enum PermissionStep {
    Persist(EncodedImage),
    AwaitRationale,
    /// 被拒绝，位图已丢弃
    Abandoned,
}

enum Phase {
    Idle,
    ContentChecked,
    Previewing(EncodedImage),
    PermissionPending(EncodedImage),
    RationalePending(EncodedImage),
    Saving,
}

impl Phase {
    fn state(&self) -> WorkflowState {
        match self {
            Phase::Idle => WorkflowState::Idle,
            Phase::ContentChecked => WorkflowState::ContentChecked,
            Phase::Previewing(_) => WorkflowState::Previewing,
            Phase::PermissionPending(_) => WorkflowState::PermissionPending,
            Phase::RationalePending(_) => WorkflowState::RationalePending,
            Phase::Saving => WorkflowState::Saving,
        }
    }
}

pub struct WorkflowMachine {
    cycle: CycleId,
    phase: Phase,
}

impl Default for WorkflowMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowMachine {
    pub fn new() -> Self {
        Self {
            cycle: CycleId(0),
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.phase.state()
    }

    pub fn current_cycle(&self) -> CycleId {
        self.cycle
    }

    /// 当前持有的位图（预览或等待权限时）。
    pub fn image(&self) -> Option<&EncodedImage> {
        match &self.phase {
            Phase::Previewing(image) | Phase::PermissionPending(image) | Phase::RationalePending(image) => {
                Some(image)
            }
            _ => None,
        }
    }

    /// 开启新周期。任何状态下都可调用，旧周期持有的位图随之丢弃。
    pub fn begin_generation(&mut self) -> CycleId {
        if self.image().is_some() {
            log::debug!("♻️ 周期 {} 的位图被新的生成请求覆盖", self.cycle);
        }
        self.cycle = CycleId(self.cycle.0 + 1);
        self.phase = Phase::ContentChecked;
        log::debug!("周期 {}: -> ContentChecked", self.cycle);
        self.cycle
    }

    /// 内容为空，回到 Idle。
    pub fn content_missing(&mut self, cycle: CycleId) -> Result<(), MachineError> {
        self.check_cycle(cycle)?;
        let from = self.state();
        match self.phase {
            Phase::ContentChecked => {
                self.transition(from, Phase::Idle);
                Ok(())
            }
            _ => Err(self.invalid("content_missing")),
        }
    }

    pub fn encoded(&mut self, cycle: CycleId, image: EncodedImage) -> Result<(), MachineError> {
        self.check_cycle(cycle)?;
        let from = self.state();
        match self.phase {
            Phase::ContentChecked => {
                self.transition(from, Phase::Previewing(image));
                Ok(())
            }
            _ => Err(self.invalid("encoded")),
        }
    }

    pub fn encode_failed(&mut self, cycle: CycleId) -> Result<(), MachineError> {
        self.check_cycle(cycle)?;
        let from = self.state();
        match self.phase {
            Phase::ContentChecked => {
                self.transition(from, Phase::Idle);
                Ok(())
            }
            _ => Err(self.invalid("encode_failed")),
        }
    }

    /// 关闭预览，丢弃位图。
    pub fn dismiss(&mut self, cycle: CycleId) -> Result<(), MachineError> {
        self.check_cycle(cycle)?;
        let from = self.state();
        match self.phase {
            Phase::Previewing(_) => {
                self.transition(from, Phase::Idle);
                Ok(())
            }
            _ => Err(self.invalid("dismiss")),
        }
    }

    /// 用户请求保存。`requires_permission` 为 `false` 时跳过权限协商。
    pub fn request_save(&mut self, cycle: CycleId, requires_permission: bool) -> Result<SaveStep, MachineError> {
        self.check_cycle(cycle)?;
        let from = self.state();
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Previewing(image) if requires_permission => {
                self.transition(from, Phase::PermissionPending(image));
                Ok(SaveStep::AwaitPermission)
            }
            Phase::Previewing(image) => {
                self.transition(from, Phase::Saving);
                Ok(SaveStep::Persist(image))
            }
            other => {
                self.phase = other;
                Err(self.invalid("request_save"))
            }
        }
    }

    /// 权限代理给出一次结果。
    pub fn on_permission(&mut self, cycle: CycleId, state: PermissionState) -> Result<PermissionStep, MachineError> {
        self.check_cycle(cycle)?;
        let from = self.state();
        match (std::mem::replace(&mut self.phase, Phase::Idle), state) {
            (Phase::PermissionPending(image), PermissionState::Granted) => {
                self.transition(from, Phase::Saving);
                Ok(PermissionStep::Persist(image))
            }
            (Phase::PermissionPending(image), PermissionState::RationaleNeeded) => {
                self.transition(from, Phase::RationalePending(image));
                Ok(PermissionStep::AwaitRationale)
            }
            (Phase::PermissionPending(_), PermissionState::Denied) => {
                self.transition(from, Phase::Idle);
                Ok(PermissionStep::Abandoned)
            }
            (other, _) => {
                self.phase = other;
                Err(self.invalid("on_permission"))
            }
        }
    }

    /// 理由说明的选择：授予则重新进入协商，取消则丢弃位图。
    pub fn on_rationale(&mut self, cycle: CycleId, choice: RationaleChoice) -> Result<(), MachineError> {
        self.check_cycle(cycle)?;
        let from = self.state();
        match (std::mem::replace(&mut self.phase, Phase::Idle), choice) {
            (Phase::RationalePending(image), RationaleChoice::Grant) => {
                self.transition(from, Phase::PermissionPending(image));
                Ok(())
            }
            (Phase::RationalePending(_), RationaleChoice::Cancel) => {
                self.transition(from, Phase::Idle);
                Ok(())
            }
            (other, _) => {
                self.phase = other;
                Err(self.invalid("on_rationale"))
            }
        }
    }

    /// 写入结束（无论成功与否），回到 Idle。
    pub fn finish_save(&mut self, cycle: CycleId) -> Result<(), MachineError> {
        self.check_cycle(cycle)?;
        let from = self.state();
        match self.phase {
            Phase::Saving => {
                self.transition(from, Phase::Idle);
                Ok(())
            }
            _ => Err(self.invalid("finish_save")),
        }
    }

    fn check_cycle(&self, cycle: CycleId) -> Result<(), MachineError> {
        if cycle != self.cycle {
            log::debug!("忽略过期事件：周期 {}（当前 {}）", cycle, self.cycle);
            return Err(MachineError::Stale {
                event: cycle,
                current: self.cycle,
            });
        }
        Ok(())
    }

    fn transition(&mut self, from: WorkflowState, next: Phase) {
        log::debug!("周期 {}: {:?} -> {:?}", self.cycle, from, next.state());
        self.phase = next;
    }

    fn invalid(&self, event: &'static str) -> MachineError {
        MachineError::InvalidTransition {
            state: self.phase.state(),
            event,
        }
    }
}
