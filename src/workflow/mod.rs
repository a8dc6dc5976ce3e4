//! # 生成工作流模块（workflow）
//!
//! ## 设计思路
//!
//! “当前位图”与“当前阶段”不再是散落的可变字段，而是 `WorkflowMachine`
//! 内部的显式状态；所有转换都经过带周期号的转换函数。
//!
//! - `machine.rs`：纯状态机，可单独测试
//! - `preview.rs`：预览与提示端口
//! - `controller.rs`：异步编排，串起内容、编码、权限与存储
//!
//! 同一时刻只有一个周期有效，新的生成请求直接覆盖旧周期，不排队。

mod controller;
mod machine;
mod preview;

pub use controller::{CycleOutcome, GenerationWorkflow, WorkflowPorts};
pub use machine::{CycleId, MachineError, PermissionStep, SaveStep, WorkflowMachine, WorkflowState};
pub use preview::{LogNotifier, Notice, PreviewAction, PreviewPresenter, UserNotifier};
