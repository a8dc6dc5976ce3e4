//! # 生成工作流
//!
//! 一次 `generate()` 走完一个完整周期：取内容 → 编码 → 预览 →（协商权限）→ 写入。
//! 每一步都先推动 `WorkflowMachine`，再执行副作用。
//!
//! - 内容为空：直接结束，不编码也不弹预览
//! - 编码失败：提示用户并返回 `AppError::Encoding`
//! - 写入失败：记录日志、提示用户，周期以 `SaveFailed` 结束，不向上传播
//!
//! 写入是阻塞操作，放到 `spawn_blocking` 中执行，不占用交互线程。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::content::{ContentSwitcher, is_usable_content};
use crate::encoder::{EncodedImage, QrEncoder};
use crate::error::AppError;
use crate::permission::{
    GateDecision, GateEvent, PermissionBroker, RationalePrompter, StoragePermissionGate,
};
use crate::platform::PlatformCapabilities;
use crate::storage::{ImageStore, PersistError, SavedImage, SavedImageDescriptor};

use super::machine::{CycleId, MachineError, PermissionStep, SaveStep, WorkflowMachine, WorkflowState};
use super::preview::{Notice, PreviewAction, PreviewPresenter, UserNotifier};

/// 宿主提供的交互端口。
pub struct WorkflowPorts {
    pub presenter: Arc<dyn PreviewPresenter>,
    pub notifier: Arc<dyn UserNotifier>,
    pub broker: Arc<dyn PermissionBroker>,
    pub prompter: Arc<dyn RationalePrompter>,
}

/// 一个周期的结局。
#[derive(Debug)]
pub enum CycleOutcome {
    /// 内容为空，未弹出预览
    NoContent,
    Dismissed,
    Saved(SavedImage),
    PermissionDenied,
    RationaleCancelled,
    SaveFailed(String),
}

enum Negotiated {
    Persist(EncodedImage),
    Stop(CycleOutcome),
}

pub struct GenerationWorkflow {
    machine: WorkflowMachine,
    switcher: ContentSwitcher,
    encoder: QrEncoder,
    store: Arc<dyn ImageStore>,
    gate: StoragePermissionGate,
    presenter: Arc<dyn PreviewPresenter>,
    notifier: Arc<dyn UserNotifier>,
    requires_permission: bool,
    file_prefix: String,
    relative_path: String,
}

impl GenerationWorkflow {
    pub fn new(
        config: &AppConfig,
        capabilities: &PlatformCapabilities,
        store: Arc<dyn ImageStore>,
        switcher: ContentSwitcher,
        ports: WorkflowPorts,
    ) -> Self {
        Self {
            machine: WorkflowMachine::new(),
            switcher,
            encoder: QrEncoder::new(config.encoder.error_correction),
            store,
            gate: StoragePermissionGate::new(ports.broker, ports.prompter),
            presenter: ports.presenter,
            notifier: ports.notifier,
            requires_permission: capabilities.requires_runtime_permission,
            file_prefix: config.storage.file_prefix.clone(),
            relative_path: config.storage.relative_path(),
        }
    }

    pub fn switcher(&self) -> &ContentSwitcher {
        &self.switcher
    }

    pub fn switcher_mut(&mut self) -> &mut ContentSwitcher {
        &mut self.switcher
    }

    pub fn state(&self) -> WorkflowState {
        self.machine.state()
    }

    /// 最近一次 `generate()` 开启的周期。
    pub fn current_cycle(&self) -> CycleId {
        self.machine.current_cycle()
    }

    /// 运行一个完整的生成周期。
    pub async fn generate(&mut self) -> Result<CycleOutcome, AppError> {
        let cycle = self.machine.begin_generation();
        log::info!("🔳 开始生成周期 {}（来源 {:?}）", cycle, self.switcher.active_mode());

        let content = self.switcher.active().content();
        let Some(content) = content.filter(|c| is_usable_content(Some(c.as_str()))) else {
            log::debug!("周期 {} 内容为空，忽略", cycle);
            self.machine.content_missing(cycle)?;
            return Ok(CycleOutcome::NoContent);
        };

        match self.encoder.encode(&content) {
            Ok(image) => self.machine.encoded(cycle, image)?,
            Err(err) => {
                self.machine.encode_failed(cycle)?;
                log::warn!("⚠️ 周期 {} 编码失败: {}", cycle, err);
                self.notifier.notify(Notice::EncodingFailed(err.to_string()));
                return Err(err.into());
            }
        }

        let action = match self.machine.image() {
            Some(image) => self.presenter.show(image).await,
            None => {
                return Err(MachineError::InvalidTransition {
                    state: self.machine.state(),
                    event: "show",
                }
                .into());
            }
        };

        if action == PreviewAction::Dismiss {
            self.machine.dismiss(cycle)?;
            log::info!("周期 {} 预览已关闭", cycle);
            return Ok(CycleOutcome::Dismissed);
        }

        let image = match self.machine.request_save(cycle, self.requires_permission)? {
            SaveStep::Persist(image) => image,
            SaveStep::AwaitPermission => match self.negotiate(cycle).await? {
                Negotiated::Persist(image) => image,
                Negotiated::Stop(outcome) => return Ok(outcome),
            },
        };

        self.persist(cycle, image).await
    }

    async fn negotiate(&mut self, cycle: CycleId) -> Result<Negotiated, AppError> {
        let machine = &mut self.machine;
        let mut granted: Option<EncodedImage> = None;
        let mut failure: Option<MachineError> = None;

        let outcome = self
            .gate
            .negotiate_observed(|event| {
                if failure.is_some() {
                    return;
                }
                let step = match event {
                    GateEvent::Response(state) => machine.on_permission(cycle, state).map(|step| {
                        if let PermissionStep::Persist(image) = step {
                            granted = Some(image);
                        }
                    }),
                    GateEvent::Rationale(choice) => machine.on_rationale(cycle, choice),
                };
                if let Err(err) = step {
                    failure = Some(err);
                }
            })
            .await;

        if let Some(err) = failure {
            return Err(err.into());
        }
        log::info!("🔐 周期 {} 权限协商结果: {:?}", cycle, outcome.decision);

        match outcome.decision {
            GateDecision::Granted => match granted {
                Some(image) => Ok(Negotiated::Persist(image)),
                None => Err(MachineError::InvalidTransition {
                    state: self.machine.state(),
                    event: "granted",
                }
                .into()),
            },
            GateDecision::Denied => Ok(Negotiated::Stop(CycleOutcome::PermissionDenied)),
            GateDecision::Cancelled => Ok(Negotiated::Stop(CycleOutcome::RationaleCancelled)),
        }
    }

    async fn persist(&mut self, cycle: CycleId, image: EncodedImage) -> Result<CycleOutcome, AppError> {
        let store = Arc::clone(&self.store);
        let descriptor = SavedImageDescriptor::now(&self.file_prefix, self.relative_path.clone());
        log::info!(
            "💾 周期 {} 写入 {}（策略 {}）",
            cycle,
            descriptor.display_name(),
            store.name()
        );

        let result = tokio::task::spawn_blocking(move || store.persist(&image, &descriptor))
            .await
            .unwrap_or_else(|e| Err(PersistError::Interrupted(e.to_string())));
        self.machine.finish_save(cycle)?;

        match result {
            Ok(saved) => {
                log::info!(
                    "✅ 周期 {} 已保存 {}（{} 字节）",
                    cycle,
                    saved.location.path().display(),
                    saved.bytes_written
                );
                self.notifier
                    .notify(Notice::Saved(saved.location.path().to_path_buf()));
                Ok(CycleOutcome::Saved(saved))
            }
            Err(err) => {
                log::error!("❌ 周期 {} 保存失败: {}", cycle, err);
                self.notifier.notify(Notice::SaveFailed(err.to_string()));
                Ok(CycleOutcome::SaveFailed(err.to_string()))
            }
        }
    }
}
