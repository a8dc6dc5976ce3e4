//! # 二维码管理器：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 宿主 UI（预览 / 权限 / 提示）              │
//! │                                                          │
//! │  PreviewPresenter ── PermissionBroker ── UserNotifier    │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ async trait 端口
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                            │
//! │                                                          │
//! │  ┌─ workflow ─── WorkflowMachine + GenerationWorkflow    │
//! │  │                                                       │
//! │  ├─ content ──── 文本 / Wi-Fi 两种来源 + 切换            │
//! │  ├─ encoder ──── 内容 → 800×800 位图 (qrcode + image)    │
//! │  ├─ permission ─ 写存储权限协商（含理由说明）            │
//! │  ├─ storage ──── 作用域存储 / 直接文件 两种写入策略       │
//! │  │   └─ registry   媒体登记表 (rusqlite)                 │
//! │  ├─ platform ─── 启动时探测一次平台能力                  │
//! │  ├─ config ───── JSON 配置                               │
//! │  └─ error ────── AppError (统一错误类型)                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，可序列化为字符串 |
//! | [`config`] | 配置文件读写，缺失或损坏时回退默认值 |
//! | [`content`] | 内容来源 trait、文本与 Wi-Fi 来源、来源切换 |
//! | [`encoder`] | 二维码编码、固定尺寸位图、PNG 预览数据 |
//! | [`permission`] | 权限代理端口与协商流程 |
//! | [`platform`] | 平台能力探测与存储策略选择 |
//! | [`storage`] | JPEG 写入、两种存储策略、媒体登记表、目录统计 |
//! | [`workflow`] | 生成 → 预览 → 权限 → 保存 的状态机与编排 |

pub mod config;
pub mod content;
pub mod encoder;
pub mod error;
pub mod permission;
pub mod platform;
pub mod storage;
pub mod workflow;
