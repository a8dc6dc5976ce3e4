//! 平台能力探测模块
//!
//! # 设计思路
//!
//! 启动时探测一次宿主平台能力，得到两个结论：
//! - 使用哪种存储策略（作用域存储 / 直接文件）
//! - 保存前是否需要运行时写入权限
//!
//! 之后只传递探测结果，不在业务代码中散落版本判断。
//!
//! # 实现思路
//!
//! | 平台级别 | 存储策略 | 运行时权限 |
//! |----------|----------|------------|
//! | 未知 / ≥ 29 | 作用域存储 | 不需要 |
//! | 23 ~ 28 | 直接文件 | 需要 |
//! | < 23 | 直接文件 | 不需要（安装时授予） |

use std::sync::Arc;

use crate::config::{AppConfig, StorageStrategyPreference};
use crate::error::AppError;
use crate::storage::{DirectFileStore, ImageStore, ScopedStorageStore, SqliteMediaRegistry, StorageLayout};

const SCOPED_STORAGE_LEVEL: u32 = 29;
const RUNTIME_PERMISSION_LEVEL: u32 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStrategy {
    Scoped,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub storage: StorageStrategy,
    pub requires_runtime_permission: bool,
}

impl PlatformCapabilities {
    pub fn probe(sdk_level: Option<u32>) -> Self {
        match sdk_level {
            None => Self {
                storage: StorageStrategy::Scoped,
                requires_runtime_permission: false,
            },
            Some(level) if level >= SCOPED_STORAGE_LEVEL => Self {
                storage: StorageStrategy::Scoped,
                requires_runtime_permission: false,
            },
            Some(level) => Self {
                storage: StorageStrategy::Direct,
                requires_runtime_permission: level >= RUNTIME_PERMISSION_LEVEL,
            },
        }
    }

    /// 按配置探测，并应用存储策略偏好。
    pub fn from_config(config: &AppConfig) -> Self {
        let mut capabilities = Self::probe(config.platform.sdk_level);
        match config.storage.strategy {
            StorageStrategyPreference::Auto => {}
            StorageStrategyPreference::Scoped => capabilities.storage = StorageStrategy::Scoped,
            StorageStrategyPreference::Direct => capabilities.storage = StorageStrategy::Direct,
        }
        log::info!(
            "平台能力: 级别={:?} 存储策略={:?} 运行时权限={}",
            config.platform.sdk_level,
            capabilities.storage,
            capabilities.requires_runtime_permission
        );
        capabilities
    }
}

/// 按探测结果创建唯一的存储策略实例。
pub fn build_image_store(
    config: &AppConfig,
    capabilities: &PlatformCapabilities,
) -> Result<Arc<dyn ImageStore>, AppError> {
    let layout = StorageLayout::from_config(&config.storage)?;
    let store: Arc<dyn ImageStore> = match capabilities.storage {
        StorageStrategy::Scoped => {
            let registry = SqliteMediaRegistry::open(
                &layout.registry_path(&config.storage.registry_file),
                &layout.shared_root,
            )?;
            Arc::new(ScopedStorageStore::new(Arc::new(registry)))
        }
        StorageStrategy::Direct => Arc::new(DirectFileStore::new(layout.folder_path())),
    };
    log::info!("存储目录: {}（策略 {}）", layout.folder_path().display(), store.name());
    Ok(store)
}
