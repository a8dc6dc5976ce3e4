//! 应用配置模块
//!
//! # 设计思路
//!
//! 可调项（共享目录、子目录名、文件名前缀、存储策略偏好、纠错等级、宿主平台级别）
//! 集中到 `AppConfig`，以 JSON 文件持久化。图片尺寸与 JPEG 质量是固定常量，不在此列。
//!
//! # 实现思路
//!
//! - 所有字段带 `#[serde(default)]`，旧配置文件缺字段时自动补默认值。
//! - 配置文件缺失或损坏时回退默认配置并记录日志，不阻断启动。
//! - 写入使用 `to_string_pretty`，便于用户手工修改。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoder::ErrorCorrection;
use crate::error::AppError;

/// 存储策略偏好。`Auto` 表示按平台能力探测。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageStrategyPreference {
    #[default]
    Auto,
    Scoped,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 共享媒体区根目录；为空时使用系统图片目录
    pub shared_root: Option<String>,
    pub media_dir: String,
    pub folder_name: String,
    pub file_prefix: String,
    pub strategy: StorageStrategyPreference,
    /// 应用私有数据目录；为空时使用系统数据目录下的 `qrcode-manager`
    pub data_dir: Option<String>,
    /// 作用域存储登记表文件名（位于私有数据目录下）
    pub registry_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            shared_root: None,
            media_dir: "DCIM".to_string(),
            folder_name: "QRCodeManager".to_string(),
            file_prefix: "QR_".to_string(),
            strategy: StorageStrategyPreference::Auto,
            data_dir: None,
            registry_file: "media_registry.db".to_string(),
        }
    }
}

impl StorageConfig {
    /// 共享目录下的相对路径，如 `DCIM/QRCodeManager`。
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.media_dir, self.folder_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub error_correction: ErrorCorrection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// 宿主平台 API 级别；`None` 视为新平台
    pub sdk_level: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub encoder: EncoderConfig,
    pub platform: PlatformConfig,
}

/// 读取配置；文件缺失或无法解析时返回默认配置。
pub fn load_config_from_path(config_path: &Path) -> AppConfig {
    if !config_path.exists() {
        log::info!("配置文件不存在，使用默认配置: {}", config_path.display());
        return AppConfig::default();
    }

    match fs::read_to_string(config_path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("解析配置文件失败，使用默认配置: {}", err);
                AppConfig::default()
            }
        },
        Err(err) => {
            log::warn!("读取配置文件失败，使用默认配置: {}", err);
            AppConfig::default()
        }
    }
}

pub fn save_config_to_path(config_path: &Path, config: &AppConfig) -> Result<(), AppError> {
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Config(format!("创建配置目录失败: {}", e)))?;
        }
    }
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Config(format!("序列化配置失败: {}", e)))?;
    fs::write(config_path, content)
        .map_err(|e| AppError::Config(format!("写入配置文件失败: {}", e)))?;
    Ok(())
}
