//! # 图片持久化模块（storage）
//!
//! ## 设计思路
//!
//! 把位图写入共享图片目录有两种互斥方式，按宿主平台能力在启动时选定一次：
//!
//! - `ScopedStorageStore`：新平台，先向媒体登记表登记元数据，再从返回地址写入
//! - `DirectFileStore`：旧平台，按路径创建目录并直接写文件
//!
//! 二者都实现 `ImageStore`，工作流只依赖这个 trait。
//!
//! ## 实现思路
//!
//! ```text
//! SavedImageDescriptor（名称 / 相对路径 / MIME / 质量）
//!    ↓
//! ImageStore::persist
//!    ├─ scoped.rs  登记 → 打开输出流 → jpeg.rs → 发布（失败则撤销登记）
//!    └─ direct.rs  建目录 → 打开文件 → jpeg.rs（失败则删除残留）
//!    ↓
//! SavedImage（位置 + 字节数）
//! ```
//!
//! 输出流在 `jpeg.rs` 内按值持有，任何退出路径都会 `flush` 并随 `Drop` 关闭。
//! 所有失败以 `PersistError` 返回，不会 panic。

mod direct;
mod jpeg;
mod registry;
mod scoped;

pub use direct::DirectFileStore;
pub use registry::{MediaEntry, MediaRegistry, MediaUri, SqliteMediaRegistry};
pub use scoped::ScopedStorageStore;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::StorageConfig;
use crate::encoder::EncodedImage;
use crate::error::AppError;

pub const JPEG_MIME: &str = "image/jpeg";
pub const JPEG_SUFFIX: &str = ".jpg";
pub const JPEG_QUALITY: u8 = 60;

/// 持久化错误。
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("创建目录失败 {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("打开输出流失败: {0}")]
    OpenStream(String),

    #[error("JPEG 压缩失败: {0}")]
    Compression(String),

    #[error("刷新输出流失败: {0}")]
    Flush(#[source] std::io::Error),

    #[error("媒体登记失败: {0}")]
    Registry(String),

    #[error("写入任务中断: {0}")]
    Interrupted(String),
}

/// 生成保存文件名：`<prefix><unix 毫秒>`。
pub fn saved_image_name(prefix: &str, millis: i64) -> String {
    format!("{}{}", prefix, millis)
}

/// 一次保存的描述信息，创建后不再修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImageDescriptor {
    /// 不含扩展名的文件名
    pub name: String,
    /// 共享目录下的相对路径（`/` 分隔）
    pub relative_path: String,
    pub mime_type: &'static str,
    pub quality: u8,
    pub created_at_ms: i64,
}

impl SavedImageDescriptor {
    pub fn at_millis(prefix: &str, millis: i64, relative_path: impl Into<String>) -> Self {
        Self {
            name: saved_image_name(prefix, millis),
            relative_path: relative_path.into(),
            mime_type: JPEG_MIME,
            quality: JPEG_QUALITY,
            created_at_ms: millis,
        }
    }

    /// 以当前时间命名。
    pub fn now(prefix: &str, relative_path: impl Into<String>) -> Self {
        Self::at_millis(prefix, chrono::Utc::now().timestamp_millis(), relative_path)
    }

    pub fn display_name(&self) -> String {
        format!("{}{}", self.name, JPEG_SUFFIX)
    }
}

/// 保存位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedLocation {
    File(PathBuf),
    Media { uri: String, path: PathBuf },
}

impl SavedLocation {
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) => path,
            Self::Media { path, .. } => path,
        }
    }
}

/// 保存结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub location: SavedLocation,
    pub bytes_written: u64,
}

/// 存储策略。
///
/// 实现必须是阻塞式的同步写入，工作流会把它放到阻塞线程池执行。
pub trait ImageStore: Send + Sync {
    /// 策略名称（用于日志）。
    fn name(&self) -> &'static str;

    fn persist(
        &self,
        image: &EncodedImage,
        descriptor: &SavedImageDescriptor,
    ) -> Result<SavedImage, PersistError>;
}

// ============================================================================
// 目录布局
// ============================================================================

/// 应用私有数据目录名（位于系统数据目录下）。
const APP_DATA_DIR: &str = "qrcode-manager";

/// 共享图片区、应用子目录与私有数据目录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub shared_root: PathBuf,
    /// 登记表等内部文件所在目录，不与用户图片混放
    pub data_dir: PathBuf,
    pub media_dir: String,
    pub folder_name: String,
    relative_path: String,
}

impl StorageLayout {
    /// 按配置解析目录布局。
    ///
    /// 优先使用配置中的共享根目录，未设置时回退到系统图片目录，再回退到用户主目录。
    /// 私有数据目录同理，未设置时取系统数据目录下的 `qrcode-manager`。
    pub fn from_config(config: &StorageConfig) -> Result<Self, AppError> {
        let shared_root = match config.shared_root.as_deref() {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::picture_dir()
                .or_else(dirs::home_dir)
                .ok_or_else(|| AppError::Config("无法确定共享图片目录".to_string()))?,
        };
        let data_dir = match config.data_dir.as_deref() {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::data_dir()
                .map(|dir| dir.join(APP_DATA_DIR))
                .ok_or_else(|| AppError::Config("无法确定应用数据目录".to_string()))?,
        };
        Ok(Self {
            shared_root,
            data_dir,
            media_dir: config.media_dir.clone(),
            folder_name: config.folder_name.clone(),
            relative_path: config.relative_path(),
        })
    }

    /// 登记表使用的相对路径，如 `DCIM/QRCodeManager`。
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// 登记表文件的绝对路径。
    pub fn registry_path(&self, registry_file: &str) -> PathBuf {
        self.data_dir.join(registry_file)
    }

    /// 应用子目录的绝对路径。
    pub fn folder_path(&self) -> PathBuf {
        self.shared_root.join(&self.media_dir).join(&self.folder_name)
    }
}

/// 已保存图片目录信息
#[derive(Debug, Clone, Serialize)]
pub struct SavedFolderInfo {
    pub path: String,
    pub total_size: u64,
    pub file_count: u64,
}

/// 统计目录下 JPEG 文件的数量与总大小；目录不存在时返回零值。
pub fn saved_images_info(dir: &Path) -> SavedFolderInfo {
    let mut total_size: u64 = 0;
    let mut file_count: u64 = 0;

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let is_jpeg = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
            if !is_jpeg {
                continue;
            }
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_file() {
                    total_size += metadata.len();
                    file_count += 1;
                }
            }
        }
    }

    SavedFolderInfo {
        path: dir.to_string_lossy().to_string(),
        total_size,
        file_count,
    }
}
