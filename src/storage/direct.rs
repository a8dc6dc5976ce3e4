//! # 直接文件策略（旧平台）
//!
//! 共享图片目录可按路径直接访问：目录不存在时创建，
//! 以 `<name>.jpg` 打开文件并写入 JPEG。写入失败时删除残留文件。

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use super::jpeg::write_jpeg;
use super::{ImageStore, PersistError, SavedImage, SavedImageDescriptor, SavedLocation};
use crate::encoder::EncodedImage;

pub struct DirectFileStore {
    folder: PathBuf,
}

impl DirectFileStore {
    /// `folder` 为共享目录下的应用子目录（如 `<root>/DCIM/QRCodeManager`）。
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &PathBuf {
        &self.folder
    }
}

impl ImageStore for DirectFileStore {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn persist(
        &self,
        image: &EncodedImage,
        descriptor: &SavedImageDescriptor,
    ) -> Result<SavedImage, PersistError> {
        if !self.folder.exists() {
            fs::create_dir_all(&self.folder).map_err(|source| PersistError::CreateDir {
                path: self.folder.clone(),
                source,
            })?;
        }

        let path = self.folder.join(descriptor.display_name());
        let file = File::create(&path)
            .map_err(|e| PersistError::OpenStream(format!("{}: {}", path.display(), e)))?;

        match write_jpeg(BufWriter::new(file), image, descriptor.quality) {
            Ok(bytes_written) => Ok(SavedImage {
                location: SavedLocation::File(path),
                bytes_written,
            }),
            Err(err) => {
                if let Err(remove_err) = fs::remove_file(&path) {
                    log::warn!("清理未完成文件失败 {}: {}", path.display(), remove_err);
                }
                Err(err)
            }
        }
    }
}
