//! # 作用域存储策略（新平台）
//!
//! 不直接触碰共享目录路径：先向 `MediaRegistry` 登记元数据
//! （显示名 `<name>.jpg`、`image/jpeg`、相对路径），再从返回的地址打开输出流写入。
//! 写入失败时撤销登记，成功后发布条目。

use std::sync::Arc;

use super::jpeg::write_jpeg;
use super::registry::{MediaEntry, MediaRegistry, MediaUri};
use super::{ImageStore, PersistError, SavedImage, SavedImageDescriptor, SavedLocation};
use crate::encoder::EncodedImage;

pub struct ScopedStorageStore {
    registry: Arc<dyn MediaRegistry>,
}

impl ScopedStorageStore {
    pub fn new(registry: Arc<dyn MediaRegistry>) -> Self {
        Self { registry }
    }

    fn rollback(&self, uri: &MediaUri) {
        if let Err(err) = self.registry.delete(uri) {
            log::warn!("撤销登记失败 {}: {}", uri.as_str(), err);
        }
    }
}

impl ImageStore for ScopedStorageStore {
    fn name(&self) -> &'static str {
        "scoped"
    }

    fn persist(
        &self,
        image: &EncodedImage,
        descriptor: &SavedImageDescriptor,
    ) -> Result<SavedImage, PersistError> {
        let entry = MediaEntry {
            display_name: descriptor.display_name(),
            mime_type: descriptor.mime_type.to_string(),
            relative_path: descriptor.relative_path.clone(),
            date_added_ms: descriptor.created_at_ms,
        };
        let uri = self.registry.insert(&entry)?;

        let written = self
            .registry
            .open_output_stream(&uri)
            .and_then(|stream| write_jpeg(stream, image, descriptor.quality));

        let bytes_written = match written {
            Ok(bytes) => bytes,
            Err(err) => {
                self.rollback(&uri);
                return Err(err);
            }
        };

        if let Err(err) = self.registry.publish(&uri) {
            self.rollback(&uri);
            return Err(err);
        }

        let path = self.registry.resolve_path(&uri)?;
        Ok(SavedImage {
            location: SavedLocation::Media {
                uri: uri.as_str().to_string(),
                path,
            },
            bytes_written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::QrEncoder;
    use crate::storage::registry::SqliteMediaRegistry;
    use std::io::{self, Write};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("qrcode-manager-scoped-test-{nanos}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn registers_metadata_then_writes_jpeg() {
        let dir = unique_temp_dir();
        let registry = Arc::new(SqliteMediaRegistry::open_in_memory(&dir).expect("registry"));
        let store = ScopedStorageStore::new(registry.clone());
        let image = QrEncoder::default().encode("scoped").expect("encode");
        let descriptor = SavedImageDescriptor::at_millis("QR_", 1_700_000_000_000, "DCIM/QRCodeManager");

        let saved = store.persist(&image, &descriptor).expect("persist");

        let SavedLocation::Media { uri, path } = &saved.location else {
            panic!("scoped store must return a media location");
        };
        assert!(uri.starts_with("content://media/external/images/media/"));
        assert_eq!(path, &dir.join("DCIM").join("QRCodeManager").join("QR_1700000000000.jpg"));
        let published = registry.list_published("DCIM/QRCodeManager").expect("list");
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, "QR_1700000000000.jpg");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn file_left_by_direct_strategy_is_kept() {
        let dir = unique_temp_dir();
        let folder = dir.join("DCIM").join("QRCodeManager");
        std::fs::create_dir_all(&folder).expect("create folder");
        let existing = folder.join("QR_1.jpg");
        std::fs::write(&existing, b"USER DATA").expect("seed file");

        let registry = Arc::new(SqliteMediaRegistry::open_in_memory(&dir).expect("registry"));
        let store = ScopedStorageStore::new(registry);
        let image = QrEncoder::default().encode("keep me").expect("encode");
        let descriptor = SavedImageDescriptor::at_millis("QR_", 1, "DCIM/QRCodeManager");

        let saved = store.persist(&image, &descriptor).expect("persist");
        assert_eq!(saved.location.path(), folder.join("QR_1 (1).jpg").as_path());
        assert_eq!(std::fs::read(&existing).expect("read seed"), b"USER DATA");
        let _ = std::fs::remove_dir_all(dir);
    }

    /// 登记成功但输出流写入失败的登记表。
    struct FailingStreamRegistry {
        deleted: Mutex<Vec<String>>,
    }

    struct BrokenStream;

    impl Write for BrokenStream {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("storage ejected"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl MediaRegistry for FailingStreamRegistry {
        fn insert(&self, _entry: &MediaEntry) -> Result<MediaUri, PersistError> {
            Ok(MediaUri::from_id(7))
        }

        fn open_output_stream(&self, _uri: &MediaUri) -> Result<Box<dyn Write + Send>, PersistError> {
            Ok(Box::new(BrokenStream))
        }

        fn publish(&self, _uri: &MediaUri) -> Result<(), PersistError> {
            panic!("failed writes must never be published");
        }

        fn delete(&self, uri: &MediaUri) -> Result<(), PersistError> {
            self.deleted
                .lock()
                .expect("lock")
                .push(uri.as_str().to_string());
            Ok(())
        }

        fn resolve_path(&self, _uri: &MediaUri) -> Result<PathBuf, PersistError> {
            Ok(PathBuf::from("unused"))
        }
    }

    #[test]
    fn failed_write_rolls_back_registration() {
        let registry = Arc::new(FailingStreamRegistry {
            deleted: Mutex::new(Vec::new()),
        });
        let store = ScopedStorageStore::new(registry.clone());
        let image = QrEncoder::default().encode("rollback").expect("encode");
        let descriptor = SavedImageDescriptor::at_millis("QR_", 5, "DCIM/QRCodeManager");

        let result = store.persist(&image, &descriptor);

        assert!(matches!(result, Err(PersistError::Compression(_))));
        assert_eq!(
            registry.deleted.lock().expect("lock").as_slice(),
            ["content://media/external/images/media/7".to_string()]
        );
    }
}
