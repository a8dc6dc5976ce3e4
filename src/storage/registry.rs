//! # 媒体登记表
//!
//! ## 职责
//! - 作用域存储策略下，文件不直接按路径写入，而是先在登记表中登记元数据，
//!   再从登记返回的位置取得写入句柄
//! - 登记条目先处于“待定”状态，写入成功后发布，失败则删除
//!
//! ## 输入/输出
//! - 输入：`MediaEntry`（显示名、MIME、相对路径、登记时间）
//! - 输出：`MediaUri`（`content://media/external/images/media/<id>`）
//!
//! ## 错误语义
//! - SQL 与文件句柄失败统一映射为 `PersistError::Registry` / `PersistError::OpenStream`

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use super::PersistError;

const MEDIA_URI_PREFIX: &str = "content://media/external/images/media/";

/// 登记表返回的内容地址。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUri(String);

impl MediaUri {
    pub(crate) fn from_id(id: i64) -> Self {
        Self(format!("{}{}", MEDIA_URI_PREFIX, id))
    }

    pub fn id(&self) -> Option<i64> {
        self.0.strip_prefix(MEDIA_URI_PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 待登记的文件元数据。
#[derive(Debug, Clone)]
pub struct MediaEntry {
    pub display_name: String,
    pub mime_type: String,
    /// 以 `/` 分隔的相对路径，如 `DCIM/QRCodeManager`
    pub relative_path: String,
    pub date_added_ms: i64,
}

/// 平台内容登记表。
pub trait MediaRegistry: Send + Sync {
    /// 登记元数据，返回待定条目的地址。
    fn insert(&self, entry: &MediaEntry) -> Result<MediaUri, PersistError>;
    /// 打开条目对应的输出流。
    fn open_output_stream(&self, uri: &MediaUri) -> Result<Box<dyn Write + Send>, PersistError>;
    /// 写入完成后发布条目。
    fn publish(&self, uri: &MediaUri) -> Result<(), PersistError>;
    /// 删除条目及其文件。
    fn delete(&self, uri: &MediaUri) -> Result<(), PersistError>;
    /// 条目在磁盘上的实际路径。
    fn resolve_path(&self, uri: &MediaUri) -> Result<PathBuf, PersistError>;
}

/// 基于 SQLite 的登记表实现，文件落在 `root/<relative_path>/<display_name>`。
pub struct SqliteMediaRegistry {
    conn: Mutex<Connection>,
    root: PathBuf,
}

fn registry_err(context: &str, e: impl std::fmt::Display) -> PersistError {
    PersistError::Registry(format!("{}: {}", context, e))
}

fn initialize_schema(conn: &Connection) -> Result<(), PersistError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS images (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            display_name TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            relative_path TEXT NOT NULL,
            date_added INTEGER NOT NULL,
            is_pending INTEGER NOT NULL DEFAULT 1 CHECK (is_pending IN (0, 1))
        );
        CREATE INDEX IF NOT EXISTS idx_images_relative_path ON images(relative_path, display_name);",
    )
    .map_err(|e| registry_err("创建登记表失败", e))
}

fn media_path(root: &Path, relative_path: &str, display_name: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in relative_path.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.join(display_name)
}

/// 同目录下重名时追加 ` (n)` 后缀。
///
/// 登记表中已有的名称和磁盘上已存在的文件都视为占用。
fn unique_display_name(
    conn: &Connection,
    root: &Path,
    relative_path: &str,
    display_name: &str,
) -> Result<String, PersistError> {
    let (stem, ext) = match display_name.rfind('.') {
        Some(dot) => (&display_name[..dot], &display_name[dot..]),
        None => (display_name, ""),
    };

    let mut candidate = display_name.to_string();
    let mut n = 1;
    loop {
        let taken: Option<i64> = conn
            .query_row(
                "SELECT _id FROM images WHERE relative_path = ?1 AND display_name = ?2",
                params![relative_path, candidate],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| registry_err("查询重名失败", e))?;
        if taken.is_none() && !media_path(root, relative_path, &candidate).exists() {
            return Ok(candidate);
        }
        candidate = format!("{} ({}){}", stem, n, ext);
        n += 1;
    }
}

impl SqliteMediaRegistry {
    /// 打开（必要时创建）位于 `db_path` 的登记表，媒体文件写入 `root`。
    ///
    /// 数据库及其 WAL 文件只放在 `db_path` 所在目录，不进入共享图片区。
    pub fn open(db_path: &Path, root: &Path) -> Result<Self, PersistError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|source| PersistError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(db_path).map_err(|e| registry_err("打开登记表失败", e))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| registry_err("设置 WAL 失败", e))?;
        Self::with_connection(conn, root)
    }

    /// 内存登记表，文件仍写入 `root`。
    pub fn open_in_memory(root: &Path) -> Result<Self, PersistError> {
        let conn = Connection::open_in_memory().map_err(|e| registry_err("打开内存登记表失败", e))?;
        Self::with_connection(conn, root)
    }

    fn with_connection(conn: Connection, root: &Path) -> Result<Self, PersistError> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            root: root.to_path_buf(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PersistError> {
        self.conn
            .lock()
            .map_err(|e| registry_err("获取登记表锁失败", e))
    }

    fn lookup(conn: &Connection, uri: &MediaUri) -> Result<(i64, String, String), PersistError> {
        let id = uri
            .id()
            .ok_or_else(|| PersistError::Registry(format!("无法解析内容地址: {}", uri.as_str())))?;
        conn.query_row(
            "SELECT _id, relative_path, display_name FROM images WHERE _id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(|e| registry_err("查询登记条目失败", e))?
        .ok_or_else(|| PersistError::Registry(format!("登记条目不存在: {}", uri.as_str())))
    }

    fn path_for(&self, relative_path: &str, display_name: &str) -> PathBuf {
        media_path(&self.root, relative_path, display_name)
    }

    /// 列出某目录下已发布的条目（按登记顺序）。
    pub fn list_published(&self, relative_path: &str) -> Result<Vec<(MediaUri, String)>, PersistError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT _id, display_name FROM images
                 WHERE relative_path = ?1 AND is_pending = 0
                 ORDER BY _id",
            )
            .map_err(|e| registry_err("准备查询失败", e))?;
        let rows = stmt
            .query_map(params![relative_path], |row| {
                Ok((MediaUri::from_id(row.get(0)?), row.get::<_, String>(1)?))
            })
            .map_err(|e| registry_err("查询已发布条目失败", e))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| registry_err("读取已发布条目失败", e))
    }

    /// 登记表内条目总数（含待定）。
    pub fn entry_count(&self) -> Result<i64, PersistError> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .map_err(|e| registry_err("统计登记条目失败", e))
    }
}

impl MediaRegistry for SqliteMediaRegistry {
    fn insert(&self, entry: &MediaEntry) -> Result<MediaUri, PersistError> {
        let conn = self.lock()?;
        let display_name = unique_display_name(&conn, &self.root, &entry.relative_path, &entry.display_name)?;
        conn.execute(
            "INSERT INTO images (display_name, mime_type, relative_path, date_added, is_pending)
             VALUES (?1, ?2, ?3, ?4, 1)",
            params![display_name, entry.mime_type, entry.relative_path, entry.date_added_ms],
        )
        .map_err(|e| registry_err("登记图片失败", e))?;
        let uri = MediaUri::from_id(conn.last_insert_rowid());
        log::debug!("🗂️ 已登记 {} -> {}/{}", uri.as_str(), entry.relative_path, display_name);
        Ok(uri)
    }

    fn open_output_stream(&self, uri: &MediaUri) -> Result<Box<dyn Write + Send>, PersistError> {
        let path = self.resolve_path(uri)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PersistError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| PersistError::OpenStream(format!("{}: {}", path.display(), e)))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn publish(&self, uri: &MediaUri) -> Result<(), PersistError> {
        let conn = self.lock()?;
        let (id, _, _) = Self::lookup(&conn, uri)?;
        conn.execute("UPDATE images SET is_pending = 0 WHERE _id = ?1", params![id])
            .map_err(|e| registry_err("发布登记条目失败", e))?;
        Ok(())
    }

    fn delete(&self, uri: &MediaUri) -> Result<(), PersistError> {
        let conn = self.lock()?;
        let (id, relative_path, display_name) = Self::lookup(&conn, uri)?;
        let path = self.path_for(&relative_path, &display_name);
        if path.exists() {
            if let Err(err) = fs::remove_file(&path) {
                log::warn!("删除登记文件失败 {}: {}", path.display(), err);
            }
        }
        conn.execute("DELETE FROM images WHERE _id = ?1", params![id])
            .map_err(|e| registry_err("删除登记条目失败", e))?;
        Ok(())
    }

    fn resolve_path(&self, uri: &MediaUri) -> Result<PathBuf, PersistError> {
        let conn = self.lock()?;
        let (_, relative_path, display_name) = Self::lookup(&conn, uri)?;
        Ok(self.path_for(&relative_path, &display_name))
    }
}
