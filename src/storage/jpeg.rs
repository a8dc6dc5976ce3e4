//! # JPEG 写出
//!
//! 两种存储策略共用的落盘步骤：把位图以固定质量压缩进输出流。
//! 输出流按值传入，函数返回前无论成功与否都会先 `flush`，
//! 离开作用域时随 `Drop` 关闭，不会遗留句柄或半截文件句柄。

use std::io::{self, Write};

use image::codecs::jpeg::JpegEncoder;

use super::PersistError;
use crate::encoder::EncodedImage;

/// 统计写入字节数的包装器。
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// 压缩并写出 JPEG，返回写入的字节数。
pub(crate) fn write_jpeg<W: Write>(
    out: W,
    image: &EncodedImage,
    quality: u8,
) -> Result<u64, PersistError> {
    let mut writer = CountingWriter {
        inner: out,
        written: 0,
    };

    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    let encoded = image
        .pixels()
        .write_with_encoder(encoder)
        .map_err(|e| PersistError::Compression(e.to_string()));
    let flushed = writer.flush().map_err(PersistError::Flush);

    // 压缩错误优先于刷新错误上报
    encoded?;
    flushed?;

    if writer.written == 0 {
        return Err(PersistError::Compression("编码器未输出任何数据".to_string()));
    }
    Ok(writer.written)
}
