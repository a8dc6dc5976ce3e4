//! # 二维码编码模块（encoder）
//!
//! ## 设计思路
//!
//! 编码是纯函数：相同内容必定得到逐像素一致的位图。
//! 画布尺寸固定为 800×800，无论内容长短都保持正方形，
//! 模块按整数倍放大后居中，四周保留 4 个模块宽的静区。
//!
//! ## 实现思路
//!
//! 1. `qrcode` 计算符号矩阵（字节模式，UTF-8）
//! 2. 计算整数放大倍数与居中偏移
//! 3. 在白色画布上逐模块填充深色像素
//!
//! 容量溢出与非法字符统一映射为 `EncodeError`，由工作流上报给用户。

mod error;
mod raster;

pub use error::EncodeError;
pub use raster::{EncodedImage, SymbolGeometry};

use image::{GrayImage, Luma};
use qrcode::bits::Bits;
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode, Version};
use serde::{Deserialize, Serialize};

/// 输出位图边长（像素）。
pub const QR_IMAGE_SIZE: u32 = 800;

/// 静区宽度（模块数）。
pub const QUIET_ZONE_MODULES: u32 = 4;

/// 纠错等级。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
    #[default]
    Low,
    Medium,
    Quartile,
    High,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }
}

/// 二维码编码器。
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder {
    error_correction: ErrorCorrection,
}

impl QrEncoder {
    pub fn new(error_correction: ErrorCorrection) -> Self {
        Self { error_correction }
    }

    /// 将非空内容编码为 800×800 位图。
    ///
    /// 空白判定由调用方负责；这里只处理容量与字符集错误。
    pub fn encode(&self, content: &str) -> Result<EncodedImage, EncodeError> {
        let code = byte_mode_symbol(content.as_bytes(), self.error_correction.into())
            .map_err(|e| map_qr_error(e, content.len()))?;

        let modules = code.width() as u32;
        let framed = modules + QUIET_ZONE_MODULES * 2;
        let module_px = QR_IMAGE_SIZE / framed;
        if module_px == 0 {
            return Err(EncodeError::Render(format!(
                "符号过大：{} 个模块无法放入 {} 像素画布",
                framed, QR_IMAGE_SIZE
            )));
        }
        let offset = (QR_IMAGE_SIZE - modules * module_px) / 2;
        let geometry = SymbolGeometry {
            modules,
            module_px,
            offset,
        };

        let mut pixels = GrayImage::from_pixel(QR_IMAGE_SIZE, QR_IMAGE_SIZE, Luma([255]));
        for (index, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let x = index as u32 % modules;
            let y = index as u32 / modules;
            let left = offset + x * module_px;
            let top = offset + y * module_px;
            for py in top..top + module_px {
                for px in left..left + module_px {
                    pixels.put_pixel(px, py, Luma([0]));
                }
            }
        }

        log::debug!(
            "🔳 二维码编码完成 - 内容 {} 字节，{}x{} 模块，模块 {}px",
            content.len(),
            modules,
            modules,
            module_px
        );

        Ok(EncodedImage::new(pixels, geometry))
    }
}

/// 以单一字节段编码，选取能容纳内容的最小版本。
///
/// `qrcode` 的自动分段会把 UTF-8 中文的字节对识别成 Shift-JIS 汉字段，
/// 扫码端因此读出乱码，所以这里固定使用字节模式。
fn byte_mode_symbol(data: &[u8], ec_level: EcLevel) -> Result<QrCode, QrError> {
    for number in 1..=40 {
        let mut bits = Bits::new(Version::Normal(number));
        if bits.push_byte_data(data).is_err() {
            continue;
        }
        match bits.push_terminator(ec_level) {
            Ok(()) => return QrCode::with_bits(bits, ec_level),
            Err(QrError::DataTooLong) => continue,
            Err(other) => return Err(other),
        }
    }
    Err(QrError::DataTooLong)
}

fn map_qr_error(error: QrError, bytes: usize) -> EncodeError {
    match error {
        QrError::DataTooLong => EncodeError::CapacityExceeded { bytes },
        other => EncodeError::Unsupported(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_url_to_fixed_square_canvas() {
        let image = QrEncoder::default()
            .encode("https://example.com")
            .expect("url should encode");
        assert_eq!(image.width(), QR_IMAGE_SIZE);
        assert_eq!(image.height(), QR_IMAGE_SIZE);
    }

    #[test]
    fn canvas_stays_square_for_long_content() {
        let long = "x".repeat(2000);
        let image = QrEncoder::default().encode(&long).expect("2000 bytes fit at level L");
        assert_eq!((image.width(), image.height()), (QR_IMAGE_SIZE, QR_IMAGE_SIZE));
        assert!(image.geometry().module_px >= 4);
    }

    #[test]
    fn encoding_is_deterministic() {
        let encoder = QrEncoder::new(ErrorCorrection::Medium);
        let first = encoder.encode("determinism").expect("encode");
        let second = encoder.encode("determinism").expect("encode");
        assert_eq!(first.pixels().as_raw(), second.pixels().as_raw());
    }

    #[test]
    fn oversized_content_reports_capacity_error() {
        let huge = "y".repeat(5000);
        let result = QrEncoder::default().encode(&huge);
        assert!(matches!(result, Err(EncodeError::CapacityExceeded { bytes: 5000 })));
    }

    #[test]
    fn finder_pattern_corners_are_dark() {
        let image = QrEncoder::default().encode("finder").expect("encode");
        let last = image.geometry().modules - 1;
        assert_eq!(image.is_dark_at(0, 0), Some(true));
        assert_eq!(image.is_dark_at(last, 0), Some(true));
        assert_eq!(image.is_dark_at(0, last), Some(true));
        // 定位图形内部的白环
        assert_eq!(image.is_dark_at(1, 1), Some(false));
    }

    #[test]
    fn module_lookup_outside_grid_is_none() {
        let image = QrEncoder::default().encode("bounds").expect("encode");
        let modules = image.geometry().modules;
        assert_eq!(image.is_dark_at(modules, 0), None);
        assert_eq!(image.is_dark_at(0, modules), None);
        assert_eq!(image.is_dark_at(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn quiet_zone_is_white() {
        let image = QrEncoder::default().encode("quiet").expect("encode");
        let offset = image.geometry().offset;
        assert!(offset >= QUIET_ZONE_MODULES * image.geometry().module_px);
        assert_eq!(image.pixels().get_pixel(0, 0), &Luma([255]));
        assert_eq!(image.pixels().get_pixel(offset - 1, offset - 1), &Luma([255]));
    }

    #[test]
    fn png_data_url_has_prefix() {
        let image = QrEncoder::default().encode("preview").expect("encode");
        let url = image.to_png_data_url().expect("png");
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }
}
