//! # 位图模块
//!
//! `EncodedImage` 是一次“生成 → 预览 → 保存”周期内唯一持有的位图，
//! 固定 800×800 灰度像素，同时记录模块网格的几何信息，便于回读校验。

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{GrayImage, ImageFormat, Luma};

use super::EncodeError;

/// 模块网格在画布中的位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolGeometry {
    /// 每边模块数（不含静区）。
    pub modules: u32,
    /// 单个模块的像素边长。
    pub module_px: u32,
    /// 网格左上角距画布边缘的像素偏移。
    pub offset: u32,
}

impl SymbolGeometry {
    /// 模块 `(x, y)` 中心点的像素坐标。
    pub fn module_center(&self, x: u32, y: u32) -> (u32, u32) {
        let half = self.module_px / 2;
        (
            self.offset + x * self.module_px + half,
            self.offset + y * self.module_px + half,
        )
    }
}

/// 内存中的二维码位图。
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pixels: GrayImage,
    geometry: SymbolGeometry,
}

impl EncodedImage {
    pub(crate) fn new(pixels: GrayImage, geometry: SymbolGeometry) -> Self {
        Self { pixels, geometry }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn geometry(&self) -> SymbolGeometry {
        self.geometry
    }

    /// 按模块坐标读取颜色（深色返回 `Some(true)`），坐标越界返回 `None`。
    pub fn is_dark_at(&self, x: u32, y: u32) -> Option<bool> {
        if x >= self.geometry.modules || y >= self.geometry.modules {
            return None;
        }
        let (px, py) = self.geometry.module_center(x, y);
        let Luma([value]) = *self.pixels.get_pixel_checked(px, py)?;
        Some(value < 128)
    }

    /// 生成 PNG Data URL，供 WebView 类预览组件直接展示。
    pub fn to_png_data_url(&self) -> Result<String, EncodeError> {
        let mut cursor = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| EncodeError::Render(format!("PNG 编码失败：{}", e)))?;
        let encoded = general_purpose::STANDARD.encode(cursor.into_inner());
        Ok(format!("data:image/png;base64,{}", encoded))
    }
}
