// Persisted JPEG scanned back with a QR reader; decoded text must equal the input
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use qrcode_manager::content::{ContentSource, NetworkContent, NetworkCredentials, WifiSecurity};
use qrcode_manager::encoder::{EncodedImage, ErrorCorrection, QrEncoder};
use qrcode_manager::storage::{DirectFileStore, ImageStore, SavedImageDescriptor};

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("qrcode-manager-roundtrip-test-{nanos}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    /// 扫描磁盘上的 JPEG，返回唯一一个二维码的文本。
    fn scan(path: &Path) -> String {
        let decoded = image::open(path).expect("decode jpeg").to_luma8();
        let (width, height) = decoded.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| decoded.get_pixel(x as u32, y as u32).0[0],
        );
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1, "expected exactly one symbol in {}", path.display());
        let (_meta, text) = grids[0].decode().expect("symbol should decode");
        text
    }

    /// 压缩后的每个模块中心仍与内存位图同色。
    fn assert_modules_match(path: &Path, image: &EncodedImage) {
        let decoded = image::open(path).expect("decode jpeg").to_luma8();
        let geometry = image.geometry();
        for y in 0..geometry.modules {
            for x in 0..geometry.modules {
                let (px, py) = geometry.module_center(x, y);
                let dark = decoded.get_pixel(px, py).0[0] < 128;
                assert_eq!(Some(dark), image.is_dark_at(x, y), "module ({x}, {y})");
            }
        }
    }

    fn assert_roundtrip(content: &str, level: ErrorCorrection) {
        let dir = unique_temp_dir();
        let folder = dir.join("DCIM").join("QRCodeManager");
        let store = DirectFileStore::new(folder.clone());

        let image = QrEncoder::new(level).encode(content).expect("encode");
        let descriptor = SavedImageDescriptor::at_millis("QR_", 1_700_000_000_000, "DCIM/QRCodeManager");
        let saved = store.persist(&image, &descriptor).expect("persist");

        let path = saved.location.path().to_path_buf();
        assert_eq!(path, folder.join("QR_1700000000000.jpg"));
        assert_modules_match(&path, &image);
        assert_eq!(scan(&path), content);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn url_survives_jpeg_persist() {
        assert_roundtrip("https://example.com", ErrorCorrection::Low);
    }

    #[test]
    fn wifi_payload_survives_jpeg_persist() {
        let network = NetworkContent::new(NetworkCredentials {
            ssid: "Home;Net".to_string(),
            password: "p:ss".to_string(),
            security: WifiSecurity::Wpa,
            hidden: false,
        });
        let payload = network.content().expect("credentials produce a payload");
        assert_roundtrip(&payload, ErrorCorrection::Medium);
    }

    #[test]
    fn unicode_text_survives_jpeg_persist() {
        assert_roundtrip("二维码管理器 ✓", ErrorCorrection::High);
    }

    #[test]
    fn near_capacity_text_survives_jpeg_persist() {
        assert_roundtrip(&"x".repeat(2000), ErrorCorrection::Low);
    }

    #[test]
    fn quiet_zone_stays_light_after_compression() {
        let dir = unique_temp_dir();
        let store = DirectFileStore::new(dir.clone());
        let image = QrEncoder::default().encode("quiet zone").expect("encode");
        let descriptor = SavedImageDescriptor::at_millis("QR_", 1, "DCIM/QRCodeManager");
        let saved = store.persist(&image, &descriptor).expect("persist");

        let decoded = image::open(saved.location.path()).expect("decode").to_luma8();
        assert_eq!(decoded.dimensions(), (800, 800));
        let margin = image.geometry().offset;
        for i in (0..800).step_by(40) {
            assert!(decoded.get_pixel(i, margin / 2).0[0] > 128);
            assert!(decoded.get_pixel(margin / 2, i).0[0] > 128);
        }

        let _ = std::fs::remove_dir_all(dir);
    }
}
