//! Image file loading and saving. Codecs come from the `image` crate; the
//! output format is inferred from the file extension, falling back to PNG.

use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{EaselError, Result};

pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|e| EaselError::Decode {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(img.to_rgba8())
}

/// Encoding format for a destination path. Unknown extensions get PNG.
pub fn format_for_path(path: &Path) -> ImageFormat {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => ImageFormat::Jpeg,
        Some("webp") => ImageFormat::WebP,
        Some("bmp") => ImageFormat::Bmp,
        Some("tga") => ImageFormat::Tga,
        Some("tif") | Some("tiff") => ImageFormat::Tiff,
        _ => ImageFormat::Png,
    }
}

pub fn save_image(path: &Path, image: &RgbaImage) -> Result<()> {
    let format = format_for_path(path);
    let result = match format {
        // JPEG has no alpha channel; flatten to RGB first.
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .save_with_format(path, format),
        _ => image.save_with_format(path, format),
    };
    result.map_err(|e| EaselError::Encode {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use image::Rgba;

    #[test]
    fn test_format_inference() {
        assert_eq!(format_for_path(Path::new("a.JPG")), ImageFormat::Jpeg);
        assert_eq!(format_for_path(Path::new("a.tiff")), ImageFormat::Tiff);
        assert_eq!(format_for_path(Path::new("a.dat")), ImageFormat::Png);
        assert_eq!(format_for_path(Path::new("noext")), ImageFormat::Png);
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut img = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 1, Rgba([200, 100, 50, 128]));
        save_image(&path, &img).unwrap();
        let back = load_image(&path).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = load_image(Path::new("/nonexistent/nope.png")).unwrap_err();
        assert!(matches!(err, EaselError::Decode { .. }));
    }
}
