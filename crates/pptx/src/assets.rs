//! Image loading for export.
//!
//! Local paths are read from disk, relative to the deck's directory.
//! Remote URLs and data URIs are not fetched; callers draw a placeholder.

use image::{ImageFormat, ImageReader};
use slidemark_core::{Error, Result};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Image bytes ready to embed as a media part.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub data: Vec<u8>,
    pub extension: String,
    /// Pixel size when the header could be read.
    pub size: Option<(u32, u32)>,
}

impl ImageAsset {
    /// Sniff the format and read the pixel size from the image header.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(&data)
            .map_err(|e| Error::AssetError(format!("Unrecognised image data: {}", e)))?;
        let extension = media_extension(format)
            .ok_or_else(|| Error::AssetError(format!("{:?} images cannot be embedded", format)))?;
        let size = ImageReader::with_format(Cursor::new(&data), format)
            .into_dimensions()
            .map_err(|e| log::debug!("Could not read image dimensions: {}", e))
            .ok();
        Ok(Self {
            data,
            extension: extension.to_string(),
            size,
        })
    }

    /// Width divided by height, if known.
    pub fn aspect(&self) -> Option<f64> {
        let (w, h) = self.size?;
        (w > 0 && h > 0).then(|| f64::from(w) / f64::from(h))
    }
}

/// Formats PowerPoint accepts as picture media.
fn media_extension(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpeg"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::Bmp => Some("bmp"),
        _ => None,
    }
}

/// Resolves image sources against an optional base directory.
#[derive(Debug, Clone, Default)]
pub struct AssetLoader {
    base_dir: Option<PathBuf>,
}

impl AssetLoader {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    pub fn is_remote(src: &str) -> bool {
        let lower = src.trim().to_ascii_lowercase();
        lower.starts_with("http://")
            || lower.starts_with("https://")
            || lower.starts_with("data:")
            || lower.starts_with("//")
    }

    fn resolve(&self, src: &str) -> PathBuf {
        let src = src.trim();
        let src = src.strip_prefix("file://").unwrap_or(src);
        let path = Path::new(src);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Read an image for embedding.
    pub fn read(&self, src: &str) -> Result<ImageAsset> {
        if src.trim().is_empty() {
            return Err(Error::AssetError("Empty image source".to_string()));
        }
        if Self::is_remote(src) {
            return Err(Error::AssetError(format!(
                "Remote image '{}' cannot be embedded",
                src
            )));
        }
        let path = self.resolve(src);
        let data = fs::read(&path).map_err(|e| {
            Error::AssetError(format!("Failed to read image {}: {}", path.display(), e))
        })?;
        ImageAsset::from_bytes(data)
            .map_err(|e| Error::AssetError(format!("{}: {}", path.display(), e)))
    }

    /// Load an image, or `None` (with a warning) when it cannot be embedded.
    pub fn load(&self, src: &str) -> Option<ImageAsset> {
        match self.read(src) {
            Ok(asset) => Some(asset),
            Err(e) => {
                log::warn!("{}; drawing a placeholder", e);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::tempdir;

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    /// A blank PNG of the given size.
    pub(crate) fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        encode(width, height, ImageFormat::Png)
    }

    #[test]
    fn test_load_relative_png() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("logo.png"), tiny_png(200, 100)).unwrap();
        let loader = AssetLoader::new(Some(dir.path().to_path_buf()));
        let asset = loader.load("logo.png").unwrap();
        assert_eq!(asset.extension, "png");
        assert_eq!(asset.size, Some((200, 100)));
        assert_eq!(asset.aspect(), Some(2.0));
    }

    #[test]
    fn test_jpeg_and_bmp_sizes_are_read() {
        let jpeg = ImageAsset::from_bytes(encode(400, 800, ImageFormat::Jpeg)).unwrap();
        assert_eq!(jpeg.extension, "jpeg");
        assert_eq!(jpeg.size, Some((400, 800)));
        assert_eq!(jpeg.aspect(), Some(0.5));

        let bmp = ImageAsset::from_bytes(encode(30, 10, ImageFormat::Bmp)).unwrap();
        assert_eq!(bmp.extension, "bmp");
        assert_eq!(bmp.size, Some((30, 10)));
    }

    #[test]
    fn test_remote_and_missing_images_are_skipped() {
        let loader = AssetLoader::default();
        assert!(AssetLoader::is_remote("https://example.com/a.png"));
        assert!(AssetLoader::is_remote("data:image/png;base64,AAAA"));
        assert!(loader.load("https://example.com/a.png").is_none());
        assert!(loader.load("").is_none());
        let err = loader.read("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, Error::AssetError(_)));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        let loader = AssetLoader::new(Some(dir.path().to_path_buf()));
        assert!(loader.load("notes.txt").is_none());
        assert!(matches!(loader.read("notes.txt"), Err(Error::AssetError(_))));
    }
}
