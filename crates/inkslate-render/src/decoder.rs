//! Image decoding through the `image` crate.

use inkslate_core::bitmap::{
    Bitmap, BitmapError, BitmapResult, BoxFuture, ImageDecoder, ImageFormat, parse_data_url,
};
use std::path::PathBuf;

/// Decodes PNG, JPEG and WebP from data URLs or local files.
///
/// Relative paths resolve against `base_dir` when one is set. Decoding runs
/// synchronously; the returned future is ready on first poll.
#[derive(Debug, Clone, Default)]
pub struct ImageCrateDecoder {
    base_dir: Option<PathBuf>,
}

impl ImageCrateDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Decode `src` right away.
    pub fn load(&self, src: &str) -> BitmapResult<Bitmap> {
        if src.starts_with("data:") {
            let (mime, bytes) = parse_data_url(src)?;
            if ImageFormat::from_magic_bytes(&bytes).is_none() {
                return Err(BitmapError::UnsupportedFormat(mime));
            }
            return decode_bytes(&bytes);
        }

        let path = match &self.base_dir {
            Some(dir) => dir.join(src),
            None => PathBuf::from(src),
        };
        let bytes = std::fs::read(&path)
            .map_err(|e| BitmapError::Decode(format!("{}: {}", path.display(), e)))?;
        decode_bytes(&bytes)
    }
}

fn decode_bytes(bytes: &[u8]) -> BitmapResult<Bitmap> {
    let decoded =
        ::image::load_from_memory(bytes).map_err(|e| BitmapError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Bitmap::from_rgba8(width, height, rgba.into_vec())
}

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, src: &str) -> BoxFuture<'static, BitmapResult<Bitmap>> {
        let result = self.load(src);
        if let Err(e) = &result {
            log::debug!("Image decode failed for {} bytes of source: {}", src.len(), e);
        }
        Box::pin(std::future::ready(result))
    }
}
