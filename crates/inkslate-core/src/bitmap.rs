//! RGBA8 bitmaps, PNG data URLs and the asynchronous image decoder seam.

use base64::{Engine, engine::general_purpose::STANDARD};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Bitmap encoding and decoding errors.
#[derive(Debug, Error)]
pub enum BitmapError {
    #[error("Not a data URL: {0}")]
    InvalidDataUrl(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("PNG encoding error: {0}")]
    PngEncode(#[from] png::EncodingError),
    #[error("PNG decoding error: {0}")]
    PngDecode(#[from] png::DecodingError),
    #[error("Pixel buffer of {actual} bytes does not match {width}x{height}")]
    SizeMismatch { width: u32, height: u32, actual: usize },
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for bitmap operations.
pub type BitmapResult<T> = Result<T, BitmapError>;

/// Boxed future for decode operations. Not `Send`: sessions are single-threaded.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Encoded image formats recognized in data URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// Split a base64 `data:` URL into its declared MIME type and raw bytes.
pub fn parse_data_url(url: &str) -> BitmapResult<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| BitmapError::InvalidDataUrl(truncate(url)))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| BitmapError::InvalidDataUrl(truncate(url)))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| BitmapError::InvalidDataUrl(truncate(url)))?;
    Ok((mime.to_string(), STANDARD.decode(payload.trim())?))
}

fn truncate(s: &str) -> String {
    s.chars().take(32).collect()
}

/// Straight (non-premultiplied) RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// A fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> BitmapResult<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return Err(BitmapError::SizeMismatch {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// RGBA at `(x, y)`, or `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    pub fn is_blank(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Encode as PNG bytes.
    pub fn encode_png(&self) -> BitmapResult<Vec<u8>> {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.data)?;
        }
        Ok(png_data)
    }

    /// Decode PNG bytes, expanding palette, gray and 16-bit images to RGBA8.
    pub fn decode_png(bytes: &[u8]) -> BitmapResult<Self> {
        let mut decoder = png::Decoder::new(bytes);
        decoder.set_transformations(png::Transformations::normalize_to_color8());
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        buf.truncate(info.buffer_size());

        let pixels = info.width as usize * info.height as usize;
        let data = match info.color_type {
            png::ColorType::Rgba => buf,
            png::ColorType::Rgb => buf
                .chunks_exact(3)
                .flat_map(|c| [c[0], c[1], c[2], 255])
                .collect(),
            png::ColorType::GrayscaleAlpha => buf
                .chunks_exact(2)
                .flat_map(|c| [c[0], c[0], c[0], c[1]])
                .collect(),
            png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 255]).collect(),
            png::ColorType::Indexed => {
                return Err(BitmapError::Decode("unexpanded palette image".into()));
            }
        };
        debug_assert_eq!(data.len(), pixels * 4);
        Self::from_rgba8(info.width, info.height, data)
    }

    /// Encode as a `data:image/png;base64,...` URL.
    pub fn to_data_url(&self) -> BitmapResult<String> {
        let png = self.encode_png()?;
        Ok(format!("data:{};base64,{}", ImageFormat::Png.mime_type(), STANDARD.encode(png)))
    }

    /// Decode a PNG data URL.
    pub fn from_data_url(url: &str) -> BitmapResult<Self> {
        let (mime, bytes) = parse_data_url(url)?;
        match ImageFormat::from_magic_bytes(&bytes) {
            Some(ImageFormat::Png) => Self::decode_png(&bytes),
            _ => Err(BitmapError::UnsupportedFormat(mime)),
        }
    }
}

/// Turns an image source string into pixels, possibly asynchronously.
///
/// The returned future must not borrow the decoder: it is owned by the
/// session until it resolves or the session drops it.
pub trait ImageDecoder {
    fn decode(&self, src: &str) -> BoxFuture<'static, BitmapResult<Bitmap>>;
}

/// Decodes PNG data URLs synchronously; the future is ready on first poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlDecoder;

impl ImageDecoder for DataUrlDecoder {
    fn decode(&self, src: &str) -> BoxFuture<'static, BitmapResult<Bitmap>> {
        Box::pin(std::future::ready(Bitmap::from_data_url(src)))
    }
}
