//! Surface snapshot encoding.
//!
//! A snapshot is a PNG of the whole surface wrapped in a `data:` URL, the
//! same shape a browser canvas produces with `toDataURL()`. That keeps it
//! self-contained and safe to embed in JSON messages.

use crate::surface::ImageData;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix every encoded snapshot starts with.
pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// An encoded capture of a full surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceSnapshot(String);

impl SurfaceSnapshot {
    /// Wrap an already-encoded string without validating it.
    ///
    /// Used for entries received from the network; they are validated when
    /// decoded.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded data URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Snapshot encoding and decoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("missing data URL prefix")]
    MissingPrefix,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("PNG decoding failed: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("unsupported pixel format: {0:?} at {1:?}")]
    UnsupportedFormat(png::ColorType, png::BitDepth),
    #[error("pixel buffer is {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Encode a full surface into a snapshot.
pub fn encode(image: &ImageData) -> Result<SurfaceSnapshot, CodecError> {
    let expected = image.width as usize * image.height as usize * 4;
    if image.data.len() != expected {
        return Err(CodecError::BufferSize {
            expected,
            actual: image.data.len(),
        });
    }

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, image.width, image.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.data)?;
        writer.finish()?;
    }

    let mut encoded = String::with_capacity(DATA_URL_PREFIX.len() + png_data.len() * 4 / 3 + 4);
    encoded.push_str(DATA_URL_PREFIX);
    STANDARD.encode_string(&png_data, &mut encoded);
    Ok(SurfaceSnapshot(encoded))
}

/// Decode a snapshot back into RGBA pixels.
pub fn decode(snapshot: &SurfaceSnapshot) -> Result<ImageData, CodecError> {
    let payload = snapshot
        .as_str()
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or(CodecError::MissingPrefix)?;
    let bytes = STANDARD.decode(payload)?;

    let decoder = png::Decoder::new(bytes.as_slice());
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    let data = match (info.color_type, info.bit_depth) {
        (png::ColorType::Rgba, png::BitDepth::Eight) => buf,
        (png::ColorType::Rgb, png::BitDepth::Eight) => buf
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        (color, depth) => return Err(CodecError::UnsupportedFormat(color, depth)),
    };

    Ok(ImageData {
        width: info.width,
        height: info.height,
        data,
    })
}
