// consent-flow-render/src/images.rs
// ============================================================================
// Module: Embedded Images
// Description: Decoding of data URLs into PDF image XObjects.
// Purpose: Embed signatures and ID photos with their transparency intact.
// Dependencies: consent-flow-core, image, lopdf
// ============================================================================

//! ## Overview
//! Images arrive as base64 data URLs. They are decoded to 8-bit RGB with an
//! optional 8-bit soft mask so transparent signature strokes print cleanly
//! over the page. Decoding failures are reported as strings and become
//! placeholder text in the rendered document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use consent_flow_core::DataUrl;
use image::DynamicImage;
use lopdf::Document;
use lopdf::ObjectId;
use lopdf::Stream;
use lopdf::dictionary;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Decoded raster ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Packed RGB samples.
    pub rgb: Vec<u8>,
    /// Alpha samples when any pixel is not fully opaque.
    pub alpha: Option<Vec<u8>>,
}

impl DecodedImage {
    /// Decodes a data URL holding a PNG or JPEG image.
    ///
    /// # Errors
    ///
    /// Returns a message when the URL or the image bytes are unreadable.
    pub fn from_data_url(data_url: &str) -> Result<Self, String> {
        let parsed = DataUrl::parse(data_url).map_err(|err| err.to_string())?;
        if !parsed.is_image() {
            return Err(format!("unsupported media type {}", parsed.mime_type));
        }
        Self::from_bytes(&parsed.bytes)
    }

    /// Decodes raw PNG or JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns a message when the bytes are not a supported image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let image = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
        Ok(Self::from_image(&image))
    }

    /// Splits a decoded image into colour and alpha planes.
    fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
        let mut alpha = Vec::with_capacity(rgba.len() / 4);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }
        let opaque = alpha.iter().all(|value| *value == u8::MAX);
        Self {
            width,
            height,
            rgb,
            alpha: if opaque { None } else { Some(alpha) },
        }
    }

    /// Adds the image and its soft mask to `document`, returning the image id.
    pub fn embed(&self, document: &mut Document) -> ObjectId {
        let width = i64::from(self.width);
        let height = i64::from(self.height);
        let mask = self.alpha.as_ref().map(|alpha| {
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8_i64,
                },
                alpha.clone(),
            );
            document.add_object(stream)
        });
        let mut info = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
        };
        if let Some(mask) = mask {
            info.set("SMask", mask);
        }
        document.add_object(Stream::new(info, self.rgb.clone()))
    }
}
