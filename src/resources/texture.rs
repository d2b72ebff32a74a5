//! Placeholder texture data
//!
//! Tiny generated images substituted into material slots that have no real
//! texture assigned. Asset decoding lives outside this crate; everything
//! here is produced in code.

use crate::backend::traits::{BackendResult, GraphicsBackend, ImageHandle};
use crate::backend::types::{ImageDescriptor, TextureFormat, TextureUsage};

/// CPU-side pixel data for a small generated texture.
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
    pub label: &'static str,
}

impl TextureData {
    /// Create a 1x1 solid color texture
    pub fn solid_color(color: [u8; 4], label: &'static str) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8UnormSrgb,
            pixels: color.to_vec(),
            label,
        }
    }

    /// Create a default white texture
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    /// Create a default black texture
    pub fn black() -> Self {
        Self::solid_color([0, 0, 0, 255], "black")
    }

    /// Create a default normal map (pointing up)
    pub fn flat_normal() -> Self {
        // Normal pointing up: (0, 0, 1) in tangent space
        // Encoded as RGB: (0.5, 0.5, 1.0) * 255 = (128, 128, 255)
        let mut data = Self::solid_color([128, 128, 255, 255], "flat_normal");
        // Normal vectors are linear data, not sRGB.
        data.format = TextureFormat::Rgba8Unorm;
        data
    }

    /// Create a checkerboard texture with 8x8 pixel cells
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                pixels.extend_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            format: TextureFormat::Rgba8UnormSrgb,
            pixels,
            label: "checkerboard",
        }
    }

    /// Create and upload the image to the backend
    pub fn upload<B: GraphicsBackend>(&self, backend: &mut B) -> BackendResult<ImageHandle> {
        backend.create_image(
            &ImageDescriptor {
                label: self.label,
                width: self.width,
                height: self.height,
                format: self.format,
                usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
            },
            &self.pixels,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessBackend;

    #[test]
    fn test_solid_color_is_one_pixel() {
        let white = TextureData::white();
        assert_eq!((white.width, white.height), (1, 1));
        assert_eq!(white.pixels, vec![255, 255, 255, 255]);
    }

    #[test]
    fn test_flat_normal_encodes_up_vector_linearly() {
        let normal = TextureData::flat_normal();
        assert_eq!(normal.pixels, vec![128, 128, 255, 255]);
        assert_eq!(normal.format, TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn test_checkerboard_alternates_cells() {
        let tex = TextureData::checkerboard(16, [255, 0, 255, 255], [0, 0, 0, 255]);
        assert_eq!(tex.pixels.len(), 16 * 16 * 4);
        // Top-left cell uses color1, the cell to its right color2.
        assert_eq!(&tex.pixels[0..4], &[255, 0, 255, 255]);
        let right_cell = (8 * 4) as usize;
        assert_eq!(&tex.pixels[right_cell..right_cell + 4], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_upload_creates_backend_image() {
        let mut backend = HeadlessBackend::new();
        let handle = TextureData::black().upload(&mut backend).unwrap();
        assert!(handle.is_valid());
        assert_eq!(backend.image_creations(), 1);
    }
}
