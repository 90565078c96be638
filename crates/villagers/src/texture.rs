//! Decoded texture handles shared between caches and billboards.

use std::sync::Arc;

use image::RgbaImage;

/// Where a texture came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureOrigin {
    /// Supplied by a texture pack.
    Custom,
    /// Read from the game's own archive.
    Vanilla,
    /// Nothing was found; zero-size stand-in.
    Missing,
}

/// A decoded texture. Pixel data is optional so hosts can keep GPU-side copies only.
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub origin: TextureOrigin,
    pub pixels: Option<RgbaImage>,
}

pub type TextureHandle = Arc<Texture>;

impl Texture {
    pub fn new(name: impl Into<String>, width: u32, height: u32, origin: TextureOrigin) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            origin,
            pixels: None,
        }
    }

    pub fn from_image(name: impl Into<String>, image: RgbaImage, origin: TextureOrigin) -> Self {
        Self {
            name: name.into(),
            width: image.width(),
            height: image.height(),
            origin,
            pixels: Some(image),
        }
    }

    pub fn missing(name: impl Into<String>) -> TextureHandle {
        Arc::new(Self::new(name, 0, 0, TextureOrigin::Missing))
    }

    pub fn is_custom(&self) -> bool {
        self.origin == TextureOrigin::Custom
    }
}
