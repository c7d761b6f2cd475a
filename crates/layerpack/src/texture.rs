//! Material image resolution.
//!
//! Draw groups reference either a named texture or a flat diffuse color. A
//! [`TextureProvider`] turns either into the image type the consumer uploads.
//! Decoding compressed texture payloads is left to the consumer.

use std::collections::HashMap;

use glam::Vec3;

use crate::error::TextureError;
use crate::store::ResourceStore;
use crate::types::{Material, ResourceId};

/// Resolves materials into images.
pub trait TextureProvider {
    /// The image handle produced for the consumer.
    type Image: Send + 'static;

    /// Resolve a named texture.
    fn resolve_texture(&self, name: &str) -> Result<Self::Image, TextureError>;

    /// Build a 1x1 image of a flat color.
    fn resolve_color(&self, color: Vec3) -> Result<Self::Image, TextureError>;

    /// Resolve whichever source `material` names.
    fn resolve(&self, material: &Material) -> Result<Self::Image, TextureError> {
        match material {
            Material::Texture(name) => self.resolve_texture(name),
            Material::DiffuseColor(color) => self.resolve_color(*color),
        }
    }
}

/// A provider that resolves every material to `()`.
///
/// Useful when only geometry and selection colors are needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextures;

impl TextureProvider for NoTextures {
    type Image = ();

    fn resolve_texture(&self, _name: &str) -> Result<(), TextureError> {
        Ok(())
    }

    fn resolve_color(&self, _color: Vec3) -> Result<(), TextureError> {
        Ok(())
    }
}

/// An image ready to hand to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Image {
    /// The raw bytes of a compressed texture file (e.g. ETC1 `.pkm`).
    Compressed(Vec<u8>),
    /// Uncompressed RGB565 pixels, row-major.
    Rgb565 {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// One packed pixel per entry.
        pixels: Vec<u16>,
    },
}

/// Pack a `[0, 1]` RGB color into an RGB565 pixel.
///
/// Components are first rounded to 8 bits, then truncated to 5/6/5 bits.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rgb565(color: Vec3) -> u16 {
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u16;
    let (r, g, b) = (to_byte(color.x), to_byte(color.y), to_byte(color.z));
    ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3)
}

/// Resolves textures by name from a resource store.
///
/// Names are matched case-insensitively. Flat colors become 1x1 RGB565
/// images.
#[derive(Debug, Clone)]
pub struct StoreTextureProvider<S> {
    store: S,
    names: HashMap<String, ResourceId>,
}

impl<S: ResourceStore> StoreTextureProvider<S> {
    /// Create a provider with no registered textures.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            names: HashMap::new(),
        }
    }

    /// Register the resource holding texture `name`.
    #[must_use]
    pub fn with_texture(mut self, name: &str, id: ResourceId) -> Self {
        self.insert(name, id);
        self
    }

    /// Register the resource holding texture `name`.
    pub fn insert(&mut self, name: &str, id: ResourceId) {
        self.names.insert(name.to_lowercase(), id);
    }
}

impl<S: ResourceStore> TextureProvider for StoreTextureProvider<S> {
    type Image = Image;

    fn resolve_texture(&self, name: &str) -> Result<Image, TextureError> {
        let missing = || TextureError::MissingAsset {
            name: name.to_string(),
        };
        let id = self.names.get(&name.to_lowercase()).ok_or_else(missing)?;
        let bytes = self.store.fetch_bytes(*id).map_err(|e| {
            tracing::debug!(texture = name, error = %e, "texture fetch failed");
            missing()
        })?;
        Ok(Image::Compressed(bytes))
    }

    fn resolve_color(&self, color: Vec3) -> Result<Image, TextureError> {
        Ok(Image::Rgb565 {
            width: 1,
            height: 1,
            pixels: vec![rgb565(color)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_rgb565() {
        assert_eq!(rgb565(Vec3::ZERO), 0);
        assert_eq!(rgb565(Vec3::ONE), 0xFFFF);
        assert_eq!(rgb565(Vec3::new(1.0, 0.0, 0.0)), 0xF800);
        assert_eq!(rgb565(Vec3::new(0.0, 1.0, 0.0)), 0x07E0);
        assert_eq!(rgb565(Vec3::new(0.0, 0.0, 1.0)), 0x001F);
        // 0.5 rounds to 128: 128 >> 3 = 16, 128 >> 2 = 32.
        assert_eq!(rgb565(Vec3::splat(0.5)), (16 << 11) | (32 << 5) | 16);
        // Out-of-range components clamp.
        assert_eq!(rgb565(Vec3::new(2.0, -1.0, 0.0)), 0xF800);
    }

    #[test]
    fn test_store_provider_texture_case_insensitive() {
        let store = MemoryStore::new();
        store.insert(ResourceId(9), vec![0xAB, 0xCD]);
        let provider = StoreTextureProvider::new(store).with_texture("Skin.PKM", ResourceId(9));

        let image = provider.resolve_texture("skin.pkm").unwrap();
        assert_eq!(image, Image::Compressed(vec![0xAB, 0xCD]));
        assert!(provider.resolve_texture("SKIN.pkm").is_ok());
    }

    #[test]
    fn test_store_provider_missing() {
        let store = MemoryStore::new();
        let provider = StoreTextureProvider::new(store).with_texture("gone.pkm", ResourceId(1));

        // Registered but absent from the store.
        assert_eq!(
            provider.resolve_texture("gone.pkm"),
            Err(TextureError::MissingAsset {
                name: "gone.pkm".to_string()
            })
        );
        // Never registered.
        assert!(provider.resolve_texture("other.pkm").is_err());
    }

    #[test]
    fn test_resolve_material() {
        let provider = StoreTextureProvider::new(MemoryStore::new());
        let image = provider
            .resolve(&Material::DiffuseColor(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(
            image,
            Image::Rgb565 {
                width: 1,
                height: 1,
                pixels: vec![0xF800]
            }
        );
    }
}
