//! Decoded textures and the registry that shares them.
//!
//! A texture file referenced by many materials is decoded once. The registry
//! key is the canonicalized path, so `a/../a/tex.png` and `a/tex.png` resolve
//! to the same [`Texture`]. GPU upload happens lazily in the backend, keyed by
//! [`Texture::id`].

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use image::RgbaImage;

use crate::resources::texture::load_image;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Normal,
    Bump,
    Reflection,
    Skybox,
}

impl TextureKind {
    /// Colour textures are stored in sRGB, data textures linear.
    pub fn is_srgb(&self) -> bool {
        matches!(self, TextureKind::Diffuse | TextureKind::Skybox)
    }
}

#[derive(Debug)]
pub struct Texture {
    pub id: u32,
    pub path: PathBuf,
    pub kind: TextureKind,
    /// `None` when the file could not be read or decoded.
    pub image: Option<RgbaImage>,
}

impl Texture {
    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }
}

#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: HashMap<PathBuf, Rc<Texture>>,
    next_id: u32,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    pub fn get(&self, path: &Path) -> Option<Rc<Texture>> {
        self.textures.get(&Self::key(path)).cloned()
    }

    /// Returns the shared texture for `path`, decoding it on first use.
    ///
    /// A file that cannot be decoded is logged and registered without pixel
    /// data, so the same failure is not reported for every material using it.
    pub fn load_texture(&mut self, path: &Path, kind: TextureKind) -> Rc<Texture> {
        let key = Self::key(path);
        if let Some(texture) = self.textures.get(&key) {
            return texture.clone();
        }
        let image = match load_image(&key) {
            Ok(image) => Some(image),
            Err(e) => {
                log::error!("Texture {:?} could not be loaded: {:#}", path, e);
                None
            }
        };
        self.register(key, kind, image)
    }

    /// Registers pixels that did not come from a standalone file, e.g. images
    /// embedded in a glTF binary. `key` only has to be unique.
    pub fn insert_decoded(
        &mut self,
        key: impl Into<PathBuf>,
        kind: TextureKind,
        image: Option<RgbaImage>,
    ) -> Rc<Texture> {
        let key = key.into();
        if let Some(texture) = self.textures.get(&key) {
            return texture.clone();
        }
        self.register(key, kind, image)
    }

    fn register(&mut self, key: PathBuf, kind: TextureKind, image: Option<RgbaImage>) -> Rc<Texture> {
        let texture = Rc::new(Texture {
            id: self.next_id,
            path: key.clone(),
            kind,
            image,
        });
        self.next_id += 1;
        self.textures.insert(key, texture.clone());
        texture
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Texture>> {
        self.textures.values()
    }

    /// Drops the registry's handles. Materials still holding one keep it alive.
    pub fn clear(&mut self) {
        self.textures.clear();
    }
}
