//! Texture-pack asset providers, looked up by canonical image name.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::texture::{Texture, TextureHandle, TextureOrigin};

/// Source of custom textures keyed by image name.
pub trait AssetProvider: Send + Sync {
    /// True only when `get_asset` would return the texture.
    fn has_asset(&self, name: &str) -> bool;
    fn get_asset(&self, name: &str) -> Option<TextureHandle>;
}

/// Assets registered directly by the host, or by tests.
#[derive(Debug, Default)]
pub struct InMemoryAssets {
    textures: HashMap<String, TextureHandle>,
    fetches: AtomicUsize,
}

impl InMemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom texture of the given size.
    pub fn insert(&mut self, name: impl Into<String>, width: u32, height: u32) {
        let name = name.into();
        let texture = Texture::new(name.clone(), width, height, TextureOrigin::Custom);
        self.textures.insert(name, Arc::new(texture));
    }

    pub fn with(mut self, name: impl Into<String>, width: u32, height: u32) -> Self {
        self.insert(name, width, height);
        self
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Number of `get_asset` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl AssetProvider for InMemoryAssets {
    fn has_asset(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    fn get_asset(&self, name: &str) -> Option<TextureHandle> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.textures.get(name).cloned()
    }
}

/// PNG files under a texture-pack directory, named `<image name>.png`.
/// Files are indexed on scan and decoded on first use. A file that fails to
/// decode counts as absent from then on.
#[derive(Debug)]
pub struct DirectoryAssets {
    root: PathBuf,
    index: HashMap<String, PathBuf>,
    decoded: Mutex<HashMap<String, Option<TextureHandle>>>,
}

impl DirectoryAssets {
    pub fn scan(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut index = HashMap::new();
        collect_pngs(&root, &mut index)?;
        log::info!("Indexed {} texture(s) under {:?}", index.len(), root);
        Ok(Self {
            root,
            index,
            decoded: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn collect_pngs(dir: &Path, index: &mut HashMap<String, PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_pngs(&path, index)?;
            continue;
        }
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if !is_png {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if let Some(previous) = index.insert(stem.to_string(), path.clone()) {
                log::warn!("Texture {} found twice, using {:?} over {:?}", stem, path, previous);
            }
        }
    }
    Ok(())
}

impl AssetProvider for DirectoryAssets {
    fn has_asset(&self, name: &str) -> bool {
        self.index.contains_key(name) && self.get_asset(name).is_some()
    }

    fn get_asset(&self, name: &str) -> Option<TextureHandle> {
        let path = self.index.get(name)?;
        let mut decoded = self.decoded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(texture) = decoded.get(name) {
            return texture.clone();
        }
        let texture = match image::open(path) {
            Ok(img) => Some(Arc::new(Texture::from_image(name, img.to_rgba8(), TextureOrigin::Custom))),
            Err(e) => {
                log::error!("Failed to decode texture {} at {:?}: {}", name, path, e);
                None
            }
        };
        decoded.insert(name.to_string(), texture.clone());
        texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_lookup_and_fetch_count() {
        let assets = InMemoryAssets::new().with("396.158.1_0-0", 32, 64);
        assert!(assets.has_asset("396.158.1_0-0"));
        assert!(!assets.has_asset("396.158.0_0-0"));
        let tex = assets.get_asset("396.158.1_0-0").expect("texture");
        assert_eq!((tex.width, tex.height), (32, 64));
        assert!(tex.is_custom());
        assert!(assets.get_asset("missing").is_none());
        assert_eq!(assets.fetch_count(), 2);
    }

    #[test]
    fn directory_scan_indexes_and_decodes_pngs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("villagers").join("396");
        fs::create_dir_all(&nested).expect("mkdir");
        image::RgbaImage::new(4, 8)
            .save(nested.join("396.158.1_0-0.png"))
            .expect("write png");
        fs::write(dir.path().join("notes.txt"), "not a texture").expect("write txt");

        let assets = DirectoryAssets::scan(dir.path()).expect("scan");
        assert_eq!(assets.len(), 1);
        assert!(assets.has_asset("396.158.1_0-0"));
        let tex = assets.get_asset("396.158.1_0-0").expect("decode");
        assert_eq!((tex.width, tex.height), (4, 8));
        let again = assets.get_asset("396.158.1_0-0").expect("memoised");
        assert!(Arc::ptr_eq(&tex, &again));
    }

    #[test]
    fn undecodable_pngs_count_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("396.158.1_0-0.png"), b"not really a png").expect("write broken");
        image::RgbaImage::new(2, 2)
            .save(dir.path().join("396.158.0_0-0.png"))
            .expect("write png");

        let assets = DirectoryAssets::scan(dir.path()).expect("scan");
        assert_eq!(assets.len(), 2);
        assert!(!assets.has_asset("396.158.1_0-0"));
        assert!(assets.get_asset("396.158.1_0-0").is_none());

        let id = crate::resolver::AssetIdentity::new(396, 158, 1, "", "");
        let resolution = crate::resolver::resolve_variant(&assets, &id).expect("resolved");
        assert_eq!(resolution.key(), "396.158.0_0-0");
    }
}
