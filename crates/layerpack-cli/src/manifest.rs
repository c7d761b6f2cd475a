//! The JSON manifest describing a loading session.
//!
//! ```json
//! {
//!   "root": "assets",
//!   "resources": { "1": "layer1.json", "10": "mesh.bin", "20": "skin.pkm" },
//!   "locators": { "mesh_idx": { "source": 10, "offset": 0, "length": 36 } },
//!   "textures": { "skin.pkm": 20 },
//!   "layers": [{ "layer_id": 1, "source": 1 }],
//!   "options": { "scratch_len": 8192, "word_encoding": "utf8" }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use layerpack::{
    DirectoryStore, LayerSpec, LoaderOptions, LocatorMap, ResourceId, ResourceStore,
    StoreTextureProvider,
};
use serde::Deserialize;

/// A manifest could not be loaded.
#[derive(Debug)]
pub enum ManifestError {
    /// The file could not be read.
    Io { path: PathBuf, message: String },
    /// The file is not a valid manifest.
    Parse { detail: String },
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Io { path, message } => {
                write!(f, "failed to read manifest {}: {message}", path.display())
            }
            ManifestError::Parse { detail } => write!(f, "invalid manifest: {detail}"),
        }
    }
}

impl std::error::Error for ManifestError {}

/// Everything needed to run one session from files on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Directory resource paths are relative to. Relative roots resolve
    /// against the manifest's own directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Resource id to file path.
    pub resources: BTreeMap<u32, PathBuf>,
    /// Buffer key to encoded span.
    #[serde(default)]
    pub locators: LocatorMap,
    /// Texture name to resource id.
    #[serde(default)]
    pub textures: BTreeMap<String, u32>,
    /// Layers in load order.
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub options: LoaderOptions,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut manifest = Self::from_json(&text)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.root = Some(match manifest.root.take() {
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        });
        Ok(manifest)
    }

    /// Parse manifest text.
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(text).map_err(|e| ManifestError::Parse {
            detail: e.to_string(),
        })
    }

    /// Build a store serving every listed resource.
    #[must_use]
    pub fn store(&self) -> DirectoryStore {
        let root = self.root.clone().unwrap_or_else(|| PathBuf::from("."));
        self.resources
            .iter()
            .fold(DirectoryStore::new(root), |store, (&id, path)| {
                store.with_file(ResourceId(id), path)
            })
    }

    /// Build a texture provider for the listed textures.
    #[must_use]
    pub fn texture_provider<S: ResourceStore>(&self, store: S) -> StoreTextureProvider<S> {
        self.textures
            .iter()
            .fold(StoreTextureProvider::new(store), |provider, (name, &id)| {
                provider.with_texture(name, ResourceId(id))
            })
    }
}
