//! Cancellable, incremental loader for delta-encoded mesh layers.
//!
//! A layer is described by a small JSON descriptor that lists draw groups,
//! each with a material, a set of named draw ranges, and the locations of its
//! encoded index and vertex buffers. The loader fetches and decodes every
//! layer of a session on a worker thread, assigns each draw primitive a unique
//! selection color, and hands finished layers to the consumer one at a time.
//!
//! # Design principles
//!
//! - **Pluggable I/O**: bytes come from a [`ResourceStore`], images from a
//!   [`TextureProvider`], and results leave through a [`Dispatcher`]
//! - **Cooperative cancellation**: the worker polls a [`CancellationToken`]
//!   between fetches and decode requests
//! - **Results by value**: each [`LayerResult`] owns its buffers and a frozen
//!   copy of the color map
//!
//! # Example
//!
//! ```ignore
//! use layerpack::{LayerSpec, LayersLoader, LocatorMap, MemoryStore, NoTextures, ResourceId};
//!
//! let loader = LayersLoader::new(MemoryStore::new(), NoTextures, LocatorMap::new());
//! let (dispatcher, results) = layerpack::channel();
//! let session = loader.spawn(vec![LayerSpec::new(1, ResourceId(100))], dispatcher)?;
//!
//! while let Ok(layer) = results.recv_blocking() {
//!     println!("layer {} ready", layer.layer_id());
//! }
//! let report = session.join()?;
//! ```

pub mod cancel;
pub mod colors;
pub mod descriptor;
pub mod dispatch;
mod error;
pub mod loader;
pub mod locator;
pub mod options;
pub mod store;
pub mod texture;
pub mod types;

pub use cancel::{CancellationToken, Cancelled};
pub use colors::{ColorAllocator, ColorMapSnapshot, MAX_COLOR_INDEX, SelectionColorMap};
pub use descriptor::{
    CompiledLayer, ConfigSource, DecodeRequest, FetchPlan, GroupDescriptor, JsonConfigSource,
    compile_layer,
};
pub use dispatch::{ChannelDispatcher, Dispatcher, channel};
pub use error::{ConfigError, DescriptorError, Error, FetchError, Result, TextureError};
pub use loader::{LayerTimings, LayersLoader, SessionHandle, SessionReport, SessionState};
pub use locator::{LocatorMap, LocatorTable};
pub use options::{LoaderOptions, WordEncoding};
pub use store::{DirectoryStore, MemoryStore, ResourceStore};
pub use texture::{Image, NoTextures, StoreTextureProvider, TextureProvider};
pub use types::{
    DrawGroup, DrawPrimitive, FileLocator, LayerResult, LayerSpec, Material, ResourceId,
};

// Re-export the codec for callers that encode their own buffers.
pub use layerpack_decode as decode;
