//! Core data types for decoded layers.
//!
//! These types carry decoded geometry from the loader to the consumer.
//! Everything inside a [`LayerResult`] is owned by value; nothing in it is
//! shared with the loader that produced it.

use std::fmt;
use std::ops::Range;

use glam::Vec3;
use layerpack_decode::vertex_count;
use serde::{Deserialize, Serialize};

use crate::colors::ColorMapSnapshot;

/// Identifier of a resource in a [`ResourceStore`](crate::ResourceStore).
///
/// Layer descriptors, encoded buffer files, and textures share one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A contiguous span of encoded words inside a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocator {
    /// The resource holding the encoded stream.
    #[serde(alias = "file")]
    pub source: ResourceId,
    /// First word of the span.
    #[serde(alias = "start")]
    pub offset: usize,
    /// Number of words in the span.
    pub length: usize,
}

impl FileLocator {
    /// Create a new locator.
    #[must_use]
    pub fn new(source: ResourceId, offset: usize, length: usize) -> Self {
        Self {
            source,
            offset,
            length,
        }
    }
}

/// One selectable primitive inside a draw group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawPrimitive {
    /// Name of the geometry this primitive draws.
    pub geometry: String,
    /// First index in the group's index buffer.
    pub index_offset: usize,
    /// Number of indices drawn.
    pub index_count: usize,
}

impl DrawPrimitive {
    /// The primitive's span within its group's index buffer.
    ///
    /// The end saturates at `usize::MAX`.
    #[must_use]
    pub fn index_range(&self) -> Range<usize> {
        self.index_offset..self.index_offset.saturating_add(self.index_count)
    }
}

/// The single surface source of a draw group.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// A named texture asset.
    Texture(String),
    /// A flat RGB color with components in `[0, 1]`.
    DiffuseColor(Vec3),
}

/// A batch of primitives sharing one material and one vertex/index buffer pair.
#[derive(Debug, Clone)]
pub struct DrawGroup<I> {
    /// Texture name or flat color.
    pub material: Material,
    /// Image resolved for the material, if the provider found one.
    pub image: Option<I>,
    /// Primitives in declaration order.
    pub primitives: Vec<DrawPrimitive>,
    /// Decoded index buffer.
    pub indices: Vec<u16>,
    /// Decoded interleaved vertex buffer (8 components per vertex).
    pub vertices: Vec<i16>,
    /// Selection color index per vertex.
    pub colors: Vec<u16>,
    /// Index count declared by the descriptor.
    pub total_index_count: usize,
}

impl<I> DrawGroup<I> {
    /// Number of vertices in the vertex buffer.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        vertex_count(self.vertices.len())
    }
}

/// A layer to load: its id and the resource holding its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Caller-chosen layer id, echoed in the result.
    pub layer_id: u32,
    /// Resource containing the layer descriptor text.
    pub source: ResourceId,
}

impl LayerSpec {
    /// Create a new layer spec.
    #[must_use]
    pub fn new(layer_id: u32, source: ResourceId) -> Self {
        Self { layer_id, source }
    }
}

/// The decoded data for one loaded layer.
#[derive(Debug)]
pub struct LayerResult<I> {
    layer_id: u32,
    draw_groups: Vec<DrawGroup<I>>,
    color_map: ColorMapSnapshot,
    max_color_index: u16,
    is_final_layer: bool,
}

impl<I> LayerResult<I> {
    pub(crate) fn new(
        layer_id: u32,
        draw_groups: Vec<DrawGroup<I>>,
        color_map: ColorMapSnapshot,
        is_final_layer: bool,
    ) -> Self {
        Self {
            layer_id,
            draw_groups,
            max_color_index: color_map.max_index(),
            color_map,
            is_final_layer,
        }
    }

    /// The layer id from the [`LayerSpec`].
    #[must_use]
    pub fn layer_id(&self) -> u32 {
        self.layer_id
    }

    /// The layer's draw groups.
    #[must_use]
    pub fn draw_groups(&self) -> &[DrawGroup<I>] {
        &self.draw_groups
    }

    /// Take ownership of the draw groups.
    #[must_use]
    pub fn into_draw_groups(self) -> Vec<DrawGroup<I>> {
        self.draw_groups
    }

    /// Selection colors of all layers loaded so far.
    #[must_use]
    pub fn color_map(&self) -> &ColorMapSnapshot {
        &self.color_map
    }

    /// The highest color index allocated so far (0 if none).
    #[must_use]
    pub fn max_color_index(&self) -> u16 {
        self.max_color_index
    }

    /// Whether this was the last layer in the requested order.
    #[must_use]
    pub fn is_final_layer(&self) -> bool {
        self.is_final_layer
    }
}
