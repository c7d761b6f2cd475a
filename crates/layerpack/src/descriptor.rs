//! Layer descriptor compilation.
//!
//! A layer descriptor lists draw groups, each with a material, the draws
//! (primitives) it contains, and keys naming its encoded index and vertex
//! buffers:
//!
//! ```json
//! {
//!   "draw_groups": [{
//!     "texture": "skin.pkm",
//!     "draws": [{ "geometry": "femur", "range": [0, 36] }],
//!     "indices": "skin_idx",
//!     "attribs": "skin_att",
//!     "numIndices": 36
//!   }]
//! }
//! ```
//!
//! Compiling a descriptor yields one [`GroupDescriptor`] per draw group and a
//! [`FetchPlan`] that batches decode requests by source resource, so a file
//! shared by many groups is fetched once.

use std::collections::HashMap;

use glam::Vec3;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConfigError, DescriptorError};
use crate::locator::LocatorTable;
use crate::types::{DrawPrimitive, FileLocator, Material, ResourceId};

/// Parses raw descriptor text into a generic field tree.
pub trait ConfigSource {
    /// Parse one layer's descriptor text.
    fn parse_layer(&self, raw: &str) -> Result<Value, ConfigError>;
}

/// A [`ConfigSource`] for JSON descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConfigSource;

impl ConfigSource for JsonConfigSource {
    fn parse_layer(&self, raw: &str) -> Result<Value, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::MalformedInput {
            detail: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LayerRecord {
    draw_groups: Vec<DrawGroupRecord>,
}

#[derive(Debug, Deserialize)]
struct DrawGroupRecord {
    texture: Option<String>,
    diffuse_color: Option<[f32; 3]>,
    draws: Vec<DrawRecord>,
    indices: String,
    attribs: String,
    #[serde(rename = "numIndices")]
    num_indices: usize,
}

#[derive(Debug, Deserialize)]
struct DrawRecord {
    geometry: String,
    range: (usize, usize),
}

/// A draw group as described by the layer, before its buffers are decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDescriptor {
    /// Texture name or flat color.
    pub material: Material,
    /// Primitives in declaration order.
    pub primitives: Vec<DrawPrimitive>,
    /// Declared length of the index buffer.
    pub total_index_count: usize,
}

/// A pending decode of one encoded span into one draw group's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRequest {
    /// Decode the group's index buffer.
    Indices {
        /// Position of the target group in the layer.
        group: usize,
        /// Where the encoded indices live.
        locator: FileLocator,
    },
    /// Decode the group's interleaved vertex attributes.
    Attributes {
        /// Position of the target group in the layer.
        group: usize,
        /// Where the encoded attributes live.
        locator: FileLocator,
    },
}

impl DecodeRequest {
    /// Position of the target group in the layer.
    #[must_use]
    pub fn group(&self) -> usize {
        match self {
            DecodeRequest::Indices { group, .. } | DecodeRequest::Attributes { group, .. } => {
                *group
            }
        }
    }

    /// Where the encoded data lives.
    #[must_use]
    pub fn locator(&self) -> FileLocator {
        match self {
            DecodeRequest::Indices { locator, .. } | DecodeRequest::Attributes { locator, .. } => {
                *locator
            }
        }
    }

    /// Short name of the buffer kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeRequest::Indices { .. } => "indices",
            DecodeRequest::Attributes { .. } => "attribs",
        }
    }
}

/// Decode requests grouped by the resource they read from.
///
/// Sources are kept in the order they were first referenced; requests for a
/// source keep the order they were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPlan {
    order: Vec<ResourceId>,
    requests: HashMap<ResourceId, Vec<DecodeRequest>>,
}

impl FetchPlan {
    /// Create an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request behind any existing requests for the same source.
    pub fn push(&mut self, request: DecodeRequest) {
        let source = request.locator().source;
        self.requests
            .entry(source)
            .or_insert_with(|| {
                self.order.push(source);
                Vec::new()
            })
            .push(request);
    }

    /// Distinct sources in first-seen order.
    #[must_use]
    pub fn sources(&self) -> &[ResourceId] {
        &self.order
    }

    /// Requests queued for `source`.
    #[must_use]
    pub fn requests(&self, source: ResourceId) -> &[DecodeRequest] {
        self.requests.get(&source).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the plan has no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total number of queued requests.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.values().map(Vec::len).sum()
    }

    /// Consume the plan, yielding each source once with its requests.
    pub fn into_batches(self) -> impl Iterator<Item = (ResourceId, Vec<DecodeRequest>)> {
        let FetchPlan {
            order,
            mut requests,
        } = self;
        order.into_iter().map(move |source| {
            let batch = requests.remove(&source).unwrap_or_default();
            (source, batch)
        })
    }
}

/// The compiled form of one layer descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLayer {
    /// One descriptor per draw group, in layer order.
    pub groups: Vec<GroupDescriptor>,
    /// Decode requests batched by source.
    pub plan: FetchPlan,
}

/// Compile a parsed layer descriptor.
///
/// Every draw group contributes an index request and an attribute request to
/// the plan.
///
/// # Errors
///
/// Returns a [`DescriptorError`] if any record is malformed, a group has no
/// single material, a draw range exceeds `numIndices`, or a buffer key is not
/// in `locators`.
pub fn compile_layer(
    tree: &Value,
    locators: &impl LocatorTable,
) -> Result<CompiledLayer, DescriptorError> {
    let record = LayerRecord::deserialize(tree).map_err(|e| DescriptorError::Malformed {
        detail: e.to_string(),
    })?;

    let mut groups = Vec::with_capacity(record.draw_groups.len());
    let mut plan = FetchPlan::new();

    for (position, group) in record.draw_groups.into_iter().enumerate() {
        let material = match (group.texture, group.diffuse_color) {
            (Some(name), None) => Material::Texture(name),
            (None, Some(rgb)) => Material::DiffuseColor(Vec3::from_array(rgb)),
            _ => return Err(DescriptorError::Material { group: position }),
        };

        let mut primitives = Vec::with_capacity(group.draws.len());
        for (draw, record) in group.draws.into_iter().enumerate() {
            let (offset, count) = record.range;
            if offset
                .checked_add(count)
                .is_none_or(|end| end > group.num_indices)
            {
                return Err(DescriptorError::RangeOutOfBounds {
                    group: position,
                    draw,
                    offset,
                    count,
                    num_indices: group.num_indices,
                });
            }
            primitives.push(DrawPrimitive {
                geometry: record.geometry,
                index_offset: offset,
                index_count: count,
            });
        }

        let resolve = |key: String| {
            locators
                .locator(&key)
                .ok_or(DescriptorError::UnknownLocator {
                    group: position,
                    key,
                })
        };
        plan.push(DecodeRequest::Indices {
            group: position,
            locator: resolve(group.indices)?,
        });
        plan.push(DecodeRequest::Attributes {
            group: position,
            locator: resolve(group.attribs)?,
        });

        groups.push(GroupDescriptor {
            material,
            primitives,
            total_index_count: group.num_indices,
        });
    }

    Ok(CompiledLayer { groups, plan })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::LocatorMap;
    use serde_json::json;

    fn locators() -> LocatorMap {
        let mut map = LocatorMap::new();
        map.insert("a_idx", FileLocator::new(ResourceId(10), 0, 6));
        map.insert("a_att", FileLocator::new(ResourceId(11), 0, 32));
        map.insert("b_idx", FileLocator::new(ResourceId(10), 6, 3));
        map.insert("b_att", FileLocator::new(ResourceId(11), 32, 24));
        map
    }

    fn two_groups() -> Value {
        json!({
            "draw_groups": [
                {
                    "texture": "skin.pkm",
                    "draws": [
                        { "geometry": "femur", "range": [0, 3] },
                        { "geometry": "tibia", "range": [3, 3] }
                    ],
                    "indices": "a_idx",
                    "attribs": "a_att",
                    "numIndices": 6
                },
                {
                    "diffuse_color": [1.0, 0.5, 0.0],
                    "draws": [{ "geometry": "heart", "range": [0, 3] }],
                    "indices": "b_idx",
                    "attribs": "b_att",
                    "numIndices": 3
                }
            ]
        })
    }

    #[test]
    fn test_json_config_source() {
        let tree = JsonConfigSource.parse_layer(r#"{"draw_groups": []}"#).unwrap();
        assert_eq!(tree, json!({ "draw_groups": [] }));

        let result = JsonConfigSource.parse_layer("{ not json");
        assert!(matches!(result, Err(ConfigError::MalformedInput { .. })));
    }

    #[test]
    fn test_compile_groups() {
        let compiled = compile_layer(&two_groups(), &locators()).unwrap();

        assert_eq!(compiled.groups.len(), 2);
        assert_eq!(
            compiled.groups[0].material,
            Material::Texture("skin.pkm".to_string())
        );
        assert_eq!(
            compiled.groups[1].material,
            Material::DiffuseColor(Vec3::new(1.0, 0.5, 0.0))
        );
        assert_eq!(compiled.groups[0].primitives[1].geometry, "tibia");
        assert_eq!(compiled.groups[0].primitives[1].index_range(), 3..6);
        assert_eq!(compiled.groups[1].total_index_count, 3);
    }

    #[test]
    fn test_plan_batches_by_source() {
        let compiled = compile_layer(&two_groups(), &locators()).unwrap();
        let plan = compiled.plan;

        // Both groups share their index file and their attribute file.
        assert_eq!(plan.sources(), &[ResourceId(10), ResourceId(11)]);
        assert_eq!(plan.request_count(), 4);

        let index_requests = plan.requests(ResourceId(10));
        assert_eq!(
            index_requests,
            &[
                DecodeRequest::Indices {
                    group: 0,
                    locator: FileLocator::new(ResourceId(10), 0, 6),
                },
                DecodeRequest::Indices {
                    group: 1,
                    locator: FileLocator::new(ResourceId(10), 6, 3),
                },
            ]
        );
        assert!(plan.requests(ResourceId(99)).is_empty());

        let batches: Vec<_> = plan.into_batches().collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].0, ResourceId(11));
        assert!(
            batches[1]
                .1
                .iter()
                .all(|r| matches!(r, DecodeRequest::Attributes { .. }))
        );
    }

    #[test]
    fn test_missing_material() {
        let tree = json!({
            "draw_groups": [{
                "draws": [],
                "indices": "a_idx",
                "attribs": "a_att",
                "numIndices": 0
            }]
        });
        let result = compile_layer(&tree, &locators());
        assert_eq!(result, Err(DescriptorError::Material { group: 0 }));
    }

    #[test]
    fn test_both_materials() {
        let mut tree = two_groups();
        tree["draw_groups"][1]["texture"] = json!("extra.pkm");
        let result = compile_layer(&tree, &locators());
        assert_eq!(result, Err(DescriptorError::Material { group: 1 }));
    }

    #[test]
    fn test_range_past_num_indices() {
        let mut tree = two_groups();
        tree["draw_groups"][0]["draws"][1]["range"] = json!([4, 3]);
        let result = compile_layer(&tree, &locators());
        assert_eq!(
            result,
            Err(DescriptorError::RangeOutOfBounds {
                group: 0,
                draw: 1,
                offset: 4,
                count: 3,
                num_indices: 6,
            })
        );
    }

    #[test]
    fn test_unknown_locator() {
        let mut tree = two_groups();
        tree["draw_groups"][1]["attribs"] = json!("nope");
        let result = compile_layer(&tree, &locators());
        assert_eq!(
            result,
            Err(DescriptorError::UnknownLocator {
                group: 1,
                key: "nope".to_string(),
            })
        );
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let mut tree = two_groups();
        tree["draw_groups"][0]["numIndices"] = json!("six");
        let result = compile_layer(&tree, &locators());
        assert!(matches!(result, Err(DescriptorError::Malformed { .. })));

        let result = compile_layer(&json!({ "groups": [] }), &locators());
        assert!(matches!(result, Err(DescriptorError::Malformed { .. })));
    }

    #[test]
    fn test_plan_appends_to_existing_source() {
        let mut plan = FetchPlan::new();
        let a = FileLocator::new(ResourceId(1), 0, 1);
        let b = FileLocator::new(ResourceId(2), 0, 1);
        plan.push(DecodeRequest::Indices { group: 0, locator: a });
        plan.push(DecodeRequest::Indices { group: 1, locator: b });
        plan.push(DecodeRequest::Attributes { group: 2, locator: a });

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.sources(), &[ResourceId(1), ResourceId(2)]);
        let groups: Vec<usize> = plan
            .requests(ResourceId(1))
            .iter()
            .map(DecodeRequest::group)
            .collect();
        assert_eq!(groups, vec![0, 2]);
    }
}
