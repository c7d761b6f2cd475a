//! Selection color allocation.
//!
//! Every [`DrawPrimitive`] loaded during a session gets a unique color index,
//! written into a hidden per-vertex channel so a rendered pick buffer can be
//! mapped back to the primitive under the cursor. Index 0 means "nothing
//! selected"; real indices start at 1 and are handed out in draw-group order,
//! then primitive order, then layer order.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{DrawGroup, DrawPrimitive};

/// Largest color index that fits the 16-bit color channel.
pub const MAX_COLOR_INDEX: u16 = u16::MAX;

/// Live mapping from color index to primitive, owned by the loader.
///
/// Indices are dense, so slot `i - 1` holds color `i`.
#[derive(Debug, Default)]
pub struct SelectionColorMap {
    primitives: Vec<DrawPrimitive>,
}

impl SelectionColorMap {
    /// Look up the primitive for a color index.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&DrawPrimitive> {
        lookup(&self.primitives, index)
    }

    /// Number of allocated colors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Check if no colors have been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// The highest allocated color index, or 0 if none.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_index(&self) -> u16 {
        // Allocation stops at MAX_COLOR_INDEX, so the length always fits.
        self.primitives.len() as u16
    }

    /// Copy the current contents into an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ColorMapSnapshot {
        ColorMapSnapshot {
            primitives: self.primitives.as_slice().into(),
        }
    }

    fn push(&mut self, primitive: DrawPrimitive) -> Result<u16> {
        let next = self.primitives.len() + 1;
        let index = u16::try_from(next).map_err(|_| Error::AllocationOverflow {
            max: MAX_COLOR_INDEX,
        })?;
        self.primitives.push(primitive);
        Ok(index)
    }

    fn clear(&mut self) {
        self.primitives.clear();
    }
}

/// Frozen copy of the selection color map at the time a layer finished.
///
/// Never aliases the loader's live map; later layers cannot change it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorMapSnapshot {
    primitives: Arc<[DrawPrimitive]>,
}

impl ColorMapSnapshot {
    /// Look up the primitive for a color index.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&DrawPrimitive> {
        lookup(&self.primitives, index)
    }

    /// Number of colors in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Check if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// The highest color index in the snapshot, or 0 if empty.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_index(&self) -> u16 {
        self.primitives.len() as u16
    }

    /// Iterate over `(color index, primitive)` pairs in index order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (u16, &DrawPrimitive)> {
        self.primitives
            .iter()
            .enumerate()
            .map(|(slot, primitive)| ((slot + 1) as u16, primitive))
    }
}

fn lookup(primitives: &[DrawPrimitive], index: u16) -> Option<&DrawPrimitive> {
    let slot = usize::from(index).checked_sub(1)?;
    primitives.get(slot)
}

/// Hands out selection colors and writes them into draw groups.
#[derive(Debug, Default)]
pub struct ColorAllocator {
    map: SelectionColorMap,
}

impl ColorAllocator {
    /// Create an allocator whose next color is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all allocations; the next color is 1 again.
    pub fn reset(&mut self) {
        self.map.clear();
    }

    /// The live color map.
    #[must_use]
    pub fn map(&self) -> &SelectionColorMap {
        &self.map
    }

    /// Copy the live map for handing to a consumer.
    #[must_use]
    pub fn snapshot(&self) -> ColorMapSnapshot {
        self.map.snapshot()
    }

    /// Allocate a color per primitive of `group` and build its color buffer.
    ///
    /// The color buffer has one slot per vertex. A primitive's color is
    /// written to every vertex its index range references; a vertex shared by
    /// two primitives keeps the color of the later one. Index values past the
    /// end of the vertex buffer are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationOverflow`] once more than
    /// [`MAX_COLOR_INDEX`] primitives have been colored in this session.
    pub fn assign<I>(&mut self, group: &mut DrawGroup<I>) -> Result<()> {
        let mut colors = vec![0_u16; group.vertex_count()];

        for primitive in &group.primitives {
            let color = self.map.push(primitive.clone())?;
            let referenced = group.indices.get(primitive.index_range()).unwrap_or(&[]);
            for &index in referenced {
                if let Some(slot) = colors.get_mut(usize::from(index)) {
                    *slot = color;
                }
            }
        }

        group.colors = colors;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Material;
    use glam::Vec3;

    fn primitive(name: &str, index_offset: usize, index_count: usize) -> DrawPrimitive {
        DrawPrimitive {
            geometry: name.to_string(),
            index_offset,
            index_count,
        }
    }

    fn group(primitives: Vec<DrawPrimitive>, indices: Vec<u16>, vertices: usize) -> DrawGroup<()> {
        DrawGroup {
            material: Material::DiffuseColor(Vec3::ONE),
            image: None,
            primitives,
            total_index_count: indices.len(),
            indices,
            vertices: vec![0; vertices * 8],
            colors: Vec::new(),
        }
    }

    #[test]
    fn test_assign_writes_colors_through_indices() {
        let mut allocator = ColorAllocator::new();
        let mut group = group(
            vec![primitive("a", 0, 3), primitive("b", 3, 3)],
            vec![0, 1, 2, 2, 3, 4],
            6,
        );

        allocator.assign(&mut group).unwrap();

        // Vertex 2 is shared; the later primitive wins. Vertex 5 is unreferenced.
        assert_eq!(group.colors, vec![1, 1, 2, 2, 2, 0]);
        assert_eq!(allocator.map().get(1).unwrap().geometry, "a");
        assert_eq!(allocator.map().get(2).unwrap().geometry, "b");
        assert!(allocator.map().get(0).is_none());
        assert_eq!(allocator.map().max_index(), 2);
    }

    #[test]
    fn test_indices_unique_across_groups() {
        let mut allocator = ColorAllocator::new();
        let mut first = group(vec![primitive("a", 0, 1), primitive("b", 1, 1)], vec![0, 1], 2);
        let mut second = group(vec![primitive("c", 0, 2)], vec![1, 0], 2);

        allocator.assign(&mut first).unwrap();
        allocator.assign(&mut second).unwrap();

        let snapshot = allocator.snapshot();
        let indices: Vec<u16> = snapshot.iter().map(|(index, _)| index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(second.colors, vec![3, 3]);
    }

    #[test]
    fn test_out_of_range_vertex_ignored() {
        let mut allocator = ColorAllocator::new();
        let mut group = group(vec![primitive("a", 0, 2)], vec![0, 9], 2);
        allocator.assign(&mut group).unwrap();
        assert_eq!(group.colors, vec![1, 0]);
    }

    #[test]
    fn test_range_past_index_buffer_colors_nothing() {
        let mut allocator = ColorAllocator::new();
        let mut group = group(
            vec![primitive("a", usize::MAX, usize::MAX), primitive("b", 0, 2)],
            vec![0, 1],
            2,
        );
        allocator.assign(&mut group).unwrap();
        assert_eq!(group.colors, vec![2, 2]);
        assert_eq!(allocator.map().max_index(), 2);
    }

    #[test]
    fn test_snapshot_isolated_from_live_map() {
        let mut allocator = ColorAllocator::new();
        let mut first = group(vec![primitive("a", 0, 1)], vec![0], 1);
        allocator.assign(&mut first).unwrap();

        let snapshot = allocator.snapshot();

        let mut second = group(vec![primitive("b", 0, 1)], vec![0], 1);
        allocator.assign(&mut second).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.max_index(), 1);
        assert!(snapshot.get(2).is_none());
        assert_eq!(allocator.map().len(), 2);

        allocator.reset();
        assert_eq!(snapshot.get(1).unwrap().geometry, "a");
    }

    #[test]
    fn test_reset_restarts_at_one() {
        let mut allocator = ColorAllocator::new();
        let mut first = group(vec![primitive("a", 0, 1)], vec![0], 1);
        allocator.assign(&mut first).unwrap();
        allocator.reset();

        let mut again = group(vec![primitive("b", 0, 1)], vec![0], 1);
        allocator.assign(&mut again).unwrap();
        assert_eq!(again.colors, vec![1]);
        assert_eq!(allocator.map().len(), 1);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut allocator = ColorAllocator::new();
        let primitives = (0..usize::from(MAX_COLOR_INDEX))
            .map(|i| primitive(&i.to_string(), 0, 0))
            .collect();
        let mut full = group(primitives, Vec::new(), 0);
        allocator.assign(&mut full).unwrap();
        assert_eq!(allocator.map().max_index(), MAX_COLOR_INDEX);

        let mut one_more = group(vec![primitive("extra", 0, 0)], Vec::new(), 0);
        let result = allocator.assign(&mut one_more);
        assert!(matches!(
            result,
            Err(Error::AllocationOverflow { max: MAX_COLOR_INDEX })
        ));
        assert_eq!(allocator.map().len(), usize::from(MAX_COLOR_INDEX));
    }
}
