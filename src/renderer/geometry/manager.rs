use rustc_hash::FxHashSet;

use crate::errors::{Result, RiggedError};
use crate::renderer::geometry::{GeometryBuffer, VertexDataMask, WriteCounters};
use crate::scene::{FaceDirty, InstanceKey, MeshFace};

/// What [`GeometryManager::ensure_geometry`] did to a face's buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum EnsureOutcome {
    /// Existing buffer already matched layout and counts.
    Reused,
    /// A fresh buffer was allocated (first use or layout change).
    Allocated,
    /// The existing buffer was resized in place.
    Resized,
    /// The degenerate placeholder is in place instead of real geometry.
    Degenerate {
        error: RiggedError,
        /// Whether the owning instance should be removed from the scene.
        quarantine: bool,
    },
}

impl EnsureOutcome {
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Degenerate { .. })
    }
}

/// Lifetime counters of the buffer pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub allocated: u64,
    pub resized: u64,
    pub reused: u64,
    pub degenerate: u64,
    pub released: u64,
}

/// Owns the allocation policy of per-face geometry buffers.
///
/// Buffers themselves live on their faces; the manager only decides when to
/// allocate, resize or substitute, and accounts the bytes against a budget.
#[derive(Debug)]
pub struct GeometryManager {
    max_vertices: u32,
    budget_bytes: u64,
    used_bytes: u64,
    stats: BufferStats,
    counters: WriteCounters,
    reported: FxHashSet<InstanceKey>,
}

impl GeometryManager {
    #[must_use]
    pub fn new(max_vertices: u32, budget_bytes: u64) -> Self {
        Self {
            max_vertices,
            budget_bytes,
            used_bytes: 0,
            stats: BufferStats::default(),
            counters: WriteCounters::default(),
            reported: FxHashSet::default(),
        }
    }

    /// Applies new limits. Existing buffers are kept; they are checked
    /// against the new limits the next time they are ensured.
    pub fn set_limits(&mut self, max_vertices: u32, budget_bytes: u64) {
        self.max_vertices = max_vertices;
        self.budget_bytes = budget_bytes;
    }

    #[inline]
    #[must_use]
    pub fn max_vertices(&self) -> u32 {
        self.max_vertices
    }

    #[inline]
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    #[inline]
    #[must_use]
    pub fn budget_bytes(&self) -> u64 {
        self.budget_bytes
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    /// Per-sub-step rewrite counters of every geometry write so far.
    #[inline]
    #[must_use]
    pub fn counters(&self) -> WriteCounters {
        self.counters
    }

    pub(crate) fn counters_mut(&mut self) -> &mut WriteCounters {
        &mut self.counters
    }

    /// Makes sure `face` owns a buffer with layout `mask` holding
    /// `vertex_count` vertices and `index_count` indices.
    ///
    /// Never fails outright: counts that cannot be honoured leave the face on
    /// the degenerate placeholder and report why. A new or resized buffer
    /// marks every write sub-step dirty.
    pub fn ensure_geometry(
        &mut self,
        face: &mut MeshFace,
        mask: VertexDataMask,
        vertex_count: i64,
        index_count: i64,
    ) -> EnsureOutcome {
        face.vertex_count = vertex_count;
        face.index_count = index_count;

        let decoded = (face.geometry.vertex_count(), face.geometry.index_count());
        let (vertices, indices) = match self.validate(vertex_count, index_count, decoded) {
            Ok(Some(counts)) => counts,
            Ok(None) => {
                log::debug!("Face of instance {:?} has no triangles, using placeholder", face.owner);
                let error = RiggedError::MalformedGeometry {
                    vertex_count,
                    index_count,
                    reason: "empty face",
                };
                return self.degenerate(face, mask, error, false);
            }
            Err(error) => return self.degenerate(face, mask, error, true),
        };

        if let Some(buffer) = face.buffer.as_ref()
            && !buffer.is_degenerate()
            && buffer.mask() == mask
        {
            if buffer.vertex_count() == vertices && buffer.index_count() == indices {
                self.stats.reused += 1;
                return EnsureOutcome::Reused;
            }

            let old = buffer.byte_size();
            let new = GeometryBuffer::byte_size_for(mask, vertices, indices);
            if let Err(error) = self.reserve(new.saturating_sub(old)) {
                return self.degenerate(face, mask, error, true);
            }
            self.used_bytes = self.used_bytes.saturating_sub(old.saturating_sub(new));

            if let Some(buffer) = face.buffer.as_mut() {
                buffer.resize(vertices, indices);
            }
            face.mark_dirty(FaceDirty::REBUILD);
            self.stats.resized += 1;
            return EnsureOutcome::Resized;
        }

        self.release(face);
        if let Err(error) = self.reserve(GeometryBuffer::byte_size_for(mask, vertices, indices)) {
            return self.degenerate(face, mask, error, true);
        }
        face.buffer = Some(GeometryBuffer::new(mask, vertices, indices));
        face.mark_dirty(FaceDirty::REBUILD);
        self.stats.allocated += 1;
        EnsureOutcome::Allocated
    }

    /// Replaces the face's buffer with the degenerate placeholder.
    ///
    /// Used directly by the frame loop when a geometry write fails after
    /// the buffer was already ensured.
    pub fn substitute_degenerate(
        &mut self,
        face: &mut MeshFace,
        error: RiggedError,
    ) -> EnsureOutcome {
        let mask = face
            .buffer
            .as_ref()
            .map_or(VertexDataMask::BASE, GeometryBuffer::mask);
        self.degenerate(face, mask, error, true)
    }

    /// Frees the face's buffer, if any.
    pub fn release(&mut self, face: &mut MeshFace) {
        if let Some(buffer) = face.buffer.take() {
            self.used_bytes = self.used_bytes.saturating_sub(buffer.byte_size());
            self.stats.released += 1;
        }
    }

    /// `Ok(None)` for an empty face, `Ok(Some(counts))` for usable counts.
    ///
    /// Reported counts may undershoot the decoded geometry (a partial draw)
    /// but never exceed it.
    fn validate(
        &self,
        vertex_count: i64,
        index_count: i64,
        (decoded_vertices, decoded_indices): (usize, usize),
    ) -> Result<Option<(u32, u32)>> {
        let malformed = |reason: &'static str| RiggedError::MalformedGeometry {
            vertex_count,
            index_count,
            reason,
        };

        if vertex_count < 0 || index_count < 0 {
            return Err(malformed("negative count"));
        }
        if vertex_count > i64::from(self.max_vertices) {
            return Err(malformed("vertex count exceeds per-buffer ceiling"));
        }
        if index_count % 3 != 0 {
            return Err(malformed("index count is not a whole number of triangles"));
        }
        if vertex_count as u64 > decoded_vertices as u64 {
            return Err(malformed("reported vertex count exceeds decoded vertices"));
        }
        if index_count as u64 > decoded_indices as u64 {
            return Err(malformed("reported index count exceeds decoded indices"));
        }
        if vertex_count == 0 || index_count == 0 {
            return Ok(None);
        }
        let indices =
            u32::try_from(index_count).map_err(|_| malformed("index count out of range"))?;
        Ok(Some((vertex_count as u32, indices)))
    }

    fn reserve(&mut self, bytes: u64) -> Result<()> {
        let available = self.budget_bytes.saturating_sub(self.used_bytes);
        if bytes > available {
            return Err(RiggedError::BufferBudgetExceeded {
                requested: bytes,
                available,
            });
        }
        self.used_bytes += bytes;
        Ok(())
    }

    fn degenerate(
        &mut self,
        face: &mut MeshFace,
        mask: VertexDataMask,
        error: RiggedError,
        quarantine: bool,
    ) -> EnsureOutcome {
        let already = face
            .buffer
            .as_ref()
            .is_some_and(|b| b.is_degenerate() && b.mask() == mask);

        if !already {
            self.release(face);
            let buffer = GeometryBuffer::degenerate(mask);
            // The placeholder is exempt from the budget check but still accounted.
            self.used_bytes += buffer.byte_size();
            face.buffer = Some(buffer);
            self.stats.degenerate += 1;
        }
        face.dirty = FaceDirty::empty();
        face.skinned_at = None;

        if quarantine && self.reported.insert(face.owner) {
            log::warn!(
                "Instance {:?}: {error}; substituting degenerate geometry and quarantining",
                face.owner
            );
        }

        EnsureOutcome::Degenerate { error, quarantine }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::renderer::geometry::DEGENERATE_INDEX_COUNT;
    use crate::resources::{FaceGeometry, MaterialSignature};
    use crate::scene::FaceDesc;

    const BUDGET: u64 = 1 << 20;

    fn face() -> MeshFace {
        grid_face(2, 2)
    }

    fn grid_face(columns: u16, rows: u16) -> MeshFace {
        let desc = FaceDesc::new(
            Arc::new(FaceGeometry::grid(columns, rows)),
            MaterialSignature::default(),
        );
        MeshFace::new(InstanceKey::default(), desc)
    }

    #[test]
    fn allocates_exact_counts_with_aligned_capacity() {
        let mut manager = GeometryManager::new(65536, BUDGET);
        let mut face = face();

        let outcome = manager.ensure_geometry(&mut face, VertexDataMask::BASE, 9, 24);
        assert_eq!(outcome, EnsureOutcome::Allocated);

        let buffer = face.buffer.as_ref().expect("buffer");
        assert_eq!(buffer.vertex_count(), 9);
        assert_eq!(buffer.vertex_capacity(), 12);
        assert_eq!(buffer.index_capacity(), 24);
        assert_eq!(face.dirty, FaceDirty::REBUILD);
        assert_eq!(manager.used_bytes(), buffer.byte_size());
    }

    #[test]
    fn same_counts_reuse_and_new_counts_resize_in_place() {
        let mut manager = GeometryManager::new(65536, BUDGET);
        let mut face = face();
        manager.ensure_geometry(&mut face, VertexDataMask::BASE, 9, 24);
        let id = face.buffer.as_ref().map(GeometryBuffer::id);
        face.dirty = FaceDirty::empty();

        assert_eq!(
            manager.ensure_geometry(&mut face, VertexDataMask::BASE, 9, 24),
            EnsureOutcome::Reused
        );
        assert!(face.dirty.is_empty());

        assert_eq!(
            manager.ensure_geometry(&mut face, VertexDataMask::BASE, 6, 12),
            EnsureOutcome::Resized
        );
        assert_eq!(face.buffer.as_ref().map(GeometryBuffer::id), id);
        assert_eq!(face.dirty, FaceDirty::REBUILD);
        assert_eq!(
            manager.used_bytes(),
            GeometryBuffer::byte_size_for(VertexDataMask::BASE, 6, 12)
        );
    }

    #[test]
    fn layout_change_reallocates() {
        let mut manager = GeometryManager::new(65536, BUDGET);
        let mut face = face();
        manager.ensure_geometry(&mut face, VertexDataMask::BASE, 9, 24);
        let id = face.buffer.as_ref().map(GeometryBuffer::id);

        let mask = VertexDataMask::BASE | VertexDataMask::WEIGHT4;
        assert_eq!(
            manager.ensure_geometry(&mut face, mask, 9, 24),
            EnsureOutcome::Allocated
        );
        assert_ne!(face.buffer.as_ref().map(GeometryBuffer::id), id);
        assert_eq!(manager.stats().released, 1);
    }

    #[test]
    fn malformed_counts_yield_placeholder() {
        let cases = [(-1, 3), (4, -3), (70_000, 3), (4, 5)];
        for (vertices, indices) in cases {
            let mut manager = GeometryManager::new(65536, BUDGET);
            let mut face = face();
            let outcome = manager.ensure_geometry(&mut face, VertexDataMask::BASE, vertices, indices);

            assert!(
                matches!(outcome, EnsureOutcome::Degenerate { quarantine: true, .. }),
                "({vertices}, {indices}): {outcome:?}"
            );
            let buffer = face.buffer.as_ref().expect("placeholder");
            assert!(buffer.is_degenerate());
            assert!(buffer.vertex_capacity() > 0);
            assert_eq!(buffer.index_count(), DEGENERATE_INDEX_COUNT);
            assert!(face.dirty.is_empty());
        }
    }

    #[test]
    fn counts_beyond_decoded_geometry_are_malformed() {
        // 2x2 grid: 9 vertices, 24 indices
        for (vertices, indices) in [(1000, 24), (10, 24), (9, 30)] {
            let mut manager = GeometryManager::new(65536, BUDGET);
            let mut face = face();
            let outcome = manager.ensure_geometry(&mut face, VertexDataMask::BASE, vertices, indices);

            assert!(
                matches!(
                    outcome,
                    EnsureOutcome::Degenerate {
                        error: RiggedError::MalformedGeometry { .. },
                        quarantine: true
                    }
                ),
                "({vertices}, {indices}): {outcome:?}"
            );
            assert!(face.buffer.as_ref().is_some_and(GeometryBuffer::is_degenerate));
        }
    }

    #[test]
    fn empty_face_is_not_quarantined() {
        let mut manager = GeometryManager::new(65536, BUDGET);
        let mut face = face();
        let outcome = manager.ensure_geometry(&mut face, VertexDataMask::BASE, 0, 0);
        assert!(matches!(outcome, EnsureOutcome::Degenerate { quarantine: false, .. }));
    }

    #[test]
    fn budget_exhaustion_falls_back_to_placeholder() {
        let small = GeometryBuffer::byte_size_for(VertexDataMask::BASE, 9, 24);
        let mut manager = GeometryManager::new(65536, small);
        // 30x30 grid: 961 vertices, 5400 indices
        let mut face = grid_face(30, 30);

        assert_eq!(
            manager.ensure_geometry(&mut face, VertexDataMask::BASE, 9, 24),
            EnsureOutcome::Allocated
        );
        let outcome = manager.ensure_geometry(&mut face, VertexDataMask::BASE, 900, 2400);
        assert!(matches!(
            outcome,
            EnsureOutcome::Degenerate {
                error: RiggedError::BufferBudgetExceeded { .. },
                quarantine: true
            }
        ));
        assert!(face.buffer.as_ref().is_some_and(GeometryBuffer::is_degenerate));
    }

    #[test]
    fn placeholder_is_reused_across_frames() {
        let mut manager = GeometryManager::new(65536, BUDGET);
        let mut face = face();
        manager.ensure_geometry(&mut face, VertexDataMask::BASE, -1, 3);
        let id = face.buffer.as_ref().map(GeometryBuffer::id);
        manager.ensure_geometry(&mut face, VertexDataMask::BASE, -1, 3);

        assert_eq!(face.buffer.as_ref().map(GeometryBuffer::id), id);
        assert_eq!(manager.stats().degenerate, 1);
    }

    #[test]
    fn release_returns_bytes() {
        let mut manager = GeometryManager::new(65536, BUDGET);
        let mut face = face();
        manager.ensure_geometry(&mut face, VertexDataMask::BASE, 9, 24);
        manager.release(&mut face);
        assert!(face.buffer.is_none());
        assert_eq!(manager.used_bytes(), 0);
    }
}
