use std::sync::Arc;

use bitflags::bitflags;

use crate::renderer::buckets::BucketId;
use crate::renderer::geometry::GeometryBuffer;
use crate::resources::{
    FaceGeometry, FaceRole, MaterialSignature, PlanarProjection, Stamp, TextureTransform,
};
use crate::scene::InstanceKey;

bitflags! {
    /// Per-face "needs rebuild" bits, one per geometry write sub-step.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct FaceDirty: u32 {
        const POSITION = 1 << 0;
        const NORMAL   = 1 << 1;
        const TEXCOORD = 1 << 2;
        const COLOR    = 1 << 3;
        const WEIGHTS  = 1 << 4;
        const INDICES  = 1 << 5;
    }
}

impl FaceDirty {
    /// Everything a freshly allocated or resized buffer needs.
    pub const REBUILD: Self = Self::all();
    /// What a pose change invalidates under software skinning.
    pub const SKIN: Self = Self::POSITION.union(Self::NORMAL);
}

/// Membership of a face in a bucket: which bucket, and where in its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSlot {
    pub bucket: BucketId,
    pub index: usize,
}

/// The (pose, topology) stamps a software bake was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinStamp {
    pub pose: Stamp,
    pub topology: Stamp,
}

/// Everything needed to create a face.
#[derive(Debug, Clone)]
pub struct FaceDesc {
    pub geometry: Arc<FaceGeometry>,
    pub material: MaterialSignature,
    pub role: FaceRole,
    /// Index of this face within its mesh asset, selects the weight table
    /// of the skin binding.
    pub face_index: usize,
    pub texture_transform: TextureTransform,
    pub planar: Option<PlanarProjection>,
    /// Counts as reported by the asset header. `None` takes them from the
    /// decoded geometry.
    pub reported_counts: Option<(i64, i64)>,
}

impl FaceDesc {
    #[must_use]
    pub fn new(geometry: Arc<FaceGeometry>, material: MaterialSignature) -> Self {
        Self {
            geometry,
            material,
            role: FaceRole::Rigged,
            face_index: 0,
            texture_transform: TextureTransform::IDENTITY,
            planar: None,
            reported_counts: None,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: FaceRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_face_index(mut self, face_index: usize) -> Self {
        self.face_index = face_index;
        self
    }

    #[must_use]
    pub fn with_texture_transform(mut self, transform: TextureTransform) -> Self {
        self.texture_transform = transform;
        self
    }

    #[must_use]
    pub fn with_planar(mut self, planar: PlanarProjection) -> Self {
        self.planar = Some(planar);
        self
    }

    #[must_use]
    pub fn with_reported_counts(mut self, vertex_count: i64, index_count: i64) -> Self {
        self.reported_counts = Some((vertex_count, index_count));
        self
    }
}

/// One textured surface region of one mesh instance.
///
/// Holds a non-owning back-reference to its instance and exclusively owns
/// its geometry buffer.
#[derive(Debug)]
pub struct MeshFace {
    pub(crate) owner: InstanceKey,
    pub(crate) role: FaceRole,
    pub(crate) face_index: usize,

    pub(crate) geometry: Arc<FaceGeometry>,
    pub(crate) vertex_count: i64,
    pub(crate) index_count: i64,
    pub(crate) base_vertex: u16,

    pub(crate) material: MaterialSignature,
    pub(crate) texture_transform: TextureTransform,
    pub(crate) planar: Option<PlanarProjection>,

    pub(crate) bucket: Option<BucketSlot>,
    pub(crate) buffer: Option<GeometryBuffer>,
    pub(crate) dirty: FaceDirty,
    pub(crate) skinned_at: Option<SkinStamp>,
}

impl MeshFace {
    pub(crate) fn new(owner: InstanceKey, desc: FaceDesc) -> Self {
        let (vertex_count, index_count) = desc.reported_counts.unwrap_or((
            desc.geometry.vertex_count() as i64,
            desc.geometry.index_count() as i64,
        ));

        Self {
            owner,
            role: desc.role,
            face_index: desc.face_index,
            geometry: desc.geometry,
            vertex_count,
            index_count,
            base_vertex: 0,
            material: desc.material,
            texture_transform: desc.texture_transform,
            planar: desc.planar,
            bucket: None,
            buffer: None,
            dirty: FaceDirty::REBUILD,
            skinned_at: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn owner(&self) -> InstanceKey {
        self.owner
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> FaceRole {
        self.role
    }

    #[inline]
    #[must_use]
    pub fn material(&self) -> &MaterialSignature {
        &self.material
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &FaceGeometry {
        &self.geometry
    }

    /// Vertex count as reported by the asset (may be corrupt).
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> i64 {
        self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> i64 {
        self.index_count
    }

    #[inline]
    #[must_use]
    pub fn bucket(&self) -> Option<BucketSlot> {
        self.bucket
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> Option<&GeometryBuffer> {
        self.buffer.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn dirty(&self) -> FaceDirty {
        self.dirty
    }

    #[inline]
    #[must_use]
    pub fn skinned_at(&self) -> Option<SkinStamp> {
        self.skinned_at
    }

    /// Whether the face currently renders from the degenerate placeholder.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.buffer.as_ref().is_some_and(GeometryBuffer::is_degenerate)
    }

    pub(crate) fn mark_dirty(&mut self, bits: FaceDirty) {
        self.dirty |= bits;
    }
}
