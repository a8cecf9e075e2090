use std::sync::Arc;

use glam::{Vec2, Vec4};

use crate::renderer::geometry::{GeometryBuffer, VertexDataMask};
use crate::renderer::skinning::BindShape;
use crate::resources::{ChangeTracker, SkinBinding, Stamp, TextureId};
use crate::scene::face::SkinStamp;
use crate::scene::skeleton::{JointMatrixPalette, JointRow, SkeletonPose};
use crate::scene::FaceKey;

/// Pre-baked billboard drawn in place of the live meshes of a distant
/// instance.
#[derive(Debug)]
pub struct Impostor {
    pub texture: TextureId,
    pub(crate) buffer: GeometryBuffer,
}

impl Impostor {
    /// A unit quad centred on the origin, facing +Z.
    #[must_use]
    pub fn new(texture: TextureId) -> Self {
        let mut buffer = GeometryBuffer::new(VertexDataMask::BASE, 4, 6);
        let corners = [(-0.5, -0.5), (0.5, -0.5), (-0.5, 0.5), (0.5, 0.5)];
        for (i, (x, y)) in corners.into_iter().enumerate() {
            buffer.positions[i] = Vec4::new(x, y, 0.0, 1.0);
            buffer.normals[i] = Vec4::Z;
            buffer.texcoords[i] = Vec2::new(x + 0.5, 0.5 - y);
            buffer.colors[i] = [255; 4];
        }
        buffer.indices.copy_from_slice(&[0, 1, 2, 2, 1, 3]);
        buffer.mark_written();

        Self { texture, buffer }
    }

    #[must_use]
    pub fn buffer(&self) -> &GeometryBuffer {
        &self.buffer
    }
}

/// Skinning matrices built from the pose carrying `stamp`.
#[derive(Debug)]
pub(crate) struct PoseCache {
    pub stamp: Stamp,
    pub palette: JointMatrixPalette,
    pub rows: Vec<JointRow>,
    pub bind_shape: BindShape,
}

/// One deformable mesh instance in the scene: an avatar body, or a rigged
/// object attached to one.
///
/// Owns its faces (by key) and its pose. The scene layer updates the pose
/// before the frame is rendered.
#[derive(Debug)]
pub struct MeshInstance {
    pub(crate) faces: Vec<FaceKey>,
    pub(crate) skin: Option<Arc<SkinBinding>>,
    pub(crate) pose: SkeletonPose,
    pub(crate) pose_tracker: ChangeTracker,
    pub(crate) topology_tracker: ChangeTracker,
    pub(crate) pose_cache: Option<PoseCache>,
    pub(crate) impostor: Option<Impostor>,
    pub(crate) impostor_active: bool,
    pub(crate) quarantined: bool,
    pub(crate) visible_frame: u64,
}

impl MeshInstance {
    pub(crate) fn new(skin: Option<Arc<SkinBinding>>) -> Self {
        Self {
            faces: Vec::new(),
            skin,
            pose: SkeletonPose::default(),
            pose_tracker: ChangeTracker::new(),
            topology_tracker: ChangeTracker::new(),
            pose_cache: None,
            impostor: None,
            impostor_active: false,
            quarantined: false,
            visible_frame: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn faces(&self) -> &[FaceKey] {
        &self.faces
    }

    #[inline]
    #[must_use]
    pub fn skin(&self) -> Option<&Arc<SkinBinding>> {
        self.skin.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn pose(&self) -> &SkeletonPose {
        &self.pose
    }

    /// Stamps a software bake has to match to still be current.
    #[inline]
    #[must_use]
    pub fn skin_stamp(&self) -> SkinStamp {
        SkinStamp {
            pose: self.pose_tracker.stamp(),
            topology: self.topology_tracker.stamp(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_quarantined(&self) -> bool {
        self.quarantined
    }

    /// Whether the live faces are replaced by the impostor billboard.
    #[inline]
    #[must_use]
    pub fn is_impostored(&self) -> bool {
        self.impostor_active && self.impostor.is_some()
    }

    /// Whether the instance can be drawn at all, ignoring visibility.
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        !self.quarantined && (!self.faces.is_empty() || self.is_impostored())
    }
}
