use bytemuck::{Pod, Zeroable};
use glam::{Affine3A, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use uuid::Uuid;

use crate::resources::SkinBinding;
use crate::utils::interner::{self, Symbol};

/// Current world-space joint transforms of one skeleton, keyed by joint name.
///
/// Written by the scene layer before the frame is rendered and read-only
/// while the pass sequence runs.
#[derive(Debug, Clone, Default)]
pub struct SkeletonPose {
    joints: FxHashMap<Symbol, Affine3A>,
}

impl SkeletonPose {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the world transform of a joint, interning its name.
    pub fn set_joint(&mut self, name: &str, world: Affine3A) {
        self.joints.insert(interner::intern(name), world);
    }

    #[inline]
    #[must_use]
    pub fn joint(&self, joint: Symbol) -> Option<&Affine3A> {
        self.joints.get(&joint)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Builder-style helper.
    #[must_use]
    pub fn with_joint(mut self, name: &str, world: Affine3A) -> Self {
        self.set_joint(name, world);
        self
    }
}

/// One palette entry packed as a row-major 3x4 matrix for shader upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct JointRow {
    pub rows: [[f32; 4]; 3],
}

impl From<&Affine3A> for JointRow {
    fn from(m: &Affine3A) -> Self {
        let x = m.matrix3.x_axis;
        let y = m.matrix3.y_axis;
        let z = m.matrix3.z_axis;
        let t = Vec3::from(m.translation);
        Self {
            rows: [
                [x.x, y.x, z.x, t.x],
                [x.y, y.y, z.y, t.y],
                [x.z, y.z, z.z, t.z],
            ],
        }
    }
}

/// Per-frame joint matrices of one skinned instance, one per binding joint.
///
/// Affine only: no perspective term is carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointMatrixPalette {
    matrices: Vec<Affine3A>,
}

impl JointMatrixPalette {
    #[must_use]
    pub fn from_matrices(matrices: Vec<Affine3A>) -> Self {
        Self { matrices }
    }

    /// A palette of `count` identity matrices.
    #[must_use]
    pub fn identity(count: usize) -> Self {
        Self {
            matrices: vec![Affine3A::IDENTITY; count],
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn matrices(&self) -> &[Affine3A] {
        &self.matrices
    }

    /// Matrix of joint `index`, identity when out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Affine3A {
        self.matrices.get(index).copied().unwrap_or(Affine3A::IDENTITY)
    }

    /// Packs the palette into the 3x4 layout the skinning shaders expect.
    #[must_use]
    pub fn to_gpu_rows(&self) -> Vec<JointRow> {
        self.matrices.iter().map(JointRow::from).collect()
    }
}

/// Builds joint matrix palettes and remembers which assets already reported
/// unresolved joints.
#[derive(Debug, Default)]
pub struct PaletteBuilder {
    warned: FxHashSet<Uuid>,
}

impl PaletteBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the palette for `binding` posed by `pose`.
    ///
    /// Entry `i` is `joint_world(i) * inverse_bind(i)`. A joint missing from
    /// the live skeleton gets the identity transform; the first miss per
    /// asset is logged, later ones are silent.
    pub fn build(&mut self, pose: &SkeletonPose, binding: &SkinBinding) -> JointMatrixPalette {
        let mut missing = 0usize;
        let matrices = binding
            .joints
            .iter()
            .zip(&binding.inverse_binds)
            .map(|(&joint, inverse_bind)| match pose.joint(joint) {
                Some(world) => *world * *inverse_bind,
                None => {
                    missing += 1;
                    Affine3A::IDENTITY
                }
            })
            .collect();

        if missing > 0 && self.warned.insert(binding.id) {
            log::warn!(
                "Skin binding {}: {missing} of {} joints not found in skeleton, using identity",
                binding.id,
                binding.joint_count()
            );
        }

        JointMatrixPalette { matrices }
    }

    /// Whether a missing-joint diagnostic was already emitted for `asset`.
    #[must_use]
    pub fn has_warned(&self, asset: Uuid) -> bool {
        self.warned.contains(&asset)
    }
}
