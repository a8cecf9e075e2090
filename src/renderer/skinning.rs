//! Software skinning math.
//!
//! Used when shader-side matrix-palette skinning is unavailable, disabled,
//! or the palette is too long for the shader's uniform array. The choice of
//! [`SkinMode`] is made per pass (and per instance for oversized palettes),
//! never per vertex.

use glam::{Affine3A, Mat3A, Vec3, Vec3A};

use crate::resources::JointWeights;
use crate::scene::JointMatrixPalette;

/// Where vertices get skinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkinMode {
    /// Palette uploaded as a shader uniform array; buffers hold bind-shape
    /// positions plus raw joint indices and weights.
    Hardware,
    /// Positions and normals baked into the buffer once per pose change.
    Software,
}

/// Weights below this total are treated as "no influence".
const WEIGHT_EPSILON: f32 = 1e-6;

/// Blends the palette matrices of up to four influences into one affine
/// matrix. Weights are renormalised when they do not sum to one; a vertex
/// without influence maps to the identity.
#[must_use]
pub fn final_matrix(palette: &JointMatrixPalette, weights: &JointWeights) -> Affine3A {
    let mut matrix3 = Mat3A::ZERO;
    let mut translation = Vec3A::ZERO;
    let mut total = 0.0;

    for (&joint, &weight) in weights.joints.iter().zip(&weights.weights) {
        if weight <= 0.0 {
            continue;
        }
        let m = palette.get(usize::from(joint));
        matrix3 += m.matrix3 * weight;
        translation += m.translation * weight;
        total += weight;
    }

    if total <= WEIGHT_EPSILON {
        return Affine3A::IDENTITY;
    }
    if (total - 1.0).abs() > WEIGHT_EPSILON {
        let inv = 1.0 / total;
        matrix3 *= inv;
        translation *= inv;
    }

    Affine3A {
        matrix3,
        translation,
    }
}

/// Inverse-transpose of the linear part of `m`, for transforming normals.
///
/// Falls back to the linear part itself when `m` is singular.
#[must_use]
pub fn normal_matrix(m: &Affine3A) -> Mat3A {
    let linear = m.matrix3;
    if linear.determinant().abs() <= f32::EPSILON {
        return linear;
    }
    linear.inverse().transpose()
}

/// Bind-shape transform of one mesh, with its normal matrix precomputed so
/// per-vertex skinning does not invert a matrix per vertex.
#[derive(Debug, Clone, Copy)]
pub struct BindShape {
    pub matrix: Affine3A,
    pub normal_matrix: Mat3A,
}

impl BindShape {
    #[must_use]
    pub fn new(matrix: Affine3A) -> Self {
        Self {
            matrix,
            normal_matrix: normal_matrix(&matrix),
        }
    }

    pub const IDENTITY: Self = Self {
        matrix: Affine3A::IDENTITY,
        normal_matrix: Mat3A::IDENTITY,
    };

    #[inline]
    #[must_use]
    pub fn position(&self, position: Vec3) -> Vec3 {
        self.matrix.transform_point3(position)
    }

    #[inline]
    #[must_use]
    pub fn normal(&self, normal: Vec3) -> Vec3 {
        (self.normal_matrix * normal).normalize_or_zero()
    }

    /// Skins one rest-pose vertex: bind shape first, then the blended joint
    /// matrix. The normal is renormalised after rotation.
    #[inline]
    #[must_use]
    pub fn skin(
        &self,
        palette: &JointMatrixPalette,
        position: Vec3,
        normal: Vec3,
        weights: &JointWeights,
    ) -> (Vec3, Vec3) {
        let skin = final_matrix(palette, weights);
        let bound = self.matrix.transform_point3(position);
        let bound_normal = self.normal_matrix * normal;
        (
            skin.transform_point3(bound),
            (skin.matrix3 * bound_normal).normalize_or_zero(),
        )
    }
}

/// Skins one vertex on the CPU.
///
/// Prefer [`BindShape::skin`] in loops; this recomputes the normal matrix.
#[must_use]
pub fn skin_vertex_software(
    bind_shape: &Affine3A,
    palette: &JointMatrixPalette,
    position: Vec3,
    normal: Vec3,
    weights: &JointWeights,
) -> (Vec3, Vec3) {
    BindShape::new(*bind_shape).skin(palette, position, normal, weights)
}
