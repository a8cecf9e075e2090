use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Rest-pose geometry of one face of a mesh asset.
///
/// Owned by the asset layer and shared read-only (`Arc`) by every face that
/// instances the same asset. Counts are whatever the asset decoded; the
/// geometry manager validates them before they reach a buffer.
#[derive(Debug, Clone, Default)]
pub struct FaceGeometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Tangents with handedness in `w`. Only consulted when the face has a
    /// normal map.
    pub tangents: Option<Vec<Vec4>>,
    pub texcoords: Vec<Vec2>,
    /// Fixed triangle list, relative to the face's first vertex.
    pub indices: Vec<u16>,
}

impl FaceGeometry {
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// A flat grid of `columns x rows` quads in the XY plane, facing +Z.
    ///
    /// Handy for building test meshes with an exact vertex/triangle count.
    #[must_use]
    pub fn grid(columns: u16, rows: u16) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let stride = columns + 1;

        let mut positions = Vec::with_capacity(usize::from(stride) * usize::from(rows + 1));
        let mut texcoords = Vec::with_capacity(positions.capacity());
        for y in 0..=rows {
            for x in 0..=columns {
                let u = f32::from(x) / f32::from(columns);
                let v = f32::from(y) / f32::from(rows);
                positions.push(Vec3::new(u - 0.5, v - 0.5, 0.0));
                texcoords.push(Vec2::new(u, 1.0 - v));
            }
        }
        let normals = vec![Vec3::Z; positions.len()];

        let mut indices = Vec::with_capacity(usize::from(columns) * usize::from(rows) * 6);
        for y in 0..rows {
            for x in 0..columns {
                let i0 = y * stride + x;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;
                indices.extend_from_slice(&[i0, i1, i2, i2, i1, i3]);
            }
        }

        Self {
            positions,
            normals,
            tangents: None,
            texcoords,
            indices,
        }
    }
}

/// Per-face texture coordinate transform: rotation about the texture
/// center, then scale, then offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureTransform {
    pub offset: Vec2,
    pub scale: Vec2,
    /// Rotation in radians.
    pub rotation: f32,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TextureTransform {
    pub const IDENTITY: Self = Self {
        offset: Vec2::ZERO,
        scale: Vec2::ONE,
        rotation: 0.0,
    };

    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Planar texture projection: texcoords are generated from vertex positions
/// projected onto the plane picked by each vertex normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarProjection {
    /// Projection origin in face space.
    pub center: Vec3,
    /// Face extent used to normalise positions into `-0.5..0.5`.
    pub scale: Vec3,
}

impl Default for PlanarProjection {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}
