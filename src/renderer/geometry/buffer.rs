//! Per-face geometry buffer.
//!
//! A [`GeometryBuffer`] is the CPU-side image of one face's vertex and index
//! allocation. Attributes are stored planar (one `Vec` per attribute) and
//! interleaved on demand for upload by the GPU abstraction layer.

use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use glam::{Vec2, Vec4};
use wgpu::{BufferUsages, VertexAttribute, VertexFormat};

use crate::resources::{FaceRole, MaterialSignature};

/// Vertex capacities are padded to a multiple of this many vertices so that
/// wide (4-lane) writers never touch a partial block.
pub const VERTEX_ALIGNMENT: u32 = 4;

/// Vertex capacity of the degenerate placeholder (one aligned block).
pub const DEGENERATE_VERTEX_CAPACITY: u32 = VERTEX_ALIGNMENT;

/// Index count of the degenerate placeholder (one triangle).
pub const DEGENERATE_INDEX_COUNT: u32 = 3;

static NEXT_GEOMETRY_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

bitflags! {
    /// Attribute layout of a geometry buffer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct VertexDataMask: u32 {
        const POSITION  = 1 << 0;
        const NORMAL    = 1 << 1;
        const TANGENT   = 1 << 2;
        const TEXCOORD0 = 1 << 3;
        const COLOR     = 1 << 4;
        const EMISSIVE  = 1 << 5;
        /// Joint indices plus weights, for shader-side skinning.
        const WEIGHT4   = 1 << 6;
    }
}

impl VertexDataMask {
    /// Mask of the attributes every face carries.
    pub const BASE: Self = Self::POSITION
        .union(Self::NORMAL)
        .union(Self::TEXCOORD0)
        .union(Self::COLOR);

    /// Mask of a rigged attachment face. The emissive lane is always present
    /// so that glow edits, including to and from zero, keep the layout.
    pub const RIGGED: Self = Self::BASE.union(Self::EMISSIVE);

    /// Layout needed to draw a face of `role` with `material`.
    ///
    /// Weights are only stored when the shader does the skinning; a
    /// software-skinned face has its positions baked instead. Body faces
    /// ignore glow and carry no emissive lane.
    #[must_use]
    pub fn for_face(role: FaceRole, material: &MaterialSignature, hardware_skinned: bool) -> Self {
        let mut mask = match role {
            FaceRole::Rigged => Self::RIGGED,
            FaceRole::AvatarSkinned | FaceRole::AvatarRigid => Self::BASE,
        };
        mask.set(Self::TANGENT, material.normal_map.is_some());
        mask.set(Self::WEIGHT4, hardware_skinned);
        mask
    }

    /// Attribute formats in interleaving order.
    #[must_use]
    pub fn vertex_formats(self) -> Vec<(Self, VertexFormat)> {
        let table = [
            (Self::POSITION, VertexFormat::Float32x4),
            (Self::NORMAL, VertexFormat::Float32x4),
            (Self::TANGENT, VertexFormat::Float32x4),
            (Self::TEXCOORD0, VertexFormat::Float32x2),
            (Self::COLOR, VertexFormat::Unorm8x4),
            (Self::EMISSIVE, VertexFormat::Unorm8x4),
            (Self::WEIGHT4, VertexFormat::Uint16x4),
            (Self::WEIGHT4, VertexFormat::Float32x4),
        ];
        table
            .into_iter()
            .filter(|(flag, _)| self.contains(*flag))
            .collect()
    }

    /// Interleaved vertex stride in bytes.
    #[must_use]
    pub fn vertex_stride(self) -> u64 {
        self.vertex_formats()
            .iter()
            .map(|(_, format)| format.size())
            .sum()
    }

    /// Vertex attribute descriptors, shader locations assigned in order.
    #[must_use]
    pub fn vertex_attributes(self) -> Vec<VertexAttribute> {
        let mut offset = 0;
        self.vertex_formats()
            .into_iter()
            .enumerate()
            .map(|(location, (_, format))| {
                let attribute = VertexAttribute {
                    format,
                    offset,
                    shader_location: location as u32,
                };
                offset += format.size();
                attribute
            })
            .collect()
    }
}

/// Rounds a vertex count up to the vertex alignment.
#[inline]
#[must_use]
pub const fn align_vertices(count: u32) -> u32 {
    count.div_ceil(VERTEX_ALIGNMENT) * VERTEX_ALIGNMENT
}

/// Vertex and index storage of exactly one face.
#[derive(Debug)]
pub struct GeometryBuffer {
    id: u64,
    mask: VertexDataMask,
    pub usage: BufferUsages,

    vertex_count: u32,
    index_count: u32,
    degenerate: bool,
    version: u64,

    pub(crate) positions: Vec<Vec4>,
    pub(crate) normals: Vec<Vec4>,
    pub(crate) tangents: Vec<Vec4>,
    pub(crate) texcoords: Vec<Vec2>,
    pub(crate) colors: Vec<[u8; 4]>,
    pub(crate) emissive: Vec<[u8; 4]>,
    pub(crate) joints: Vec<[u16; 4]>,
    pub(crate) weights: Vec<Vec4>,
    pub(crate) indices: Vec<u16>,
}

impl GeometryBuffer {
    /// Allocates a zero-filled buffer for `vertex_count` vertices (padded to
    /// the vertex alignment) and exactly `index_count` indices.
    #[must_use]
    pub fn new(mask: VertexDataMask, vertex_count: u32, index_count: u32) -> Self {
        let mut buffer = Self {
            id: NEXT_GEOMETRY_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            mask,
            usage: BufferUsages::VERTEX | BufferUsages::INDEX | BufferUsages::COPY_DST,
            vertex_count: 0,
            index_count: 0,
            degenerate: false,
            version: 0,
            positions: Vec::new(),
            normals: Vec::new(),
            tangents: Vec::new(),
            texcoords: Vec::new(),
            colors: Vec::new(),
            emissive: Vec::new(),
            joints: Vec::new(),
            weights: Vec::new(),
            indices: Vec::new(),
        };
        buffer.resize(vertex_count, index_count);
        buffer
    }

    /// The one-triangle placeholder substituted for geometry that cannot be
    /// allocated. Every lane is zero, every index points at vertex 0.
    #[must_use]
    pub fn degenerate(mask: VertexDataMask) -> Self {
        let mut buffer = Self::new(mask, 1, DEGENERATE_INDEX_COUNT);
        buffer.degenerate = true;
        buffer
    }

    /// Resizes in place. Storage is kept when shrinking and grown otherwise;
    /// the buffer id is preserved either way.
    pub fn resize(&mut self, vertex_count: u32, index_count: u32) {
        let capacity = align_vertices(vertex_count) as usize;
        let m = self.mask;

        resize_attr(&mut self.positions, m.contains(VertexDataMask::POSITION), capacity, Vec4::ZERO);
        resize_attr(&mut self.normals, m.contains(VertexDataMask::NORMAL), capacity, Vec4::ZERO);
        resize_attr(&mut self.tangents, m.contains(VertexDataMask::TANGENT), capacity, Vec4::ZERO);
        resize_attr(&mut self.texcoords, m.contains(VertexDataMask::TEXCOORD0), capacity, Vec2::ZERO);
        resize_attr(&mut self.colors, m.contains(VertexDataMask::COLOR), capacity, [0; 4]);
        resize_attr(&mut self.emissive, m.contains(VertexDataMask::EMISSIVE), capacity, [0; 4]);
        resize_attr(&mut self.joints, m.contains(VertexDataMask::WEIGHT4), capacity, [0; 4]);
        resize_attr(&mut self.weights, m.contains(VertexDataMask::WEIGHT4), capacity, Vec4::ZERO);
        self.indices.resize(index_count as usize, 0);

        self.vertex_count = vertex_count;
        self.index_count = index_count;
        self.version = self.version.wrapping_add(1);
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn mask(&self) -> VertexDataMask {
        self.mask
    }

    /// Live vertex count (before alignment padding).
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Allocated vertex slots, including alignment padding.
    #[inline]
    #[must_use]
    pub fn vertex_capacity(&self) -> u32 {
        align_vertices(self.vertex_count)
    }

    #[inline]
    #[must_use]
    pub fn index_capacity(&self) -> u32 {
        self.indices.len() as u32
    }

    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Bumped on every content change; the upload layer compares it.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn mark_written(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Bytes this buffer occupies on the GPU.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        Self::byte_size_for(self.mask, self.vertex_count, self.index_count)
    }

    /// Bytes a buffer with this layout and these counts would occupy.
    #[must_use]
    pub fn byte_size_for(mask: VertexDataMask, vertex_count: u32, index_count: u32) -> u64 {
        mask.vertex_stride() * u64::from(align_vertices(vertex_count))
            + std::mem::size_of::<u16>() as u64 * u64::from(index_count)
    }

    #[must_use]
    pub fn positions(&self) -> &[Vec4] {
        &self.positions
    }

    #[must_use]
    pub fn normals(&self) -> &[Vec4] {
        &self.normals
    }

    #[must_use]
    pub fn tangents(&self) -> &[Vec4] {
        &self.tangents
    }

    #[must_use]
    pub fn texcoords(&self) -> &[Vec2] {
        &self.texcoords
    }

    #[must_use]
    pub fn colors(&self) -> &[[u8; 4]] {
        &self.colors
    }

    #[must_use]
    pub fn emissive(&self) -> &[[u8; 4]] {
        &self.emissive
    }

    #[must_use]
    pub fn joints(&self) -> &[[u16; 4]] {
        &self.joints
    }

    #[must_use]
    pub fn weights(&self) -> &[Vec4] {
        &self.weights
    }

    #[must_use]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Interleaves every vertex slot (padding included) for upload.
    #[must_use]
    pub fn interleaved_vertices(&self) -> Vec<u8> {
        let capacity = self.vertex_capacity() as usize;
        let mut bytes = Vec::with_capacity(self.mask.vertex_stride() as usize * capacity);
        for i in 0..capacity {
            if self.mask.contains(VertexDataMask::POSITION) {
                bytes.extend_from_slice(bytemuck::bytes_of(&self.positions[i]));
            }
            if self.mask.contains(VertexDataMask::NORMAL) {
                bytes.extend_from_slice(bytemuck::bytes_of(&self.normals[i]));
            }
            if self.mask.contains(VertexDataMask::TANGENT) {
                bytes.extend_from_slice(bytemuck::bytes_of(&self.tangents[i]));
            }
            if self.mask.contains(VertexDataMask::TEXCOORD0) {
                bytes.extend_from_slice(bytemuck::bytes_of(&self.texcoords[i]));
            }
            if self.mask.contains(VertexDataMask::COLOR) {
                bytes.extend_from_slice(&self.colors[i]);
            }
            if self.mask.contains(VertexDataMask::EMISSIVE) {
                bytes.extend_from_slice(&self.emissive[i]);
            }
            if self.mask.contains(VertexDataMask::WEIGHT4) {
                bytes.extend_from_slice(bytemuck::bytes_of(&self.joints[i]));
                bytes.extend_from_slice(bytemuck::bytes_of(&self.weights[i]));
            }
        }
        bytes
    }

    /// Index data for upload.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

fn resize_attr<T: Clone>(attr: &mut Vec<T>, present: bool, capacity: usize, zero: T) {
    if present {
        attr.resize(capacity, zero);
    } else {
        attr.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_matches_formats() {
        let mask = VertexDataMask::BASE;
        // position 16 + normal 16 + uv 8 + color 4
        assert_eq!(mask.vertex_stride(), 44);

        let skinned = mask | VertexDataMask::WEIGHT4;
        assert_eq!(skinned.vertex_stride(), 44 + 8 + 16);
    }

    #[test]
    fn glow_does_not_change_layout() {
        let dark = MaterialSignature::default();
        let glowing = MaterialSignature {
            glow: 0.5,
            ..Default::default()
        };
        let rigged = VertexDataMask::for_face(FaceRole::Rigged, &dark, false);
        assert_eq!(rigged, VertexDataMask::RIGGED);
        assert_eq!(VertexDataMask::for_face(FaceRole::Rigged, &glowing, false), rigged);
        assert_eq!(
            VertexDataMask::for_face(FaceRole::AvatarSkinned, &glowing, true),
            VertexDataMask::BASE | VertexDataMask::WEIGHT4
        );
    }

    #[test]
    fn attributes_are_packed_in_order() {
        let attrs = VertexDataMask::BASE.vertex_attributes();
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[1].offset, 16);
        assert_eq!(attrs[2].offset, 32);
        assert_eq!(attrs[3].offset, 40);
        assert_eq!(attrs[3].shader_location, 3);
    }

    #[test]
    fn interleaved_size_matches_stride() {
        let buffer = GeometryBuffer::new(VertexDataMask::BASE, 6, 6);
        assert_eq!(buffer.vertex_capacity(), 8);
        assert_eq!(
            buffer.interleaved_vertices().len() as u64,
            VertexDataMask::BASE.vertex_stride() * 8
        );
        assert_eq!(buffer.index_bytes().len(), 12);
    }

    #[test]
    fn degenerate_is_one_zeroed_triangle() {
        let buffer = GeometryBuffer::degenerate(VertexDataMask::BASE);
        assert!(buffer.is_degenerate());
        assert_eq!(buffer.vertex_capacity(), DEGENERATE_VERTEX_CAPACITY);
        assert_eq!(buffer.indices(), &[0, 0, 0]);
        assert!(buffer.positions().iter().all(|p| *p == Vec4::ZERO));
    }
}
