//! Geometry writing: fills a face's buffer from its rest-pose geometry.
//!
//! Each sub-step is gated by its own [`FaceDirty`] bit and counted in
//! [`WriteCounters`], so a color-only edit never rewrites positions.

use glam::{Vec2, Vec3, Vec4};

use crate::errors::{Result, RiggedError};
use crate::renderer::geometry::texcoord::{planar_projection, transform_texcoords};
use crate::renderer::geometry::{GeometryBuffer, VertexDataMask};
use crate::renderer::skinning::{final_matrix, BindShape};
use crate::resources::JointWeights;
use crate::scene::{FaceDirty, JointMatrixPalette, MeshFace};

/// How many times each write sub-step actually ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounters {
    pub positions: u64,
    pub normals: u64,
    pub texcoords: u64,
    pub colors: u64,
    pub weights: u64,
    pub indices: u64,
}

impl WriteCounters {
    /// Sum over all sub-steps.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.positions + self.normals + self.texcoords + self.colors + self.weights + self.indices
    }
}

/// Skinning inputs of one geometry write.
#[derive(Debug, Clone, Copy)]
pub struct SkinInputs<'a> {
    pub bind_shape: &'a BindShape,
    /// Scrubbed weights of the face, one quadruple per vertex.
    pub weights: Option<&'a [JointWeights]>,
    /// Present only for a software bake.
    pub palette: Option<&'a JointMatrixPalette>,
}

impl SkinInputs<'static> {
    /// Inputs of an unskinned face.
    pub const RIGID: Self = Self {
        bind_shape: &BindShape::IDENTITY,
        weights: None,
        palette: None,
    };
}

impl SkinInputs<'_> {
    #[inline]
    fn weight(&self, vertex: usize) -> JointWeights {
        self.weights
            .and_then(|w| w.get(vertex))
            .copied()
            .unwrap_or(JointWeights::single(0))
    }
}

/// Writes every dirty sub-step of `face` into its buffer and clears the
/// dirty bits. A face without a buffer, or on the degenerate placeholder,
/// only has its bits cleared.
///
/// Fails with [`RiggedError::IndexOutOfRange`] when an index points past
/// the vertex count, or [`RiggedError::MalformedGeometry`] when the decoded
/// triangle list is shorter than the reported index count. The buffer is
/// left partially written in that case; the caller substitutes the
/// degenerate placeholder.
pub fn write_geometry(
    face: &mut MeshFace,
    skin: &SkinInputs<'_>,
    counters: &mut WriteCounters,
) -> Result<()> {
    let dirty = face.dirty;
    if dirty.is_empty() {
        return Ok(());
    }

    let Some(buffer) = face.buffer.as_mut() else {
        face.dirty = FaceDirty::empty();
        return Ok(());
    };
    if buffer.is_degenerate() {
        face.dirty = FaceDirty::empty();
        return Ok(());
    }

    let geometry = &*face.geometry;
    let mask = buffer.mask();
    let live = (buffer.vertex_count() as usize).min(geometry.vertex_count());

    if dirty.contains(FaceDirty::POSITION) && mask.contains(VertexDataMask::POSITION) {
        write_positions(buffer, &geometry.positions[..live], skin);
        counters.positions += 1;
    }

    if dirty.contains(FaceDirty::NORMAL) && mask.contains(VertexDataMask::NORMAL) {
        write_normals(buffer, &geometry.normals, live, skin);
        if mask.contains(VertexDataMask::TANGENT) {
            write_tangents(buffer, geometry.tangents.as_deref(), live, skin);
        }
        counters.normals += 1;
    }

    if dirty.contains(FaceDirty::TEXCOORD) && mask.contains(VertexDataMask::TEXCOORD0) {
        let source: Vec<Vec2> = match &face.planar {
            Some(planar) => (0..live)
                .map(|i| {
                    let normal = geometry.normals.get(i).copied().unwrap_or(Vec3::Z);
                    planar_projection(planar, geometry.positions[i], normal)
                })
                .collect(),
            None => (0..live)
                .map(|i| geometry.texcoords.get(i).copied().unwrap_or(Vec2::ZERO))
                .collect(),
        };
        transform_texcoords(&source, &mut buffer.texcoords[..live], &face.texture_transform);
        pad_tail(&mut buffer.texcoords, live);
        counters.texcoords += 1;
    }

    if dirty.contains(FaceDirty::COLOR) {
        let color = unorm4(face.material.color);
        if mask.contains(VertexDataMask::COLOR) {
            buffer.colors.fill(color);
        }
        if mask.contains(VertexDataMask::EMISSIVE) {
            let glow = unorm(face.material.glow);
            buffer.emissive.fill([color[0], color[1], color[2], glow]);
        }
        counters.colors += 1;
    }

    if dirty.contains(FaceDirty::WEIGHTS) && mask.contains(VertexDataMask::WEIGHT4) {
        for i in 0..live {
            let w = skin.weight(i);
            buffer.joints[i] = w.joints;
            buffer.weights[i] = Vec4::from_array(w.weights);
        }
        pad_tail(&mut buffer.joints, live);
        pad_tail(&mut buffer.weights, live);
        counters.weights += 1;
    }

    if dirty.contains(FaceDirty::INDICES) {
        let vertex_count = buffer.vertex_count();
        let base = u32::from(face.base_vertex);
        let wanted = buffer.index_count() as usize;
        if geometry.indices.len() < wanted {
            return Err(RiggedError::MalformedGeometry {
                vertex_count: face.vertex_count,
                index_count: face.index_count,
                reason: "triangle list shorter than reported index count",
            });
        }
        for (dst, &src) in buffer.indices.iter_mut().zip(&geometry.indices[..wanted]) {
            let index = u32::from(src) + base;
            if index >= vertex_count {
                return Err(RiggedError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
            // vertex_count never exceeds the u16 ceiling
            *dst = index as u16;
        }
        counters.indices += 1;
    }

    buffer.mark_written();
    face.dirty = FaceDirty::empty();
    Ok(())
}

fn write_positions(buffer: &mut GeometryBuffer, rest: &[Vec3], skin: &SkinInputs<'_>) {
    let live = rest.len();
    match skin.palette {
        Some(palette) => {
            for (i, &p) in rest.iter().enumerate() {
                let m = final_matrix(palette, &skin.weight(i));
                let bound = skin.bind_shape.position(p);
                buffer.positions[i] = m.transform_point3(bound).extend(1.0);
            }
        }
        None => {
            for (i, &p) in rest.iter().enumerate() {
                buffer.positions[i] = skin.bind_shape.position(p).extend(1.0);
            }
        }
    }
    pad_tail(&mut buffer.positions, live);
}

fn write_normals(buffer: &mut GeometryBuffer, rest: &[Vec3], live: usize, skin: &SkinInputs<'_>) {
    for i in 0..live {
        let n = rest.get(i).copied().unwrap_or(Vec3::Z);
        let n = match skin.palette {
            Some(palette) => {
                let m = final_matrix(palette, &skin.weight(i));
                (m.matrix3 * (skin.bind_shape.normal_matrix * n)).normalize_or_zero()
            }
            None => skin.bind_shape.normal(n),
        };
        buffer.normals[i] = n.extend(0.0);
    }
    pad_tail(&mut buffer.normals, live);
}

fn write_tangents(
    buffer: &mut GeometryBuffer,
    rest: Option<&[Vec4]>,
    live: usize,
    skin: &SkinInputs<'_>,
) {
    let bind = skin.bind_shape.matrix.matrix3;
    for i in 0..live {
        let t = rest.and_then(|t| t.get(i)).copied().unwrap_or(Vec4::new(1.0, 0.0, 0.0, 1.0));
        let mut xyz = bind * t.truncate();
        if let Some(palette) = skin.palette {
            xyz = final_matrix(palette, &skin.weight(i)).matrix3 * xyz;
        }
        buffer.tangents[i] = xyz.normalize_or_zero().extend(t.w);
    }
    pad_tail(&mut buffer.tangents, live);
}

/// Fills slots `live..` with a copy of the last live slot.
fn pad_tail<T: Copy>(slots: &mut [T], live: usize) {
    if live == 0 || live >= slots.len() {
        return;
    }
    let last = slots[live - 1];
    slots[live..].fill(last);
}

#[inline]
fn unorm(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn unorm4(c: Vec4) -> [u8; 4] {
    [unorm(c.x), unorm(c.y), unorm(c.z), unorm(c.w)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_repeats_last_live_slot() {
        let mut slots = [1, 2, 3, 0, 0];
        pad_tail(&mut slots, 3);
        assert_eq!(slots, [1, 2, 3, 3, 3]);
    }

    #[test]
    fn pad_without_live_slots_is_noop() {
        let mut slots = [0; 4];
        pad_tail(&mut slots, 0);
        assert_eq!(slots, [0; 4]);
    }

    #[test]
    fn unorm_clamps() {
        assert_eq!(unorm(-1.0), 0);
        assert_eq!(unorm(2.0), 255);
        assert_eq!(unorm(0.5), 128);
    }
}
