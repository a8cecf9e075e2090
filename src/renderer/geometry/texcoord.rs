//! Texture coordinate generation.
//!
//! The texture transform is pure 2D affine math. Four coordinates at a time
//! go through a `Vec4`-lane path; the tail goes through the scalar path.
//! Both perform the same IEEE operations in the same order (no fused
//! multiply-add), so their results are bit-identical.

use glam::{Vec2, Vec3, Vec4};

use crate::resources::{PlanarProjection, TextureTransform};

/// Precomputed terms of a [`TextureTransform`].
#[derive(Debug, Clone, Copy)]
struct Xform {
    cos: f32,
    sin: f32,
    scale: Vec2,
    /// `offset + 0.5`, re-centring after rotation about the texture center.
    bias: Vec2,
}

impl From<&TextureTransform> for Xform {
    fn from(t: &TextureTransform) -> Self {
        Self {
            cos: t.rotation.cos(),
            sin: t.rotation.sin(),
            scale: t.scale,
            bias: Vec2::new(t.offset.x + 0.5, t.offset.y + 0.5),
        }
    }
}

#[inline]
fn xform_scalar(x: &Xform, tc: Vec2) -> Vec2 {
    let s = tc.x - 0.5;
    let t = tc.y - 0.5;
    let ss = s * x.cos + t * x.sin;
    let tt = -s * x.sin + t * x.cos;
    Vec2::new(ss * x.scale.x + x.bias.x, tt * x.scale.y + x.bias.y)
}

#[inline]
fn xform_wide(x: &Xform, src: &[Vec2], dst: &mut [Vec2]) {
    let half = Vec4::splat(0.5);
    let cos = Vec4::splat(x.cos);
    let sin = Vec4::splat(x.sin);
    let scale_s = Vec4::splat(x.scale.x);
    let scale_t = Vec4::splat(x.scale.y);
    let bias_s = Vec4::splat(x.bias.x);
    let bias_t = Vec4::splat(x.bias.y);

    let s = Vec4::new(src[0].x, src[1].x, src[2].x, src[3].x) - half;
    let t = Vec4::new(src[0].y, src[1].y, src[2].y, src[3].y) - half;
    let ss = s * cos + t * sin;
    let tt = -s * sin + t * cos;
    let out_s = ss * scale_s + bias_s;
    let out_t = tt * scale_t + bias_t;

    let out_s = out_s.to_array();
    let out_t = out_t.to_array();
    for lane in 0..4 {
        dst[lane] = Vec2::new(out_s[lane], out_t[lane]);
    }
}

/// Applies `transform` to `src`, writing `dst`. Lengths must match.
pub fn transform_texcoords(src: &[Vec2], dst: &mut [Vec2], transform: &TextureTransform) {
    debug_assert_eq!(src.len(), dst.len());

    if transform.is_identity() {
        dst.copy_from_slice(src);
        return;
    }

    let x = Xform::from(transform);
    let mut src_chunks = src.chunks_exact(4);
    let mut dst_chunks = dst.chunks_exact_mut(4);
    for (s, d) in (&mut src_chunks).zip(&mut dst_chunks) {
        xform_wide(&x, s, d);
    }
    for (s, d) in src_chunks
        .remainder()
        .iter()
        .zip(dst_chunks.into_remainder())
    {
        *d = xform_scalar(&x, *s);
    }
}

/// Scalar-only variant of [`transform_texcoords`].
pub fn transform_texcoords_scalar(src: &[Vec2], dst: &mut [Vec2], transform: &TextureTransform) {
    if transform.is_identity() {
        dst.copy_from_slice(src);
        return;
    }
    let x = Xform::from(transform);
    for (s, d) in src.iter().zip(dst.iter_mut()) {
        *d = xform_scalar(&x, *s);
    }
}

/// Generates a planar texture coordinate for one vertex.
///
/// The projection plane follows the dominant axis of the normal: X-facing
/// vertices project onto YZ, the rest onto XZ.
#[must_use]
pub fn planar_projection(projection: &PlanarProjection, position: Vec3, normal: Vec3) -> Vec2 {
    let d = normal.x;
    let binormal = if d >= 0.5 || d <= -0.5 {
        if d < 0.0 { Vec3::NEG_Y } else { Vec3::Y }
    } else if normal.y > 0.0 {
        Vec3::NEG_X
    } else {
        Vec3::X
    };
    let tangent = binormal.cross(normal);
    let v = (position - projection.center) * projection.scale;

    Vec2::new(
        1.0 + (binormal.dot(v) * 2.0 - 0.5),
        -(tangent.dot(v) * 2.0 - 0.5),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_copies() {
        let src = [Vec2::new(0.25, 0.75), Vec2::new(1.0, 0.0)];
        let mut dst = [Vec2::ZERO; 2];
        transform_texcoords(&src, &mut dst, &TextureTransform::IDENTITY);
        assert_eq!(src, dst);
    }

    #[test]
    fn offset_only_translates() {
        let transform = TextureTransform {
            offset: Vec2::new(0.25, -0.5),
            ..TextureTransform::IDENTITY
        };
        let src = [Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.5)];
        let mut dst = [Vec2::ZERO; 2];
        transform_texcoords(&src, &mut dst, &transform);
        assert!((dst[0] - Vec2::new(0.25, -0.5)).length() < 1e-6);
        assert!((dst[1] - Vec2::new(0.75, 0.0)).length() < 1e-6);
    }
}
