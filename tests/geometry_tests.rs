//! Geometry Buffer Tests
//!
//! Tests for:
//! - Buffer sizing through the renderer (exact counts, alignment padding)
//! - Malformed and oversized counts (degenerate placeholder)
//! - Rest-pose round trip and tail padding
//! - Dirty-flag gated rewrites (idempotence, per-sub-step counters)
//! - Texture coordinate transforms (wide vs scalar, planar projection)

use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};

use myth_rigged::renderer::geometry::{
    align_vertices, planar_projection, transform_texcoords, transform_texcoords_scalar,
    VertexDataMask,
};
use myth_rigged::{
    CommandRecorder, FaceDesc, FaceGeometry, FaceKey, InstanceKey, MaterialSignature,
    PlanarProjection, RiggedRenderer, RiggedSettings, ShadingPath, TextureTransform,
};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn forward() -> RiggedRenderer {
    let settings = RiggedSettings {
        shading: ShadingPath::Forward,
        ..Default::default()
    };
    RiggedRenderer::new(settings).expect("valid settings")
}

fn static_face(renderer: &mut RiggedRenderer, desc: FaceDesc) -> (InstanceKey, FaceKey) {
    let instance = renderer.add_instance(None);
    let face = renderer.add_face(instance, desc).expect("face");
    (instance, face)
}

fn grid_desc(columns: u16, rows: u16) -> FaceDesc {
    FaceDesc::new(
        Arc::new(FaceGeometry::grid(columns, rows)),
        MaterialSignature::default(),
    )
}

fn frame(renderer: &mut RiggedRenderer, visible: &[InstanceKey]) -> CommandRecorder {
    let mut recorder = CommandRecorder::new();
    renderer.render_frame(visible, &mut recorder);
    recorder
}

// ============================================================================
// Buffer Sizing
// ============================================================================

#[test]
fn buffer_matches_requested_counts() {
    let mut renderer = forward();
    // 3x2 grid: 12 vertices, 36 indices
    let (instance, face) = static_face(&mut renderer, grid_desc(3, 2));
    frame(&mut renderer, &[instance]);

    let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
    assert_eq!(buffer.vertex_count(), 12);
    assert_eq!(buffer.vertex_capacity(), 12);
    assert_eq!(buffer.index_capacity(), 36);
    assert!(!buffer.is_degenerate());
}

#[test]
fn capacity_rounds_up_only_for_alignment() {
    for vertices in [1u32, 3, 4, 5, 9, 100, 65535] {
        let capacity = align_vertices(vertices);
        assert!(capacity >= vertices);
        assert!(capacity - vertices < 4);
        assert_eq!(capacity % 4, 0);
    }

    let mut renderer = forward();
    // 2x2 grid: 9 vertices
    let (instance, face) = static_face(&mut renderer, grid_desc(2, 2));
    frame(&mut renderer, &[instance]);

    let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
    assert_eq!(buffer.vertex_count(), 9);
    assert_eq!(buffer.vertex_capacity(), 12);
    assert_eq!(buffer.positions().len(), 12);
}

#[test]
fn malformed_counts_never_panic() {
    let cases: [(i64, i64); 5] = [(-1, 3), (9, -3), (70_000, 24), (i64::MAX, 24), (9, 7)];
    for (vertices, indices) in cases {
        let mut renderer = forward();
        let (instance, face) =
            static_face(&mut renderer, grid_desc(2, 2).with_reported_counts(vertices, indices));
        let stats = renderer.render_frame(&[instance], &mut CommandRecorder::new());

        let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("placeholder");
        assert!(buffer.is_degenerate(), "({vertices}, {indices})");
        assert!(buffer.vertex_capacity() > 0);
        assert_eq!(buffer.index_count(), 3);
        assert!(buffer.indices().iter().all(|&i| i == 0));
        assert_eq!(stats.degenerate_substitutions, 1);
        assert!(renderer.instance(instance).is_some_and(|i| i.is_quarantined()));
    }
}

#[test]
fn lower_vertex_ceiling_applies_on_next_frame() {
    let mut renderer = forward();
    let (instance, face) = static_face(&mut renderer, grid_desc(3, 2));
    frame(&mut renderer, &[instance]);

    let settings = RiggedSettings {
        max_vertices_per_buffer: 8,
        ..renderer.settings().clone()
    };
    renderer.set_settings(settings).expect("valid settings");
    frame(&mut renderer, &[instance]);

    assert!(renderer.face(face).is_some_and(|f| f.is_degenerate()));
}

#[test]
fn budget_exhaustion_degrades_instead_of_failing() {
    let per_face = myth_rigged::GeometryBuffer::byte_size_for(VertexDataMask::RIGGED, 9, 24);
    let settings = RiggedSettings {
        shading: ShadingPath::Forward,
        geometry_budget_bytes: per_face,
        ..Default::default()
    };
    let mut renderer = RiggedRenderer::new(settings).expect("valid settings");
    let (a, face_a) = static_face(&mut renderer, grid_desc(2, 2));
    let (b, face_b) = static_face(&mut renderer, grid_desc(2, 2));

    let stats = renderer.render_frame(&[a, b], &mut CommandRecorder::new());

    assert!(renderer.face(face_a).is_some_and(|f| !f.is_degenerate()));
    assert!(renderer.face(face_b).is_some_and(|f| f.is_degenerate()));
    assert_eq!(stats.degenerate_substitutions, 1);
    assert_eq!(stats.draw_calls, 1);
}

#[test]
fn geometry_swap_resizes_in_place() {
    let mut renderer = forward();
    let (instance, face) = static_face(&mut renderer, grid_desc(3, 3));
    frame(&mut renderer, &[instance]);
    let id = renderer.face(face).and_then(|f| f.buffer()).map(|b| b.id());

    renderer
        .set_face_geometry(face, Arc::new(FaceGeometry::grid(2, 2)), None)
        .expect("face");
    let stats = renderer.render_frame(&[instance], &mut CommandRecorder::new());

    let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
    assert_eq!(Some(buffer.id()), id);
    assert_eq!(buffer.vertex_count(), 9);
    assert_eq!(buffer.index_count(), 24);
    assert_eq!(stats.buffers_resized, 1);
    assert_eq!(stats.buffers_allocated, 0);
}

// ============================================================================
// Geometry Writing
// ============================================================================

#[test]
fn static_face_round_trips_rest_positions() {
    let mut renderer = forward();
    let geometry = Arc::new(FaceGeometry::grid(3, 2));
    let desc = FaceDesc::new(geometry.clone(), MaterialSignature::default());
    let (instance, face) = static_face(&mut renderer, desc);
    frame(&mut renderer, &[instance]);

    let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
    for (i, rest) in geometry.positions.iter().enumerate() {
        assert_eq!(buffer.positions()[i], rest.extend(1.0), "vertex {i}");
        assert_eq!(buffer.normals()[i].truncate(), geometry.normals[i]);
    }
    let indices: Vec<u16> = buffer.indices().to_vec();
    assert_eq!(indices, geometry.indices);
}

#[test]
fn padding_repeats_last_vertex() {
    let mut renderer = forward();
    let (instance, face) = static_face(&mut renderer, grid_desc(2, 2));
    frame(&mut renderer, &[instance]);

    let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
    let last = buffer.positions()[8];
    assert!(buffer.positions()[9..].iter().all(|&p| p == last));
    let last_uv = buffer.texcoords()[8];
    assert!(buffer.texcoords()[9..].iter().all(|&t| t == last_uv));
}

#[test]
fn second_frame_rewrites_nothing() {
    let mut renderer = forward();
    let (instance, face) = static_face(&mut renderer, grid_desc(3, 2));
    frame(&mut renderer, &[instance]);

    let counters = renderer.geometry().counters();
    let (version, positions) = {
        let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
        (buffer.version(), buffer.positions().to_vec())
    };

    frame(&mut renderer, &[instance]);

    let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
    assert_eq!(renderer.geometry().counters(), counters);
    assert_eq!(buffer.version(), version);
    assert_eq!(buffer.positions(), positions.as_slice());
}

#[test]
fn color_is_broadcast_to_every_vertex() {
    let mut renderer = forward();
    let material = MaterialSignature {
        color: Vec4::new(1.0, 0.0, 0.0, 1.0),
        ..Default::default()
    };
    let desc = FaceDesc::new(Arc::new(FaceGeometry::grid(2, 2)), material);
    let (instance, face) = static_face(&mut renderer, desc);
    frame(&mut renderer, &[instance]);

    let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
    assert!(buffer.colors().iter().all(|&c| c == [255, 0, 0, 255]));
    // rigged faces always carry the emissive lane, dark without glow
    assert!(buffer.emissive().iter().all(|&e| e == [255, 0, 0, 0]));
}

#[test]
fn texture_transform_only_rewrites_texcoords() {
    let mut renderer = forward();
    let (instance, face) = static_face(&mut renderer, grid_desc(2, 2));
    frame(&mut renderer, &[instance]);
    let before = renderer.geometry().counters();

    let transform = TextureTransform {
        offset: Vec2::new(0.25, 0.0),
        ..TextureTransform::IDENTITY
    };
    renderer.set_texture_transform(face, transform).expect("face");
    frame(&mut renderer, &[instance]);

    let after = renderer.geometry().counters();
    assert_eq!(after.texcoords, before.texcoords + 1);
    assert_eq!(after.positions, before.positions);
    assert_eq!(after.colors, before.colors);

    let geometry = FaceGeometry::grid(2, 2);
    let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
    for (i, uv) in geometry.texcoords.iter().enumerate() {
        assert!(approx(buffer.texcoords()[i].x, uv.x + 0.25));
        assert!(approx(buffer.texcoords()[i].y, uv.y));
    }
}

#[test]
fn bad_index_falls_back_to_placeholder() {
    let mut geometry = FaceGeometry::grid(2, 2);
    geometry.indices[4] = 200;
    let mut renderer = forward();
    let desc = FaceDesc::new(Arc::new(geometry), MaterialSignature::default());
    let (instance, face) = static_face(&mut renderer, desc);

    let stats = renderer.render_frame(&[instance], &mut CommandRecorder::new());

    assert!(renderer.face(face).is_some_and(|f| f.is_degenerate()));
    assert_eq!(stats.quarantined, 1);
    assert_eq!(stats.draw_calls, 0);
}

// ============================================================================
// Texture Coordinates
// ============================================================================

fn sample_texcoords(n: usize) -> Vec<Vec2> {
    (0..n)
        .map(|i| {
            let f = i as f32;
            Vec2::new(f * 0.137 - 0.3, 1.0 - f * 0.071)
        })
        .collect()
}

#[test]
fn wide_and_scalar_paths_are_bit_identical() {
    let transforms = [
        TextureTransform {
            offset: Vec2::new(0.1, -0.2),
            scale: Vec2::new(2.0, 0.5),
            rotation: FRAC_PI_4,
        },
        TextureTransform {
            offset: Vec2::ZERO,
            scale: Vec2::new(-1.0, 3.5),
            rotation: 2.9,
        },
        TextureTransform {
            offset: Vec2::new(1e6, -1e-6),
            scale: Vec2::splat(1e-3),
            rotation: -0.001,
        },
    ];
    for len in [0, 1, 4, 7, 13, 64] {
        let src = sample_texcoords(len);
        for t in &transforms {
            let mut wide = vec![Vec2::ZERO; len];
            let mut scalar = vec![Vec2::ZERO; len];
            transform_texcoords(&src, &mut wide, t);
            transform_texcoords_scalar(&src, &mut scalar, t);
            for (w, s) in wide.iter().zip(&scalar) {
                assert_eq!(w.x.to_bits(), s.x.to_bits(), "len {len}, {t:?}");
                assert_eq!(w.y.to_bits(), s.y.to_bits(), "len {len}, {t:?}");
            }
        }
    }
}

#[test]
fn rotation_turns_about_texture_center() {
    let t = TextureTransform {
        rotation: std::f32::consts::PI,
        ..TextureTransform::IDENTITY
    };
    let src = [Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.5)];
    let mut dst = [Vec2::ZERO; 2];
    transform_texcoords_scalar(&src, &mut dst, &t);

    assert!(approx(dst[0].x, 1.0) && approx(dst[0].y, 1.0), "{:?}", dst[0]);
    assert!(approx(dst[1].x, 0.5) && approx(dst[1].y, 0.5));
}

#[test]
fn planar_projection_is_used_when_set() {
    let mut renderer = forward();
    let projection = PlanarProjection::default();
    let (instance, face) = static_face(&mut renderer, grid_desc(1, 1).with_planar(projection));
    frame(&mut renderer, &[instance]);

    let geometry = FaceGeometry::grid(1, 1);
    let buffer = renderer.face(face).and_then(|f| f.buffer()).expect("buffer");
    for i in 0..geometry.vertex_count() {
        let expected = planar_projection(&projection, geometry.positions[i], Vec3::Z);
        assert_eq!(buffer.texcoords()[i], expected);
    }
}
