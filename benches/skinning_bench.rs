use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Affine3A, Quat, Vec2, Vec3};
use uuid::Uuid;

use myth_rigged::renderer::geometry::{transform_texcoords, transform_texcoords_scalar};
use myth_rigged::renderer::skinning::skin_vertex_software;
use myth_rigged::scene::JointMatrixPalette;
use myth_rigged::{
    CommandRecorder, FaceDesc, FaceGeometry, FaceRole, JointWeights, MaterialSignature,
    RiggedRenderer, RiggedSettings, SkeletonPose, SkinBinding, TextureTransform,
};

// ---------------------------------------------------------------------------
// Vertex skinning
// ---------------------------------------------------------------------------

fn bench_skin_vertices(c: &mut Criterion) {
    let palette = JointMatrixPalette::from_matrices(
        (0..32)
            .map(|j| Affine3A::from_rotation_translation(Quat::from_rotation_y(j as f32 * 0.1), Vec3::Y))
            .collect(),
    );
    let weights: Vec<JointWeights> = (0..4096u16)
        .map(|i| JointWeights::new([i % 32, (i + 1) % 32, (i + 7) % 32, 0], [0.5, 0.3, 0.2, 0.0]))
        .collect();
    let positions: Vec<Vec3> = (0..4096).map(|i| Vec3::splat(i as f32 * 0.001)).collect();

    c.bench_function("skin_4096_vertices", |b| {
        b.iter(|| {
            for (p, w) in positions.iter().zip(&weights) {
                black_box(skin_vertex_software(
                    &Affine3A::IDENTITY,
                    &palette,
                    *p,
                    Vec3::Y,
                    w,
                ));
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Texture coordinate transforms
// ---------------------------------------------------------------------------

fn bench_texcoords(c: &mut Criterion) {
    let transform = TextureTransform {
        offset: Vec2::new(0.25, -0.1),
        scale: Vec2::new(2.0, 0.5),
        rotation: 0.7,
    };

    let mut group = c.benchmark_group("texcoord_transform");
    for len in [64usize, 1024, 16384] {
        let src: Vec<Vec2> = (0..len).map(|i| Vec2::new(i as f32 / len as f32, 0.5)).collect();
        let mut dst = vec![Vec2::ZERO; len];

        group.bench_with_input(BenchmarkId::new("wide", len), &src, |b, src| {
            b.iter(|| transform_texcoords(black_box(src), &mut dst, &transform));
        });
        group.bench_with_input(BenchmarkId::new("scalar", len), &src, |b, src| {
            b.iter(|| transform_texcoords_scalar(black_box(src), &mut dst, &transform));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Whole frame
// ---------------------------------------------------------------------------

fn bench_software_frame(c: &mut Criterion) {
    let mut renderer = RiggedRenderer::new(RiggedSettings::default()).expect("valid settings");
    let geometry = Arc::new(FaceGeometry::grid(64, 64));
    let weights = vec![JointWeights::new([0, 1, 0, 0], [0.5, 0.5, 0.0, 0.0]); geometry.vertex_count()];
    let binding = Arc::new(SkinBinding::new(
        Uuid::new_v4(),
        Affine3A::IDENTITY,
        &["mPelvis", "mTorso"],
        Vec::new(),
        vec![weights],
    ));

    let instance = renderer.add_instance(Some(binding));
    let desc = FaceDesc::new(geometry, MaterialSignature::default()).with_role(FaceRole::AvatarSkinned);
    renderer.add_face(instance, desc).expect("face");

    let mut recorder = CommandRecorder::without_hardware_skinning();
    let mut angle = 0.0f32;
    c.bench_function("software_frame_4225_vertices", |b| {
        b.iter(|| {
            angle += 0.01;
            let pose = SkeletonPose::new()
                .with_joint("mPelvis", Affine3A::IDENTITY)
                .with_joint("mTorso", Affine3A::from_rotation_z(angle));
            renderer.set_pose(instance, pose).expect("instance");
            recorder.clear();
            black_box(renderer.render_frame(&[instance], &mut recorder));
        });
    });
}

criterion_group!(benches, bench_skin_vertices, bench_texcoords, bench_software_frame);
criterion_main!(benches);
