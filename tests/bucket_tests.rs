//! Face Bucket Tests
//!
//! Tests for:
//! - Classification of faces into buckets by role and material
//! - Registry invariant under add / remove / reclassify sequences
//! - Swap-removal index fix-up

use std::sync::Arc;

use glam::Vec4;

use myth_rigged::renderer::buckets::classify;
use myth_rigged::{
    AlphaMode, BucketId, FaceDesc, FaceGeometry, FaceKey, FaceRole, InstanceKey,
    MaterialSignature, RiggedRenderer, RiggedSettings, TextureId,
};

fn renderer() -> RiggedRenderer {
    RiggedRenderer::new(RiggedSettings::default()).expect("valid settings")
}

fn add(renderer: &mut RiggedRenderer, instance: InstanceKey, material: MaterialSignature) -> FaceKey {
    let desc = FaceDesc::new(Arc::new(FaceGeometry::grid(1, 1)), material);
    renderer.add_face(instance, desc).expect("face")
}

fn bucket_of(renderer: &RiggedRenderer, face: FaceKey) -> Option<BucketId> {
    renderer.face(face).and_then(|f| f.bucket()).map(|slot| slot.bucket)
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn material_signature_picks_bucket() {
    let blend = MaterialSignature {
        alpha_mode: AlphaMode::Blend,
        ..Default::default()
    };
    assert_eq!(classify(FaceRole::Rigged, &blend), BucketId::Alpha);

    let fullbright_blend = MaterialSignature {
        fullbright: true,
        ..blend.clone()
    };
    assert_eq!(classify(FaceRole::Rigged, &fullbright_blend), BucketId::FullbrightAlpha);

    let glow = MaterialSignature {
        glow: 0.5,
        fullbright: true,
        ..Default::default()
    };
    assert_eq!(classify(FaceRole::Rigged, &glow), BucketId::Glow);

    let fullbright = MaterialSignature {
        fullbright: true,
        ..Default::default()
    };
    assert_eq!(classify(FaceRole::Rigged, &fullbright), BucketId::Fullbright);
}

#[test]
fn material_maps_take_precedence() {
    let material = MaterialSignature {
        normal_map: Some(TextureId::new()),
        specular_map: Some(TextureId::new()),
        alpha_mode: AlphaMode::Mask,
        glow: 1.0,
        ..Default::default()
    };
    // spec bit | norm bit | mask << 2
    assert_eq!(classify(FaceRole::Rigged, &material), BucketId::Material(0b1011));
}

#[test]
fn body_roles_ignore_material() {
    let material = MaterialSignature {
        alpha_mode: AlphaMode::Blend,
        glow: 1.0,
        ..Default::default()
    };
    assert_eq!(classify(FaceRole::AvatarSkinned, &material), BucketId::Skinned);
    assert_eq!(classify(FaceRole::AvatarRigid, &material), BucketId::Rigid);
}

// ============================================================================
// Registry Invariant
// ============================================================================

#[test]
fn invariant_holds_after_mixed_operations() {
    let mut renderer = renderer();
    let instance = renderer.add_instance(None);

    let mut faces: Vec<FaceKey> = (0..12)
        .map(|i| {
            let material = MaterialSignature {
                fullbright: i % 3 == 0,
                shiny: i % 4 == 0,
                ..Default::default()
            };
            add(&mut renderer, instance, material)
        })
        .collect();
    renderer.check_invariants().expect("after adds");

    for &i in &[0usize, 5, 3, 7] {
        let key = faces.remove(i.min(faces.len() - 1));
        renderer.remove_face(key).expect("remove");
        renderer.check_invariants().expect("after remove");
    }

    for (n, &key) in faces.iter().enumerate() {
        let material = MaterialSignature {
            alpha_mode: if n % 2 == 0 { AlphaMode::Blend } else { AlphaMode::Opaque },
            ..Default::default()
        };
        renderer.set_material(key, material).expect("reclassify");
        renderer.check_invariants().expect("after reclassify");
    }

    assert_eq!(renderer.buckets().len(), faces.len());
    for key in faces {
        assert_eq!(
            renderer.buckets().faces(bucket_of(&renderer, key).expect("registered"))
                .iter()
                .filter(|&&k| k == key)
                .count(),
            1
        );
    }
}

#[test]
fn swap_remove_fixes_moved_index() {
    let mut renderer = renderer();
    let instance = renderer.add_instance(None);
    let a = add(&mut renderer, instance, MaterialSignature::default());
    let b = add(&mut renderer, instance, MaterialSignature::default());
    let c = add(&mut renderer, instance, MaterialSignature::default());

    renderer.remove_face(a).expect("remove");

    assert_eq!(renderer.buckets().faces(BucketId::Simple), &[c, b]);
    assert_eq!(renderer.face(c).and_then(|f| f.bucket()).map(|s| s.index), Some(0));
    assert_eq!(renderer.face(b).and_then(|f| f.bucket()).map(|s| s.index), Some(1));
    renderer.check_invariants().expect("invariant");
}

#[test]
fn reclassify_moves_between_buckets() {
    let mut renderer = renderer();
    let instance = renderer.add_instance(None);
    let face = add(&mut renderer, instance, MaterialSignature::default());
    assert_eq!(bucket_of(&renderer, face), Some(BucketId::Simple));

    let glowing = MaterialSignature {
        glow: 0.4,
        ..Default::default()
    };
    assert_eq!(renderer.set_material(face, glowing).expect("face"), BucketId::Glow);
    assert!(renderer.buckets().faces(BucketId::Simple).is_empty());
    assert_eq!(renderer.buckets().faces(BucketId::Glow), &[face]);

    // color-only edit keeps the slot
    let tinted = MaterialSignature {
        glow: 0.4,
        color: Vec4::new(0.2, 0.4, 0.6, 1.0),
        ..Default::default()
    };
    let slot = renderer.face(face).and_then(|f| f.bucket());
    renderer.set_material(face, tinted).expect("face");
    assert_eq!(renderer.face(face).and_then(|f| f.bucket()), slot);
}

#[test]
fn removing_instance_unregisters_its_faces() {
    let mut renderer = renderer();
    let keep = renderer.add_instance(None);
    let removed = renderer.add_instance(None);
    let kept = add(&mut renderer, keep, MaterialSignature::default());
    add(&mut renderer, removed, MaterialSignature::default());
    add(&mut renderer, removed, MaterialSignature::default());

    renderer.remove_instance(removed).expect("instance");

    assert_eq!(renderer.buckets().faces(BucketId::Simple), &[kept]);
    assert!(renderer.instance(removed).is_none());
    renderer.check_invariants().expect("invariant");
}

#[test]
fn unknown_keys_are_errors() {
    let mut renderer = renderer();
    let instance = renderer.add_instance(None);
    let face = add(&mut renderer, instance, MaterialSignature::default());
    renderer.remove_instance(instance).expect("instance");

    assert!(renderer.remove_face(face).is_err());
    assert!(renderer.set_material(face, MaterialSignature::default()).is_err());
    assert!(renderer
        .add_face(instance, FaceDesc::new(Arc::new(FaceGeometry::grid(1, 1)), MaterialSignature::default()))
        .is_err());
    assert!(!renderer.is_drawable(instance));
}
