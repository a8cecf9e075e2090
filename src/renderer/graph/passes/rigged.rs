//! Rigged Attachment Passes
//!
//! Maps each rigged pass to the buckets it draws. In forward shading the
//! advanced material buckets have no passes of their own: opaque, masked
//! and emissive slots are drawn in `RiggedSimple`, blended slots in
//! `RiggedAlpha`, each with its per-slot material shader.

use smallvec::SmallVec;

use crate::renderer::backend::RenderBackend;
use crate::renderer::buckets::{BucketId, MATERIAL_SLOT_COUNT};
use crate::renderer::graph::context::{FaceStyle, FrameContext, TextureUse};
use crate::renderer::graph::pass::TrackedPass;
use crate::renderer::graph::passes::PassId;
use crate::renderer::settings::RiggedSettings;
use crate::resources::AlphaMode;

type BucketList = SmallVec<[BucketId; 16]>;

fn material_slots(blended: bool) -> impl Iterator<Item = BucketId> {
    (0..MATERIAL_SLOT_COUNT)
        .filter(move |&slot| (BucketId::material_alpha_mode(slot) == AlphaMode::Blend) == blended)
        .map(BucketId::Material)
}

/// Buckets drawn by a rigged pass, in draw order.
#[must_use]
pub fn pass_buckets(id: PassId, settings: &RiggedSettings) -> BucketList {
    let mut buckets = BucketList::new();
    match id {
        PassId::RiggedSimple => {
            buckets.extend([BucketId::Simple, BucketId::Bump]);
            buckets.extend(material_slots(false));
        }
        PassId::DeferredRiggedSimple => buckets.push(BucketId::Simple),
        PassId::DeferredRiggedBump => buckets.push(BucketId::Bump),
        PassId::DeferredRiggedMaterial(slot) | PassId::RiggedMaterialAlpha(slot) => {
            buckets.push(BucketId::Material(slot));
        }
        PassId::RiggedFullbright => buckets.push(BucketId::Fullbright),
        PassId::RiggedShiny => buckets.push(BucketId::Shiny),
        PassId::RiggedFullbrightShiny => buckets.push(BucketId::FullbrightShiny),
        PassId::RiggedAlpha => {
            buckets.push(BucketId::Alpha);
            if !settings.shading.is_deferred() {
                buckets.extend(material_slots(true));
            }
        }
        PassId::RiggedFullbrightAlpha => buckets.push(BucketId::FullbrightAlpha),
        PassId::RiggedGlow => {
            if settings.render_glow {
                buckets.push(BucketId::Glow);
            }
        }
        _ => {}
    }

    // Without a glow pass, glow faces render as simple geometry.
    if !settings.render_glow
        && matches!(id, PassId::RiggedSimple | PassId::DeferredRiggedSimple)
    {
        buckets.push(BucketId::Glow);
    }
    buckets
}

pub fn render<B: RenderBackend + ?Sized>(
    ctx: &mut FrameContext<'_>,
    pass: &mut TrackedPass<'_, B>,
    id: PassId,
) {
    let textures = match id {
        PassId::RiggedSimple
        | PassId::RiggedAlpha
        | PassId::DeferredRiggedMaterial(_)
        | PassId::RiggedMaterialAlpha(_) => TextureUse::Material,
        _ => TextureUse::Diffuse,
    };
    let style = FaceStyle {
        mask_cutoff: Some(ctx.settings.alpha_mask_cutoff),
        material_shaders: true,
        ..FaceStyle::new(ctx.pass_skin_mode(pass), textures)
    };

    for bucket in pass_buckets(id, ctx.settings) {
        ctx.draw_bucket(pass, bucket, &style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::graph::passes::{DEFERRED_PASSES, FORWARD_PASSES};
    use crate::renderer::settings::ShadingPath;

    fn coverage(passes: &[PassId], settings: &RiggedSettings) -> Vec<BucketId> {
        let mut all: Vec<BucketId> = passes
            .iter()
            .flat_map(|&p| match p {
                PassId::Rigid | PassId::DeferredRigid => BucketList::from_slice(&[BucketId::Rigid]),
                PassId::Skinned | PassId::DeferredSkinned => {
                    BucketList::from_slice(&[BucketId::Skinned])
                }
                _ => pass_buckets(p, settings),
            })
            .collect();
        all.sort();
        all
    }

    #[test]
    fn every_bucket_is_drawn_exactly_once() {
        for shading in [ShadingPath::Forward, ShadingPath::Deferred] {
            for render_glow in [true, false] {
                let settings = RiggedSettings {
                    shading,
                    render_glow,
                    ..Default::default()
                };
                let passes: &[PassId] = match shading {
                    ShadingPath::Forward => &FORWARD_PASSES,
                    ShadingPath::Deferred => &DEFERRED_PASSES,
                };
                let expected: Vec<BucketId> = BucketId::all().collect();
                assert_eq!(coverage(passes, &settings), expected, "{shading:?} glow={render_glow}");
            }
        }
    }
}
