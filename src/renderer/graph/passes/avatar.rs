//! Avatar Body Passes
//!
//! Impostor billboards, rigid body parts and the skinned body mesh.

use crate::renderer::backend::{RenderBackend, TextureChannel};
use crate::renderer::buckets::BucketId;
use crate::renderer::graph::context::{FaceStyle, FrameContext, TextureUse};
use crate::renderer::graph::pass::TrackedPass;

/// Draws one billboard per visible, impostored instance.
pub fn render_impostors<B: RenderBackend + ?Sized>(
    ctx: &mut FrameContext<'_>,
    pass: &mut TrackedPass<'_, B>,
) {
    // Each visible instance draws once, however often it is listed.
    for (_, instance) in ctx.instances.iter() {
        if !ctx.is_visible(instance) || instance.is_quarantined() || !instance.is_impostored() {
            continue;
        }
        let Some(impostor) = instance.impostor.as_ref() else {
            continue;
        };

        pass.set_texture(TextureChannel::Diffuse, Some(impostor.texture));
        let buffer = impostor.buffer();
        pass.draw(buffer, 0..buffer.index_count());
    }
}

/// Draws the rigid or skinned body bucket.
pub fn render_body<B: RenderBackend + ?Sized>(
    ctx: &mut FrameContext<'_>,
    pass: &mut TrackedPass<'_, B>,
    bucket: BucketId,
) {
    let style = FaceStyle {
        mask_cutoff: Some(ctx.settings.alpha_mask_cutoff),
        ..FaceStyle::new(ctx.pass_skin_mode(pass), TextureUse::Diffuse)
    };
    ctx.draw_bucket(pass, bucket, &style);
}
