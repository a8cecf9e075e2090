//! Pass Scheduler
//!
//! The full pass sequence of the selected [`ShadingPath`] runs every frame,
//! in a fixed order. Each pass is a `begin` / `render` / `end` triple; a
//! pass with nothing to draw still opens and closes.
//!
//! | Forward                  | Deferred                                   |
//! |--------------------------|--------------------------------------------|
//! | `Impostor`               | `DeferredImpostor`                         |
//! | `Rigid`                  | `DeferredRigid`                            |
//! | `Skinned`                | `DeferredSkinned`                          |
//! | `RiggedSimple`           | `DeferredRiggedSimple`, `DeferredRiggedBump` |
//! |                          | `DeferredRiggedMaterial(slot)` (non-blend) |
//! | `RiggedFullbright`       | `RiggedFullbright`                         |
//! | `RiggedShiny`            | `RiggedShiny`                              |
//! | `RiggedFullbrightShiny`  | `RiggedFullbrightShiny`                    |
//! | `RiggedAlpha`            | `RiggedAlpha`                              |
//! | `RiggedFullbrightAlpha`  | `RiggedFullbrightAlpha`                    |
//! |                          | `RiggedMaterialAlpha(slot)` (blend slots)  |
//! | `RiggedGlow`             | `RiggedGlow`                               |
//!
//! While rendering impostor textures the first [`IMPOSTOR_PASS_OFFSET`]
//! passes are skipped. Shadow passes form their own sequence, see
//! [`shadow`].

pub mod avatar;
pub mod rigged;
pub mod shadow;

pub use shadow::{ShadowContent, ShadowPassId, ShadowTarget, SHADOW_PASSES};

use wgpu::{BlendComponent, BlendFactor, BlendOperation, BlendState};

use crate::renderer::backend::{RenderBackend, ShaderKey, ShaderProgram};
use crate::renderer::buckets::BucketId;
use crate::renderer::graph::context::FrameContext;
use crate::renderer::graph::pass::{PassConfig, TrackedPass};
use crate::renderer::settings::{RiggedSettings, ShadingPath};
use crate::resources::{AlphaMode, TextureId};

/// Number of leading passes skipped while rendering impostor textures.
pub const IMPOSTOR_PASS_OFFSET: usize = 2;

/// Additive blending of the glow pass.
pub const GLOW_BLEND: BlendState = BlendState {
    color: BlendComponent {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
    alpha: BlendComponent {
        src_factor: BlendFactor::Zero,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
};

/// Identity of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Impostor,
    Rigid,
    Skinned,
    RiggedSimple,
    RiggedFullbright,
    RiggedShiny,
    RiggedFullbrightShiny,
    RiggedAlpha,
    RiggedFullbrightAlpha,
    RiggedGlow,

    DeferredImpostor,
    DeferredRigid,
    DeferredSkinned,
    DeferredRiggedSimple,
    DeferredRiggedBump,
    /// G-buffer pass of one non-blended material slot.
    DeferredRiggedMaterial(u8),
    /// Post-deferred pass of one alpha-blended material slot.
    RiggedMaterialAlpha(u8),

    Shadow(ShadowPassId),
}

pub const FORWARD_PASSES: [PassId; 10] = [
    PassId::Impostor,
    PassId::Rigid,
    PassId::Skinned,
    PassId::RiggedSimple,
    PassId::RiggedFullbright,
    PassId::RiggedShiny,
    PassId::RiggedFullbrightShiny,
    PassId::RiggedAlpha,
    PassId::RiggedFullbrightAlpha,
    PassId::RiggedGlow,
];

pub const DEFERRED_PASSES: [PassId; 27] = [
    PassId::DeferredImpostor,
    PassId::DeferredRigid,
    PassId::DeferredSkinned,
    PassId::DeferredRiggedSimple,
    PassId::DeferredRiggedBump,
    PassId::DeferredRiggedMaterial(0),
    PassId::DeferredRiggedMaterial(1),
    PassId::DeferredRiggedMaterial(2),
    PassId::DeferredRiggedMaterial(3),
    PassId::DeferredRiggedMaterial(8),
    PassId::DeferredRiggedMaterial(9),
    PassId::DeferredRiggedMaterial(10),
    PassId::DeferredRiggedMaterial(11),
    PassId::DeferredRiggedMaterial(12),
    PassId::DeferredRiggedMaterial(13),
    PassId::DeferredRiggedMaterial(14),
    PassId::DeferredRiggedMaterial(15),
    PassId::RiggedFullbright,
    PassId::RiggedShiny,
    PassId::RiggedFullbrightShiny,
    PassId::RiggedAlpha,
    PassId::RiggedFullbrightAlpha,
    PassId::RiggedMaterialAlpha(4),
    PassId::RiggedMaterialAlpha(5),
    PassId::RiggedMaterialAlpha(6),
    PassId::RiggedMaterialAlpha(7),
    PassId::RiggedGlow,
];

const DEFERRED_MATERIAL_LABELS: [&str; 16] = [
    "deferred-rigged-material-0",
    "deferred-rigged-material-1",
    "deferred-rigged-material-2",
    "deferred-rigged-material-3",
    "deferred-rigged-material-4",
    "deferred-rigged-material-5",
    "deferred-rigged-material-6",
    "deferred-rigged-material-7",
    "deferred-rigged-material-8",
    "deferred-rigged-material-9",
    "deferred-rigged-material-10",
    "deferred-rigged-material-11",
    "deferred-rigged-material-12",
    "deferred-rigged-material-13",
    "deferred-rigged-material-14",
    "deferred-rigged-material-15",
];

const MATERIAL_ALPHA_LABELS: [&str; 4] = [
    "rigged-material-alpha-4",
    "rigged-material-alpha-5",
    "rigged-material-alpha-6",
    "rigged-material-alpha-7",
];

/// The pass sequence to run this frame.
#[must_use]
pub fn schedule(settings: &RiggedSettings) -> &'static [PassId] {
    let passes: &'static [PassId] = match settings.shading {
        ShadingPath::Forward => &FORWARD_PASSES,
        ShadingPath::Deferred => &DEFERRED_PASSES,
    };
    if settings.impostor_render {
        &passes[IMPOSTOR_PASS_OFFSET..]
    } else {
        passes
    }
}

impl PassId {
    /// Debug label, also used as the backend debug group name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Impostor => "impostor",
            Self::Rigid => "rigid",
            Self::Skinned => "skinned",
            Self::RiggedSimple => "rigged-simple",
            Self::RiggedFullbright => "rigged-fullbright",
            Self::RiggedShiny => "rigged-shiny",
            Self::RiggedFullbrightShiny => "rigged-fullbright-shiny",
            Self::RiggedAlpha => "rigged-alpha",
            Self::RiggedFullbrightAlpha => "rigged-fullbright-alpha",
            Self::RiggedGlow => "rigged-glow",
            Self::DeferredImpostor => "deferred-impostor",
            Self::DeferredRigid => "deferred-rigid",
            Self::DeferredSkinned => "deferred-skinned",
            Self::DeferredRiggedSimple => "deferred-rigged-simple",
            Self::DeferredRiggedBump => "deferred-rigged-bump",
            Self::DeferredRiggedMaterial(slot) => DEFERRED_MATERIAL_LABELS[usize::from(slot & 15)],
            Self::RiggedMaterialAlpha(slot) => {
                MATERIAL_ALPHA_LABELS[usize::from(slot.saturating_sub(4) & 3)]
            }
            Self::Shadow(shadow) => shadow.name(),
        }
    }

    /// Shader, blend, alpha test and depth state bound at `begin`.
    #[must_use]
    pub fn config(self, settings: &RiggedSettings, environment: Option<TextureId>) -> PassConfig {
        use ShaderProgram as P;

        let opaque = |shader: ShaderKey| PassConfig {
            label: self.name(),
            shader,
            blend: None,
            alpha_cutoff: None,
            depth_write: true,
            environment: None,
        };
        let blended = |shader: ShaderKey, blend: BlendState| PassConfig {
            label: self.name(),
            shader,
            blend: Some(blend),
            alpha_cutoff: None,
            depth_write: false,
            environment: None,
        };

        match self {
            Self::Impostor | Self::DeferredImpostor => PassConfig {
                alpha_cutoff: Some(settings.alpha_mask_cutoff),
                ..opaque(shader_for(self, P::Impostor))
            },
            Self::Rigid | Self::DeferredRigid => opaque(shader_for(self, P::AvatarRigid)),
            Self::Skinned | Self::DeferredSkinned => opaque(shader_for(self, P::AvatarSkinned)),
            Self::RiggedSimple | Self::DeferredRiggedSimple => opaque(shader_for(self, P::Simple)),
            Self::DeferredRiggedBump => opaque(ShaderKey::deferred(P::Bump)),
            Self::DeferredRiggedMaterial(slot) => PassConfig {
                alpha_cutoff: (BucketId::material_alpha_mode(slot) == AlphaMode::Mask)
                    .then_some(settings.alpha_mask_cutoff),
                ..opaque(ShaderKey::deferred(P::Material(slot)))
            },
            Self::RiggedFullbright => opaque(ShaderKey::forward(P::Fullbright)),
            Self::RiggedShiny => PassConfig {
                environment,
                ..opaque(ShaderKey::forward(P::Shiny))
            },
            Self::RiggedFullbrightShiny => PassConfig {
                environment,
                ..opaque(ShaderKey::forward(P::FullbrightShiny))
            },
            Self::RiggedAlpha => blended(ShaderKey::forward(P::Alpha), BlendState::ALPHA_BLENDING),
            Self::RiggedFullbrightAlpha => {
                blended(ShaderKey::forward(P::FullbrightAlpha), BlendState::ALPHA_BLENDING)
            }
            Self::RiggedMaterialAlpha(slot) => {
                blended(ShaderKey::forward(P::Material(slot)), BlendState::ALPHA_BLENDING)
            }
            Self::RiggedGlow => blended(ShaderKey::forward(P::Glow), GLOW_BLEND),
            Self::Shadow(shadow) => shadow.config(settings),
        }
    }

    #[must_use]
    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            Self::DeferredImpostor
                | Self::DeferredRigid
                | Self::DeferredSkinned
                | Self::DeferredRiggedSimple
                | Self::DeferredRiggedBump
                | Self::DeferredRiggedMaterial(_)
        )
    }
}

fn shader_for(pass: PassId, program: ShaderProgram) -> ShaderKey {
    if pass.is_deferred() {
        ShaderKey::deferred(program)
    } else {
        ShaderKey::forward(program)
    }
}

/// Runs the `render` stage of `pass`. `begin` and `end` are the caller's.
pub fn render<B: RenderBackend + ?Sized>(
    ctx: &mut FrameContext<'_>,
    pass: &mut TrackedPass<'_, B>,
    id: PassId,
) {
    match id {
        PassId::Impostor | PassId::DeferredImpostor => avatar::render_impostors(ctx, pass),
        PassId::Rigid | PassId::DeferredRigid => avatar::render_body(ctx, pass, BucketId::Rigid),
        PassId::Skinned | PassId::DeferredSkinned => {
            avatar::render_body(ctx, pass, BucketId::Skinned);
        }
        PassId::Shadow(shadow) => shadow::render(ctx, pass, shadow),
        _ => rigged::render(ctx, pass, id),
    }
}

/// Runs one complete pass: `begin`, `render`, `end`.
pub fn run_pass<B: RenderBackend + ?Sized>(
    ctx: &mut FrameContext<'_>,
    backend: &mut B,
    id: PassId,
) {
    let config = id.config(ctx.settings, ctx.environment);
    let mut pass = TrackedPass::new(backend);
    pass.begin(config);
    render(ctx, &mut pass, id);
    pass.end();

    ctx.stats.passes += 1;
    ctx.stats.draw_calls += pass.draw_count();
    ctx.stats.triangles += pass.triangle_count();
    ctx.stats.palette_uploads += pass.palette_uploads();
}
