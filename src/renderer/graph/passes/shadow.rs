//! Shadow Passes
//!
//! A separate, smaller sequence keyed on content (opaque, alpha-blend,
//! alpha-mask) and target (avatar body, attachments). Every shadow pass
//! binds the depth-only shader. Blended content is skipped entirely when
//! the shadow technique cannot render it, but the pass still opens and
//! closes.

use wgpu::BlendState;

use crate::renderer::backend::{RenderBackend, ShaderKey, ShaderProgram};
use crate::renderer::buckets::BucketId;
use crate::renderer::graph::context::{FaceStyle, FrameContext, TextureUse};
use crate::renderer::graph::pass::{PassConfig, TrackedPass};
use crate::renderer::settings::RiggedSettings;
use crate::resources::AlphaMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowContent {
    Opaque,
    AlphaBlend,
    AlphaMask,
}

impl ShadowContent {
    /// Whether faces with `mode` cast shadows in this content class.
    #[must_use]
    pub fn accepts(self, mode: AlphaMode) -> bool {
        match self {
            Self::Opaque => matches!(mode, AlphaMode::Opaque | AlphaMode::Emissive),
            Self::AlphaBlend => mode == AlphaMode::Blend,
            Self::AlphaMask => mode == AlphaMode::Mask,
        }
    }

    fn filter(self) -> fn(AlphaMode) -> bool {
        match self {
            Self::Opaque => |m| ShadowContent::Opaque.accepts(m),
            Self::AlphaBlend => |m| ShadowContent::AlphaBlend.accepts(m),
            Self::AlphaMask => |m| ShadowContent::AlphaMask.accepts(m),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowTarget {
    AvatarBody,
    Attachment,
}

impl ShadowTarget {
    /// Buckets whose faces belong to this target.
    pub fn buckets(self) -> impl Iterator<Item = BucketId> {
        BucketId::all().filter(move |b| {
            let body = matches!(b, BucketId::Rigid | BucketId::Skinned);
            body == (self == Self::AvatarBody)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowPassId {
    pub content: ShadowContent,
    pub target: ShadowTarget,
}

impl ShadowPassId {
    #[must_use]
    pub const fn new(content: ShadowContent, target: ShadowTarget) -> Self {
        Self { content, target }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        use ShadowContent as C;
        use ShadowTarget as T;
        match (self.content, self.target) {
            (C::Opaque, T::AvatarBody) => "shadow-body-opaque",
            (C::AlphaBlend, T::AvatarBody) => "shadow-body-alpha-blend",
            (C::AlphaMask, T::AvatarBody) => "shadow-body-alpha-mask",
            (C::Opaque, T::Attachment) => "shadow-attachment-opaque",
            (C::AlphaBlend, T::Attachment) => "shadow-attachment-alpha-blend",
            (C::AlphaMask, T::Attachment) => "shadow-attachment-alpha-mask",
        }
    }

    #[must_use]
    pub fn config(self, settings: &RiggedSettings) -> PassConfig {
        PassConfig {
            label: self.name(),
            shader: ShaderKey::forward(ShaderProgram::ShadowDepth),
            blend: (self.content == ShadowContent::AlphaBlend).then_some(BlendState::ALPHA_BLENDING),
            alpha_cutoff: (self.content == ShadowContent::AlphaMask)
                .then_some(settings.shadow_alpha_cutoff),
            depth_write: true,
            environment: None,
        }
    }
}

pub const SHADOW_PASSES: [ShadowPassId; 6] = [
    ShadowPassId::new(ShadowContent::Opaque, ShadowTarget::AvatarBody),
    ShadowPassId::new(ShadowContent::AlphaBlend, ShadowTarget::AvatarBody),
    ShadowPassId::new(ShadowContent::AlphaMask, ShadowTarget::AvatarBody),
    ShadowPassId::new(ShadowContent::Opaque, ShadowTarget::Attachment),
    ShadowPassId::new(ShadowContent::AlphaBlend, ShadowTarget::Attachment),
    ShadowPassId::new(ShadowContent::AlphaMask, ShadowTarget::Attachment),
];

pub fn render<B: RenderBackend + ?Sized>(
    ctx: &mut FrameContext<'_>,
    pass: &mut TrackedPass<'_, B>,
    id: ShadowPassId,
) {
    if id.content == ShadowContent::AlphaBlend && !ctx.settings.shadow_supports_blend {
        return;
    }

    // Only alpha-tested or blended casters need their diffuse alpha.
    let textures = match id.content {
        ShadowContent::Opaque => TextureUse::None,
        ShadowContent::AlphaBlend | ShadowContent::AlphaMask => TextureUse::Diffuse,
    };
    let style = FaceStyle {
        accepts: id.content.filter(),
        ..FaceStyle::new(ctx.pass_skin_mode(pass), textures)
    };

    for bucket in id.target.buckets() {
        ctx.draw_bucket(pass, bucket, &style);
    }
}
