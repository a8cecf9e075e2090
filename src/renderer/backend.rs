//! GPU abstraction seam.
//!
//! The pipeline is a client of this trait: it binds shaders and textures,
//! sets fixed-function state and submits index ranges. Implementations own
//! the actual device objects.

use std::ops::Range;

use wgpu::BlendState;

use crate::renderer::geometry::GeometryBuffer;
use crate::resources::TextureId;
use crate::scene::JointRow;

/// Shader family selected by a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    Impostor,
    AvatarRigid,
    AvatarSkinned,
    Simple,
    Bump,
    Fullbright,
    Shiny,
    FullbrightShiny,
    Alpha,
    FullbrightAlpha,
    Glow,
    /// Advanced material, by material slot.
    Material(u8),
    /// Depth-only shadow caster.
    ShadowDepth,
}

/// Full identity of a bound shader variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub program: ShaderProgram,
    /// G-buffer writing variant.
    pub deferred: bool,
    /// Matrix-palette skinning in the vertex stage.
    pub hardware_skinning: bool,
}

impl ShaderKey {
    #[must_use]
    pub const fn forward(program: ShaderProgram) -> Self {
        Self {
            program,
            deferred: false,
            hardware_skinning: false,
        }
    }

    #[must_use]
    pub const fn deferred(program: ShaderProgram) -> Self {
        Self {
            program,
            deferred: true,
            hardware_skinning: false,
        }
    }

    #[must_use]
    pub const fn with_hardware_skinning(mut self, enabled: bool) -> Self {
        self.hardware_skinning = enabled;
        self
    }
}

/// Texture units the rigged shaders sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextureChannel {
    Diffuse = 0,
    Normal = 1,
    Specular = 2,
    Environment = 3,
}

impl TextureChannel {
    pub const COUNT: usize = 4;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Diffuse,
        Self::Normal,
        Self::Specular,
        Self::Environment,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Primitive operations the pipeline issues against the GPU.
pub trait RenderBackend {
    fn bind_shader(&mut self, key: ShaderKey);

    fn unbind_shader(&mut self);

    fn bind_texture(&mut self, channel: TextureChannel, texture: TextureId);

    fn unbind_texture(&mut self, channel: TextureChannel);

    /// `None` disables blending.
    fn set_blend(&mut self, blend: Option<BlendState>);

    /// `None` disables alpha testing.
    fn set_alpha_cutoff(&mut self, cutoff: Option<f32>);

    fn set_depth_write(&mut self, enabled: bool);

    /// Uploads the joint palette uniform array of the bound shader.
    fn upload_joint_palette(&mut self, rows: &[JointRow]);

    /// Draws `indices` of `buffer` as a triangle list.
    fn draw_range(&mut self, buffer: &GeometryBuffer, indices: Range<u32>);

    /// Whether matrix-palette skinning shaders are available at all.
    fn supports_hardware_skinning(&self) -> bool {
        true
    }

    fn push_debug_group(&mut self, _label: &str) {}

    fn pop_debug_group(&mut self) {}
}
