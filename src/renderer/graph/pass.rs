//! Pass with state tracking
//!
//! Carries the bound shader, texture channels and fixed-function state
//! through one pass's begin/render/end, and drops redundant backend calls.

use std::ops::Range;

use wgpu::BlendState;

use crate::renderer::backend::{RenderBackend, ShaderKey, TextureChannel};
use crate::renderer::geometry::GeometryBuffer;
use crate::resources::TextureId;
use crate::scene::{InstanceKey, JointRow};

/// Static setup of one pass, applied at `begin`.
#[derive(Debug, Clone, PartialEq)]
pub struct PassConfig {
    pub label: &'static str,
    pub shader: ShaderKey,
    pub blend: Option<BlendState>,
    /// Pass-wide alpha test; masked faces may override it per draw.
    pub alpha_cutoff: Option<f32>,
    pub depth_write: bool,
    /// Texture bound on the environment channel for the whole pass.
    pub environment: Option<TextureId>,
}

pub struct TrackedPass<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
    config: Option<PassConfig>,
    current_shader: Option<ShaderKey>,
    current_textures: [Option<TextureId>; TextureChannel::COUNT],
    current_blend: Option<Option<BlendState>>,
    current_cutoff: Option<Option<f32>>,
    current_depth_write: Option<bool>,
    palette_owner: Option<InstanceKey>,
    draws: u32,
    triangles: u64,
    palette_uploads: u32,
}

impl<'a, B: RenderBackend + ?Sized> TrackedPass<'a, B> {
    #[must_use]
    pub fn new(backend: &'a mut B) -> Self {
        Self {
            backend,
            config: None,
            current_shader: None,
            current_textures: [None; TextureChannel::COUNT],
            current_blend: None,
            current_cutoff: None,
            current_depth_write: None,
            palette_owner: None,
            draws: 0,
            triangles: 0,
            palette_uploads: 0,
        }
    }

    /// Opens the pass: debug group, shader, blend, alpha test, depth write
    /// and the pass-wide environment texture.
    pub fn begin(&mut self, config: PassConfig) {
        self.backend.push_debug_group(config.label);
        self.set_shader(config.shader);
        self.set_blend(config.blend);
        self.set_alpha_cutoff(config.alpha_cutoff);
        self.set_depth_write(config.depth_write);
        if let Some(env) = config.environment {
            self.set_texture(TextureChannel::Environment, Some(env));
        }
        self.config = Some(config);
    }

    /// Closes the pass, unbinding every texture channel and the shader.
    pub fn end(&mut self) {
        for channel in TextureChannel::ALL {
            self.set_texture(channel, None);
        }
        if self.current_shader.take().is_some() {
            self.backend.unbind_shader();
        }
        self.current_blend = None;
        self.current_cutoff = None;
        self.current_depth_write = None;
        self.palette_owner = None;
        self.config = None;
        self.backend.pop_debug_group();
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> Option<&PassConfig> {
        self.config.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn supports_hardware_skinning(&self) -> bool {
        self.backend.supports_hardware_skinning()
    }

    pub fn set_shader(&mut self, key: ShaderKey) {
        if self.current_shader != Some(key) {
            self.backend.bind_shader(key);
            self.current_shader = Some(key);
            // uniforms belong to the previous program
            self.palette_owner = None;
        }
    }

    pub fn set_texture(&mut self, channel: TextureChannel, texture: Option<TextureId>) {
        let slot = &mut self.current_textures[channel.index()];
        if *slot == texture {
            return;
        }
        match texture {
            Some(id) => self.backend.bind_texture(channel, id),
            None => self.backend.unbind_texture(channel),
        }
        *slot = texture;
    }

    pub fn set_blend(&mut self, blend: Option<BlendState>) {
        if self.current_blend != Some(blend) {
            self.backend.set_blend(blend);
            self.current_blend = Some(blend);
        }
    }

    pub fn set_alpha_cutoff(&mut self, cutoff: Option<f32>) {
        if self.current_cutoff != Some(cutoff) {
            self.backend.set_alpha_cutoff(cutoff);
            self.current_cutoff = Some(cutoff);
        }
    }

    pub fn set_depth_write(&mut self, enabled: bool) {
        if self.current_depth_write != Some(enabled) {
            self.backend.set_depth_write(enabled);
            self.current_depth_write = Some(enabled);
        }
    }

    /// Uploads `rows` unless `owner`'s palette is already bound to the
    /// current shader.
    pub fn upload_palette(&mut self, owner: InstanceKey, rows: &[JointRow]) {
        if self.palette_owner != Some(owner) {
            self.backend.upload_joint_palette(rows);
            self.palette_owner = Some(owner);
            self.palette_uploads += 1;
        }
    }

    pub fn draw(&mut self, buffer: &GeometryBuffer, indices: Range<u32>) {
        self.triangles += u64::from((indices.end - indices.start) / 3);
        self.draws += 1;
        self.backend.draw_range(buffer, indices);
    }

    #[inline]
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        self.draws
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> u64 {
        self.triangles
    }

    #[inline]
    #[must_use]
    pub fn palette_uploads(&self) -> u32 {
        self.palette_uploads
    }
}
