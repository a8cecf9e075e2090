//! A [`RenderBackend`] that records every command instead of executing it.
//!
//! Used by tests and tooling to inspect what a frame would submit.

use std::ops::Range;

use wgpu::BlendState;

use crate::renderer::backend::{RenderBackend, ShaderKey, TextureChannel};
use crate::renderer::geometry::GeometryBuffer;
use crate::resources::TextureId;
use crate::scene::JointRow;

/// One submitted draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub buffer_id: u64,
    pub buffer_version: u64,
    pub vertex_count: u32,
    pub indices: Range<u32>,
    pub degenerate: bool,
    /// Shader bound at submission time.
    pub shader: Option<ShaderKey>,
}

impl DrawRecord {
    #[must_use]
    pub fn triangles(&self) -> u32 {
        (self.indices.end - self.indices.start) / 3
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    PushDebugGroup(String),
    PopDebugGroup,
    BindShader(ShaderKey),
    UnbindShader,
    BindTexture(TextureChannel, TextureId),
    UnbindTexture(TextureChannel),
    SetBlend(Option<BlendState>),
    SetAlphaCutoff(Option<f32>),
    SetDepthWrite(bool),
    UploadJointPalette { joints: usize },
    Draw(DrawRecord),
}

#[derive(Debug, Default)]
pub struct CommandRecorder {
    pub commands: Vec<BackendCommand>,
    hardware_skinning_unsupported: bool,
    shader: Option<ShaderKey>,
}

impl CommandRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that reports no matrix-palette skinning support.
    #[must_use]
    pub fn without_hardware_skinning() -> Self {
        Self {
            hardware_skinning_unsupported: true,
            ..Self::default()
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.shader = None;
    }

    /// Every draw, in submission order.
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(|c| match c {
            BackendCommand::Draw(d) => Some(d),
            _ => None,
        })
    }

    /// Debug group labels, i.e. the passes that ran, in order.
    #[must_use]
    pub fn pass_labels(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                BackendCommand::PushDebugGroup(label) => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Commands recorded inside every debug group named `label`.
    #[must_use]
    pub fn commands_in(&self, label: &str) -> Vec<&BackendCommand> {
        let mut inside = false;
        let mut out = Vec::new();
        for command in &self.commands {
            match command {
                BackendCommand::PushDebugGroup(l) => inside = l == label,
                BackendCommand::PopDebugGroup => inside = false,
                c if inside => out.push(c),
                _ => {}
            }
        }
        out
    }

    /// Draws submitted inside the pass named `label`.
    #[must_use]
    pub fn draws_in(&self, label: &str) -> Vec<&DrawRecord> {
        self.commands_in(label)
            .into_iter()
            .filter_map(|c| match c {
                BackendCommand::Draw(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Number of palette uploads recorded.
    #[must_use]
    pub fn palette_uploads(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, BackendCommand::UploadJointPalette { .. }))
            .count()
    }
}

impl RenderBackend for CommandRecorder {
    fn bind_shader(&mut self, key: ShaderKey) {
        self.shader = Some(key);
        self.commands.push(BackendCommand::BindShader(key));
    }

    fn unbind_shader(&mut self) {
        self.shader = None;
        self.commands.push(BackendCommand::UnbindShader);
    }

    fn bind_texture(&mut self, channel: TextureChannel, texture: TextureId) {
        self.commands.push(BackendCommand::BindTexture(channel, texture));
    }

    fn unbind_texture(&mut self, channel: TextureChannel) {
        self.commands.push(BackendCommand::UnbindTexture(channel));
    }

    fn set_blend(&mut self, blend: Option<BlendState>) {
        self.commands.push(BackendCommand::SetBlend(blend));
    }

    fn set_alpha_cutoff(&mut self, cutoff: Option<f32>) {
        self.commands.push(BackendCommand::SetAlphaCutoff(cutoff));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.commands.push(BackendCommand::SetDepthWrite(enabled));
    }

    fn upload_joint_palette(&mut self, rows: &[JointRow]) {
        self.commands
            .push(BackendCommand::UploadJointPalette { joints: rows.len() });
    }

    fn draw_range(&mut self, buffer: &GeometryBuffer, indices: Range<u32>) {
        self.commands.push(BackendCommand::Draw(DrawRecord {
            buffer_id: buffer.id(),
            buffer_version: buffer.version(),
            vertex_count: buffer.vertex_count(),
            indices,
            degenerate: buffer.is_degenerate(),
            shader: self.shader,
        }));
    }

    fn supports_hardware_skinning(&self) -> bool {
        !self.hardware_skinning_unsupported
    }

    fn push_debug_group(&mut self, label: &str) {
        self.commands
            .push(BackendCommand::PushDebugGroup(label.to_owned()));
    }

    fn pop_debug_group(&mut self) {
        self.commands.push(BackendCommand::PopDebugGroup);
    }
}
