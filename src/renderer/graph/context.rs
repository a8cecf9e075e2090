//! Frame Context
//!
//! [`FrameContext`] carries everything one frame's pass sequence touches:
//! the face and instance arenas, the bucket registry, the geometry manager
//! and the palette builder.
//!
//! Like the renderer's other contexts it stores individual references to
//! each subsystem, so the borrow checker can split borrows across disjoint
//! fields: a face is written mutably while the instance arena (and its
//! cached palettes) is read in the same call.

use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use uuid::Uuid;

use crate::renderer::QuarantineSink;
use crate::renderer::backend::{RenderBackend, ShaderProgram, TextureChannel};
use crate::renderer::buckets::{BucketId, BucketRegistry};
use crate::renderer::geometry::{
    write_geometry, EnsureOutcome, GeometryManager, SkinInputs, VertexDataMask,
};
use crate::renderer::graph::pass::TrackedPass;
use crate::renderer::settings::RiggedSettings;
use crate::renderer::skinning::{BindShape, SkinMode};
use crate::renderer::stats::FrameStats;
use crate::resources::{AlphaMode, TextureId};
use crate::scene::{
    FaceDirty, FaceKey, InstanceKey, MeshFace, MeshInstance, PaletteBuilder, PoseCache,
};

/// Which texture channels a pass samples per face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUse {
    None,
    Diffuse,
    /// Diffuse, normal and specular.
    Material,
}

/// How the faces of one pass are drawn.
#[derive(Debug, Clone, Copy)]
pub struct FaceStyle {
    pub skin_mode: SkinMode,
    pub textures: TextureUse,
    /// Alpha test for faces in [`AlphaMode::Mask`]; `None` keeps the pass cutoff.
    pub mask_cutoff: Option<f32>,
    /// Bind the per-slot material shader for faces of material buckets.
    pub material_shaders: bool,
    /// Alpha modes this pass draws.
    pub accepts: fn(AlphaMode) -> bool,
}

impl FaceStyle {
    #[must_use]
    pub fn new(skin_mode: SkinMode, textures: TextureUse) -> Self {
        Self {
            skin_mode,
            textures,
            mask_cutoff: None,
            material_shaders: false,
            accepts: |_| true,
        }
    }
}

pub struct FrameContext<'a> {
    pub settings: &'a RiggedSettings,
    pub instances: &'a mut SlotMap<InstanceKey, MeshInstance>,
    pub faces: &'a mut SlotMap<FaceKey, MeshFace>,
    pub buckets: &'a BucketRegistry,
    pub geometry: &'a mut GeometryManager,
    pub palette_builder: &'a mut PaletteBuilder,
    pub sink: &'a mut Option<Box<dyn QuarantineSink>>,
    pub oversized_warned: &'a mut FxHashSet<Uuid>,
    /// Instances the visibility layer handed in this frame.
    pub visible: &'a [InstanceKey],
    pub environment: Option<TextureId>,
    pub frame: u64,
    pub stats: FrameStats,
}

impl<'a> FrameContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        settings: &'a RiggedSettings,
        instances: &'a mut SlotMap<InstanceKey, MeshInstance>,
        faces: &'a mut SlotMap<FaceKey, MeshFace>,
        buckets: &'a BucketRegistry,
        geometry: &'a mut GeometryManager,
        palette_builder: &'a mut PaletteBuilder,
        sink: &'a mut Option<Box<dyn QuarantineSink>>,
        oversized_warned: &'a mut FxHashSet<Uuid>,
        visible: &'a [InstanceKey],
        environment: Option<TextureId>,
        frame: u64,
    ) -> Self {
        for &key in visible {
            if let Some(instance) = instances.get_mut(key) {
                instance.visible_frame = frame;
            }
        }

        Self {
            settings,
            instances,
            faces,
            buckets,
            geometry,
            palette_builder,
            sink,
            oversized_warned,
            visible,
            environment,
            frame,
            stats: FrameStats::default(),
        }
    }

    /// Whether the instance was handed in as visible this frame.
    #[inline]
    #[must_use]
    pub fn is_visible(&self, instance: &MeshInstance) -> bool {
        instance.visible_frame == self.frame
    }

    /// Skin mode requested for a pass, before per-instance palette limits.
    #[must_use]
    pub fn pass_skin_mode<B: RenderBackend + ?Sized>(&self, pass: &TrackedPass<'_, B>) -> SkinMode {
        if self.settings.hardware_skinning && pass.supports_hardware_skinning() {
            SkinMode::Hardware
        } else {
            SkinMode::Software
        }
    }

    /// Draws every face of `bucket` in list order.
    pub fn draw_bucket<B: RenderBackend + ?Sized>(
        &mut self,
        pass: &mut TrackedPass<'_, B>,
        bucket: BucketId,
        style: &FaceStyle,
    ) {
        let buckets = self.buckets;
        for &key in buckets.faces(bucket) {
            self.draw_face(pass, key, style);
        }
    }

    /// Brings one face's buffer up to date and draws it.
    ///
    /// Faces whose instance is gone, hidden, quarantined or impostored are
    /// skipped; that can change between passes of the same frame.
    pub fn draw_face<B: RenderBackend + ?Sized>(
        &mut self,
        pass: &mut TrackedPass<'_, B>,
        key: FaceKey,
        style: &FaceStyle,
    ) {
        let Some(face) = self.faces.get(key) else {
            self.stats.faces_skipped += 1;
            return;
        };
        if !(style.accepts)(face.material.alpha_mode) {
            return;
        }
        let owner = face.owner;
        let (vertex_count, index_count) = (face.vertex_count, face.index_count);

        let Some(instance) = self.instances.get(owner) else {
            self.stats.faces_skipped += 1;
            return;
        };
        let live = instance.is_drawable()
            && self.is_visible(instance)
            && (self.settings.impostor_render || !instance.is_impostored());
        if !live {
            self.stats.faces_skipped += 1;
            return;
        }
        let skinned = instance.skin.is_some();
        let skin_stamp = instance.skin_stamp();

        // Skin mode: pass-level request, narrowed per instance by palette size.
        let mut hardware = false;
        if skinned {
            self.ensure_pose(owner);
            let joints = self
                .instances
                .get(owner)
                .and_then(|i| i.pose_cache.as_ref())
                .map_or(0, |p| p.palette.len());
            let wants_hardware = style.skin_mode == SkinMode::Hardware;
            hardware = wants_hardware && joints <= self.settings.max_gpu_joints;
            if wants_hardware && !hardware {
                self.warn_oversized(owner, joints);
            }
        }

        let Some(face) = self.faces.get_mut(key) else {
            return;
        };
        let mask = VertexDataMask::for_face(face.role, &face.material, hardware);
        match self.geometry.ensure_geometry(face, mask, vertex_count, index_count) {
            EnsureOutcome::Reused => {}
            EnsureOutcome::Allocated => self.stats.buffers_allocated += 1,
            EnsureOutcome::Resized => self.stats.buffers_resized += 1,
            EnsureOutcome::Degenerate { quarantine, .. } => {
                self.stats.degenerate_substitutions += 1;
                if quarantine {
                    self.quarantine(owner);
                }
                return;
            }
        }

        let Some(face) = self.faces.get_mut(key) else {
            return;
        };
        if skinned && !hardware && face.skinned_at != Some(skin_stamp) {
            face.mark_dirty(FaceDirty::SKIN);
        }
        if hardware && face.skinned_at.take().is_some() {
            // back to bind-shape positions
            face.mark_dirty(FaceDirty::SKIN);
        }
        let baking = skinned && !hardware && face.dirty.intersects(FaceDirty::SKIN);

        let instance = self.instances.get(owner);
        let pose = instance.and_then(|i| i.pose_cache.as_ref());
        let binding = instance.and_then(|i| i.skin.as_deref());
        let inputs = match (pose, binding) {
            (Some(pose), Some(binding)) => SkinInputs {
                bind_shape: &pose.bind_shape,
                weights: binding.scrubbed_weights(face.face_index),
                palette: (!hardware).then_some(&pose.palette),
            },
            _ => SkinInputs::RIGID,
        };

        if let Err(error) = write_geometry(face, &inputs, self.geometry.counters_mut()) {
            self.geometry.substitute_degenerate(face, error);
            self.stats.degenerate_substitutions += 1;
            self.quarantine(owner);
            return;
        }
        if baking {
            face.skinned_at = Some(skin_stamp);
            self.stats.software_bakes += 1;
        }

        let Some(buffer) = face.buffer.as_ref() else {
            return;
        };

        let (base_shader, base_cutoff) = match pass.config() {
            Some(config) => (config.shader, config.alpha_cutoff),
            None => return,
        };
        let mut shader = base_shader.with_hardware_skinning(hardware);
        if style.material_shaders
            && let Some(slot) = face.bucket
            && let BucketId::Material(material_slot) = slot.bucket
        {
            shader.program = ShaderProgram::Material(material_slot);
        }
        pass.set_shader(shader);

        if hardware && let Some(pose) = pose {
            pass.upload_palette(owner, &pose.rows);
        }

        let material = &face.material;
        match style.textures {
            TextureUse::None => {}
            TextureUse::Diffuse => {
                pass.set_texture(TextureChannel::Diffuse, material.diffuse);
            }
            TextureUse::Material => {
                pass.set_texture(TextureChannel::Diffuse, material.diffuse);
                pass.set_texture(TextureChannel::Normal, material.normal_map);
                pass.set_texture(TextureChannel::Specular, material.specular_map);
            }
        }

        let cutoff = if material.alpha_mode == AlphaMode::Mask {
            style.mask_cutoff.or(base_cutoff)
        } else {
            base_cutoff
        };
        pass.set_alpha_cutoff(cutoff);

        pass.draw(buffer, 0..buffer.index_count());
        self.stats.faces_drawn += 1;
    }

    /// Rebuilds the instance's palette when its pose stamp moved on since
    /// the cached one was built.
    fn ensure_pose(&mut self, owner: InstanceKey) {
        let Some(instance) = self.instances.get_mut(owner) else {
            return;
        };
        let stamp = instance.pose_tracker.stamp();
        if instance.pose_cache.as_ref().is_some_and(|c| c.stamp == stamp) {
            return;
        }
        let Some(binding) = instance.skin.as_ref() else {
            return;
        };

        let palette = self.palette_builder.build(&instance.pose, binding);
        let rows = palette.to_gpu_rows();
        let bind_shape = BindShape::new(binding.bind_shape);
        instance.pose_cache = Some(PoseCache {
            stamp,
            palette,
            rows,
            bind_shape,
        });
        self.stats.palettes_built += 1;
    }

    fn warn_oversized(&mut self, owner: InstanceKey, joints: usize) {
        let Some(binding) = self.instances.get(owner).and_then(|i| i.skin.as_ref()) else {
            return;
        };
        if self.oversized_warned.insert(binding.id) {
            log::warn!(
                "Skin binding {}: {joints} joints exceed the shader limit of {}, skinning on the CPU",
                binding.id,
                self.settings.max_gpu_joints
            );
        }
    }

    /// Flags `owner` as quarantined and notifies the sink, once per instance.
    pub(crate) fn quarantine(&mut self, owner: InstanceKey) {
        let Some(instance) = self.instances.get_mut(owner) else {
            return;
        };
        if instance.quarantined {
            return;
        }
        instance.quarantined = true;
        self.stats.quarantined += 1;
        if let Some(sink) = self.sink.as_mut() {
            sink.quarantine(owner);
        }
    }
}
