//! Rigged Mesh Renderer
//!
//! [`RiggedRenderer`] owns the face and instance arenas, the bucket
//! registry and the geometry manager, and drives the pass sequence against
//! a [`RenderBackend`].
//!
//! # Frame Flow
//!
//! ```text
//! scene layer ── add_face / set_material ──► BucketRegistry (classify + register)
//!             ── set_pose ─────────────────► MeshInstance (pose stamp)
//!
//! render_frame(visible, backend):
//!   for pass in schedule:
//!     begin ─► for face in pass buckets:
//!                ensure_geometry ─► write_geometry (dirty sub-steps only)
//!                palette upload / software bake ─► draw_range
//!     end
//! ```

pub mod backend;
pub mod buckets;
pub mod geometry;
pub mod graph;
pub mod recorder;
pub mod settings;
pub mod skinning;
pub mod stats;

use std::sync::Arc;

use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use uuid::Uuid;

use crate::errors::{Result, RiggedError};
use crate::renderer::backend::RenderBackend;
use crate::renderer::buckets::{BucketId, BucketRegistry};
use crate::renderer::geometry::GeometryManager;
use crate::renderer::graph::context::FrameContext;
use crate::renderer::graph::passes::{self, PassId, SHADOW_PASSES};
use crate::renderer::settings::RiggedSettings;
use crate::renderer::stats::FrameStats;
use crate::resources::{
    FaceGeometry, MaterialSignature, PlanarProjection, SkinBinding, TextureId, TextureTransform,
};
use crate::scene::{
    FaceDesc, FaceDirty, FaceKey, Impostor, InstanceKey, MeshFace, MeshInstance, PaletteBuilder,
    SkeletonPose,
};
use crate::utils::interner;

/// Receives instances whose geometry turned out to be unrecoverable.
///
/// Called at most once per instance. The renderer only stops drawing the
/// instance; removing it is the scene layer's job.
pub trait QuarantineSink {
    fn quarantine(&mut self, instance: InstanceKey);
}

impl<F: FnMut(InstanceKey)> QuarantineSink for F {
    fn quarantine(&mut self, instance: InstanceKey) {
        self(instance);
    }
}

pub struct RiggedRenderer {
    settings: RiggedSettings,

    instances: SlotMap<InstanceKey, MeshInstance>,
    faces: SlotMap<FaceKey, MeshFace>,
    buckets: BucketRegistry,
    geometry: GeometryManager,
    palette_builder: PaletteBuilder,

    sink: Option<Box<dyn QuarantineSink>>,
    oversized_warned: FxHashSet<Uuid>,
    environment: Option<TextureId>,

    frame: u64,
    last_stats: FrameStats,
}

impl RiggedRenderer {
    pub fn new(settings: RiggedSettings) -> Result<Self> {
        settings.validate()?;
        interner::preload_avatar_joints();
        log::info!(
            "Rigged renderer: {:?} shading, hardware skinning {}, {} vertices per buffer",
            settings.shading,
            settings.hardware_skinning,
            settings.max_vertices_per_buffer
        );

        Ok(Self {
            geometry: GeometryManager::new(
                settings.max_vertices_per_buffer,
                settings.geometry_budget_bytes,
            ),
            settings,
            instances: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            buckets: BucketRegistry::new(),
            palette_builder: PaletteBuilder::new(),
            sink: None,
            oversized_warned: FxHashSet::default(),
            environment: None,
            frame: 0,
            last_stats: FrameStats::default(),
        })
    }

    // === Configuration ===

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RiggedSettings {
        &self.settings
    }

    /// Replaces the settings. Buffers whose layout no longer matches are
    /// reallocated when next drawn.
    pub fn set_settings(&mut self, settings: RiggedSettings) -> Result<()> {
        settings.validate()?;
        self.geometry
            .set_limits(settings.max_vertices_per_buffer, settings.geometry_budget_bytes);
        self.settings = settings;
        Ok(())
    }

    pub fn set_quarantine_sink(&mut self, sink: impl QuarantineSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Environment map bound by the shiny passes.
    pub fn set_environment_map(&mut self, texture: Option<TextureId>) {
        self.environment = texture;
    }

    // === Instances ===

    pub fn add_instance(&mut self, skin: Option<Arc<SkinBinding>>) -> InstanceKey {
        self.instances.insert(MeshInstance::new(skin))
    }

    /// Removes an instance with all its faces, releasing their buffers.
    pub fn remove_instance(&mut self, key: InstanceKey) -> Result<()> {
        let instance = self.instances.remove(key).ok_or(RiggedError::UnknownInstance)?;
        for face in instance.faces {
            self.destroy_face(face);
        }
        Ok(())
    }

    #[must_use]
    pub fn instance(&self, key: InstanceKey) -> Option<&MeshInstance> {
        self.instances.get(key)
    }

    /// Whether the instance can be drawn at all. Unknown keys are not.
    #[must_use]
    pub fn is_drawable(&self, key: InstanceKey) -> bool {
        self.instances.get(key).is_some_and(MeshInstance::is_drawable)
    }

    /// Replaces the skeleton pose and issues a new pose stamp.
    pub fn set_pose(&mut self, key: InstanceKey, pose: SkeletonPose) -> Result<()> {
        let instance = self.instances.get_mut(key).ok_or(RiggedError::UnknownInstance)?;
        instance.pose = pose;
        instance.pose_tracker.changed();
        Ok(())
    }

    pub fn set_impostor(&mut self, key: InstanceKey, impostor: Option<Impostor>) -> Result<()> {
        let instance = self.instances.get_mut(key).ok_or(RiggedError::UnknownInstance)?;
        instance.impostor = impostor;
        Ok(())
    }

    /// Switches between the impostor billboard and the live meshes.
    pub fn set_impostor_active(&mut self, key: InstanceKey, active: bool) -> Result<()> {
        let instance = self.instances.get_mut(key).ok_or(RiggedError::UnknownInstance)?;
        instance.impostor_active = active;
        Ok(())
    }

    // === Faces ===

    /// Creates a face on `instance` and registers it in its bucket.
    pub fn add_face(&mut self, instance: InstanceKey, desc: FaceDesc) -> Result<FaceKey> {
        let owner = self
            .instances
            .get_mut(instance)
            .ok_or(RiggedError::UnknownInstance)?;
        let key = self.faces.insert(MeshFace::new(instance, desc));
        owner.faces.push(key);
        owner.topology_tracker.changed();

        self.buckets.add_face(&mut self.faces, key)?;
        Ok(key)
    }

    pub fn remove_face(&mut self, key: FaceKey) -> Result<()> {
        let owner = self.faces.get(key).ok_or(RiggedError::UnknownFace)?.owner;
        if let Some(instance) = self.instances.get_mut(owner) {
            instance.faces.retain(|&f| f != key);
            instance.topology_tracker.changed();
        }
        self.destroy_face(key);
        Ok(())
    }

    #[must_use]
    pub fn face(&self, key: FaceKey) -> Option<&MeshFace> {
        self.faces.get(key)
    }

    /// Changes a face's material. Color and glow edits only dirty the color
    /// sub-step; a different bucket moves the face.
    pub fn set_material(&mut self, key: FaceKey, material: MaterialSignature) -> Result<BucketId> {
        let face = self.faces.get_mut(key).ok_or(RiggedError::UnknownFace)?;
        if face.material.color_differs(&material) {
            face.mark_dirty(FaceDirty::COLOR);
        }
        face.material = material;
        self.buckets.reclassify(&mut self.faces, key)
    }

    pub fn set_texture_transform(&mut self, key: FaceKey, transform: TextureTransform) -> Result<()> {
        let face = self.faces.get_mut(key).ok_or(RiggedError::UnknownFace)?;
        if face.texture_transform != transform {
            face.texture_transform = transform;
            face.mark_dirty(FaceDirty::TEXCOORD);
        }
        Ok(())
    }

    pub fn set_planar_projection(
        &mut self,
        key: FaceKey,
        planar: Option<PlanarProjection>,
    ) -> Result<()> {
        let face = self.faces.get_mut(key).ok_or(RiggedError::UnknownFace)?;
        if face.planar != planar {
            face.planar = planar;
            face.mark_dirty(FaceDirty::TEXCOORD);
        }
        Ok(())
    }

    /// Swaps in new rest-pose geometry (e.g. a LOD switch). Counts default
    /// to the decoded ones.
    pub fn set_face_geometry(
        &mut self,
        key: FaceKey,
        geometry: Arc<FaceGeometry>,
        reported_counts: Option<(i64, i64)>,
    ) -> Result<()> {
        let face = self.faces.get_mut(key).ok_or(RiggedError::UnknownFace)?;
        let (vertex_count, index_count) = reported_counts.unwrap_or((
            geometry.vertex_count() as i64,
            geometry.index_count() as i64,
        ));
        face.geometry = geometry;
        face.vertex_count = vertex_count;
        face.index_count = index_count;
        face.skinned_at = None;
        face.mark_dirty(FaceDirty::REBUILD);

        if let Some(instance) = self.instances.get_mut(face.owner) {
            instance.topology_tracker.changed();
        }
        Ok(())
    }

    // === Inspection ===

    #[inline]
    #[must_use]
    pub fn buckets(&self) -> &BucketRegistry {
        &self.buckets
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &GeometryManager {
        &self.geometry
    }

    /// Checks the bucket registry against the face arena.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        self.buckets.check_invariants(&self.faces)
    }

    #[inline]
    #[must_use]
    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    // === Rendering ===

    /// Runs the full pass sequence for the current settings.
    pub fn render_frame<B: RenderBackend + ?Sized>(
        &mut self,
        visible: &[InstanceKey],
        backend: &mut B,
    ) -> FrameStats {
        let sequence = passes::schedule(&self.settings);
        self.render_passes(visible, sequence, backend)
    }

    /// Runs the six shadow passes.
    pub fn render_shadows<B: RenderBackend + ?Sized>(
        &mut self,
        visible: &[InstanceKey],
        backend: &mut B,
    ) -> FrameStats {
        let sequence = SHADOW_PASSES.map(PassId::Shadow);
        self.render_passes(visible, &sequence, backend)
    }

    /// Runs an explicit pass sequence.
    pub fn render_passes<B: RenderBackend + ?Sized>(
        &mut self,
        visible: &[InstanceKey],
        sequence: &[PassId],
        backend: &mut B,
    ) -> FrameStats {
        self.frame += 1;

        let mut ctx = FrameContext::new(
            &self.settings,
            &mut self.instances,
            &mut self.faces,
            &self.buckets,
            &mut self.geometry,
            &mut self.palette_builder,
            &mut self.sink,
            &mut self.oversized_warned,
            visible,
            self.environment,
            self.frame,
        );
        for &id in sequence {
            passes::run_pass(&mut ctx, backend, id);
        }

        let stats = ctx.stats;
        stats.log("rigged frame");
        self.last_stats = stats;
        stats
    }

    fn destroy_face(&mut self, key: FaceKey) {
        if self.faces.get(key).is_some_and(|f| f.bucket.is_some()) {
            let _ = self.buckets.remove_face(&mut self.faces, key);
        }
        if let Some(mut face) = self.faces.remove(key) {
            self.geometry.release(&mut face);
        }
    }
}
