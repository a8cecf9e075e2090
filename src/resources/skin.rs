use std::sync::OnceLock;

use bytemuck::{Pod, Zeroable};
use glam::Affine3A;
use uuid::Uuid;

use crate::utils::interner::{self, Symbol};

/// Up to four (joint index, weight) influences of one vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct JointWeights {
    pub joints: [u16; 4],
    pub weights: [f32; 4],
}

impl JointWeights {
    /// A vertex fully bound to one joint.
    #[must_use]
    pub const fn single(joint: u16) -> Self {
        Self {
            joints: [joint, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    #[must_use]
    pub const fn new(joints: [u16; 4], weights: [f32; 4]) -> Self {
        Self { joints, weights }
    }

    #[inline]
    #[must_use]
    pub fn total(&self) -> f32 {
        self.weights.iter().sum()
    }

    /// Scrubs the quadruple against a skeleton with `joint_count` joints.
    ///
    /// Out-of-range joints lose their influence, non-finite or negative
    /// weights are zeroed, the rest is renormalised to sum to one. A vertex
    /// left without influence is bound fully to joint 0.
    #[must_use]
    pub fn scrubbed(mut self, joint_count: usize) -> Self {
        for (joint, weight) in self.joints.iter_mut().zip(self.weights.iter_mut()) {
            if usize::from(*joint) >= joint_count || !weight.is_finite() || *weight < 0.0 {
                *joint = 0;
                *weight = 0.0;
            }
        }

        let total = self.total();
        if total <= f32::EPSILON {
            return Self::single(0);
        }
        for weight in &mut self.weights {
            *weight /= total;
        }
        self
    }
}

/// Immutable skinning data of one mesh asset.
///
/// Shared by every face (and every instance) of the asset; owned by the
/// asset cache and referenced here through an `Arc`.
#[derive(Debug)]
pub struct SkinBinding {
    /// Mesh asset id, used to key one-time diagnostics.
    pub id: Uuid,
    /// Maps the authored rest pose into skeleton rest space.
    pub bind_shape: Affine3A,
    /// Ordered joint list; joint `i` of a weight quadruple refers to `joints[i]`.
    pub joints: Vec<Symbol>,
    /// Inverse bind matrix per joint.
    pub inverse_binds: Vec<Affine3A>,

    /// Per-face, per-vertex weights as decoded.
    face_weights: Vec<Vec<JointWeights>>,
    /// Scrubbed copy, built lazily the first time the binding is skinned.
    scrubbed: OnceLock<Vec<Vec<JointWeights>>>,
}

impl SkinBinding {
    /// Creates a binding. Missing inverse bind matrices default to identity.
    #[must_use]
    pub fn new(
        id: Uuid,
        bind_shape: Affine3A,
        joint_names: &[&str],
        mut inverse_binds: Vec<Affine3A>,
        face_weights: Vec<Vec<JointWeights>>,
    ) -> Self {
        let joints: Vec<Symbol> = joint_names.iter().map(|name| interner::intern(name)).collect();
        inverse_binds.resize(joints.len(), Affine3A::IDENTITY);

        Self {
            id,
            bind_shape,
            joints,
            inverse_binds,
            face_weights,
            scrubbed: OnceLock::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Weights exactly as decoded, before scrubbing.
    #[must_use]
    pub fn raw_weights(&self, face_index: usize) -> Option<&[JointWeights]> {
        self.face_weights.get(face_index).map(Vec::as_slice)
    }

    /// Whether the lazy scrub has already run.
    #[must_use]
    pub fn is_scrubbed(&self) -> bool {
        self.scrubbed.get().is_some()
    }

    /// Scrubbed weights of one face. The whole binding is scrubbed once, on
    /// the first call.
    #[must_use]
    pub fn scrubbed_weights(&self, face_index: usize) -> Option<&[JointWeights]> {
        let scrubbed = self.scrubbed.get_or_init(|| {
            let joint_count = self.joint_count();
            let mut invalid = 0usize;
            let result: Vec<Vec<JointWeights>> = self
                .face_weights
                .iter()
                .map(|weights| {
                    weights
                        .iter()
                        .map(|w| {
                            let clean = w.scrubbed(joint_count);
                            if clean != *w {
                                invalid += 1;
                            }
                            clean
                        })
                        .collect()
                })
                .collect();
            if invalid > 0 {
                log::debug!(
                    "Skin binding {}: scrubbed {invalid} weight quadruples against {joint_count} joints",
                    self.id
                );
            }
            result
        });
        scrubbed.get(face_index).map(Vec::as_slice)
    }
}
