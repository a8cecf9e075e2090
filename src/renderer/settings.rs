//! Rigged Pipeline Settings & Shading Path Configuration
//!
//! The core switch is [`ShadingPath`], which selects the forward pass
//! sequence or the deferred one (G-buffer passes followed by the forward
//! post-deferred passes).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_rigged::{RiggedSettings, ShadingPath};
//!
//! // Default: deferred shading with hardware skinning
//! let settings = RiggedSettings::default();
//!
//! // Forward shading, CPU skinning only
//! let settings = RiggedSettings {
//!     shading: ShadingPath::Forward,
//!     hardware_skinning: false,
//!     ..Default::default()
//! };
//! settings.validate()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RiggedError};

// ---------------------------------------------------------------------------
// ShadingPath
// ---------------------------------------------------------------------------

/// Which pass sequence runs each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadingPath {
    /// Single forward sequence; advanced materials are drawn inside the
    /// simple and alpha passes.
    Forward,
    /// G-buffer passes for opaque content, with one pass per material slot,
    /// then forward passes for fullbright, shiny, alpha and glow content.
    #[default]
    Deferred,
}

impl ShadingPath {
    #[inline]
    #[must_use]
    pub fn is_deferred(self) -> bool {
        matches!(self, Self::Deferred)
    }
}

// ---------------------------------------------------------------------------
// RiggedSettings
// ---------------------------------------------------------------------------

/// Configuration of the rigged mesh pipeline.
///
/// # Fields
///
/// | Field                     | Description                                   | Default    |
/// |---------------------------|-----------------------------------------------|------------|
/// | `shading`                 | Forward or deferred pass sequence             | `Deferred` |
/// | `hardware_skinning`       | Matrix-palette skinning in the vertex shader  | `true`     |
/// | `max_gpu_joints`          | Longest palette the shader can take           | `110`      |
/// | `impostor_render`         | Rendering into impostor textures              | `false`    |
/// | `shadow_supports_blend`   | Shadow technique handles alpha blending       | `false`    |
/// | `render_glow`             | Glow pass draws emissive content              | `true`     |
/// | `max_vertices_per_buffer` | Hard per-buffer vertex ceiling                | `65536`    |
/// | `geometry_budget_bytes`   | Geometry memory budget                        | 256 MiB    |
/// | `alpha_mask_cutoff`       | Alpha test threshold for masked faces         | `0.5`      |
/// | `shadow_alpha_cutoff`     | Alpha test threshold in shadow passes         | `0.6`      |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiggedSettings {
    // === Pass Sequence ===
    pub shading: ShadingPath,

    /// Request shader-side skinning.
    ///
    /// Honoured per pass only when the backend supports it, and per
    /// instance only when its palette fits in `max_gpu_joints`.
    pub hardware_skinning: bool,

    pub max_gpu_joints: usize,

    /// Set while baking impostor textures: the impostor and rigid passes
    /// are skipped and impostored instances are drawn live.
    pub impostor_render: bool,

    pub shadow_supports_blend: bool,

    pub render_glow: bool,

    // === Geometry Buffers ===
    /// Vertex ceiling per face buffer; 16-bit indices cannot address more.
    pub max_vertices_per_buffer: u32,

    /// Bytes all face buffers together may occupy. Exceeding it is treated
    /// exactly like an allocation failure.
    pub geometry_budget_bytes: u64,

    // === Alpha Testing ===
    pub alpha_mask_cutoff: f32,

    pub shadow_alpha_cutoff: f32,
}

/// Vertex ceiling imposed by 16-bit indices.
pub const MAX_VERTICES_PER_BUFFER: u32 = 65536;

impl Default for RiggedSettings {
    fn default() -> Self {
        Self {
            shading: ShadingPath::default(),
            hardware_skinning: true,
            max_gpu_joints: 110,
            impostor_render: false,
            shadow_supports_blend: false,
            render_glow: true,
            max_vertices_per_buffer: MAX_VERTICES_PER_BUFFER,
            geometry_budget_bytes: 256 * 1024 * 1024,
            alpha_mask_cutoff: 0.5,
            shadow_alpha_cutoff: 0.6,
        }
    }
}

impl RiggedSettings {
    /// Rejects settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_vertices_per_buffer == 0 || self.max_vertices_per_buffer > MAX_VERTICES_PER_BUFFER {
            return Err(RiggedError::InvalidSettings(format!(
                "max_vertices_per_buffer must be in 1..={MAX_VERTICES_PER_BUFFER}, got {}",
                self.max_vertices_per_buffer
            )));
        }
        for (name, cutoff) in [
            ("alpha_mask_cutoff", self.alpha_mask_cutoff),
            ("shadow_alpha_cutoff", self.shadow_alpha_cutoff),
        ] {
            if !(0.0..=1.0).contains(&cutoff) {
                return Err(RiggedError::InvalidSettings(format!(
                    "{name} must be in 0..=1, got {cutoff}"
                )));
            }
        }
        if self.hardware_skinning && self.max_gpu_joints == 0 {
            return Err(RiggedError::InvalidSettings(
                "max_gpu_joints must be non-zero with hardware skinning".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RiggedSettings::default().validate().is_ok());
    }

    #[test]
    fn rejects_ceiling_above_index_range() {
        let settings = RiggedSettings {
            max_vertices_per_buffer: MAX_VERTICES_PER_BUFFER + 1,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(RiggedError::InvalidSettings(_))));
    }

    #[test]
    fn rejects_nan_cutoff() {
        let settings = RiggedSettings {
            alpha_mask_cutoff: f32::NAN,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
