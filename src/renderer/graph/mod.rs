//! Pass Scheduling
//!
//! - [`FrameContext`]: per-frame state shared by every pass
//! - [`TrackedPass`]: backend wrapper that skips redundant state changes
//! - [`passes`]: the pass identities, their fixed order and their `render` stages

pub mod context;
pub mod pass;
pub mod passes;

pub use context::{FaceStyle, FrameContext, TextureUse};
pub use pass::{PassConfig, TrackedPass};
pub use passes::{
    schedule, PassId, ShadowContent, ShadowPassId, ShadowTarget, DEFERRED_PASSES, FORWARD_PASSES,
    IMPOSTOR_PASS_OFFSET, SHADOW_PASSES,
};
