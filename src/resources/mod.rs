//! Resource Module
//!
//! Read-only asset-side data consumed by the pipeline:
//!
//! - [`MaterialSignature`]: what a face looks like, for bucketing and color writes
//! - [`FaceGeometry`]: rest-pose vertices and the fixed triangle list of a face
//! - [`SkinBinding`]: bind-shape matrix, joint list and per-vertex weights
//! - [`Stamp`] / [`ChangeTracker`]: monotonic change stamps

pub mod geometry;
pub mod material;
pub mod skin;
pub mod version_tracker;

pub use geometry::{FaceGeometry, PlanarProjection, TextureTransform};
pub use material::{AlphaMode, FaceRole, MaterialSignature, TextureId};
pub use skin::{JointWeights, SkinBinding};
pub use version_tracker::{ChangeTracker, Stamp};
