//! Scene-side data of the rigged pipeline.
//!
//! - [`MeshInstance`]: one avatar body or rigged attachment, owns its faces
//! - [`MeshFace`]: one textured surface region, owns its geometry buffer
//! - [`SkeletonPose`] / [`JointMatrixPalette`]: joint transforms and the
//!   per-frame matrices built from them
//!
//! Ownership flows strictly downward: instance → faces → buffer. Faces point
//! back at their instance through an [`InstanceKey`], never a reference.

pub mod face;
pub mod instance;
pub mod skeleton;

pub use face::{BucketSlot, FaceDesc, FaceDirty, MeshFace, SkinStamp};
pub use instance::{Impostor, MeshInstance};
pub(crate) use instance::PoseCache;
pub use skeleton::{JointMatrixPalette, JointRow, PaletteBuilder, SkeletonPose};

use slotmap::new_key_type;

new_key_type! {
    pub struct InstanceKey;
    pub struct FaceKey;
}
