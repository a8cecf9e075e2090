#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod utils;

pub use errors::{Result, RiggedError};
pub use renderer::backend::{RenderBackend, ShaderKey, ShaderProgram, TextureChannel};
pub use renderer::buckets::{BucketId, BucketRegistry};
pub use renderer::geometry::{GeometryBuffer, GeometryManager, VertexDataMask};
pub use renderer::graph::{PassId, ShadowContent, ShadowPassId, ShadowTarget};
pub use renderer::recorder::{BackendCommand, CommandRecorder, DrawRecord};
pub use renderer::settings::{RiggedSettings, ShadingPath};
pub use renderer::skinning::SkinMode;
pub use renderer::stats::FrameStats;
pub use renderer::{QuarantineSink, RiggedRenderer};
pub use resources::{
    AlphaMode, FaceGeometry, FaceRole, JointWeights, MaterialSignature, PlanarProjection,
    SkinBinding, TextureId, TextureTransform,
};
pub use scene::{FaceDesc, FaceKey, Impostor, InstanceKey, SkeletonPose};
pub use utils::interner;
