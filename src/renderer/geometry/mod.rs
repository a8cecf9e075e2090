//! Geometry Buffer Manager
//!
//! - [`buffer`]: the per-face [`GeometryBuffer`] and its [`VertexDataMask`] layout
//! - [`manager`]: allocation, in-place resize and degenerate substitution
//! - [`writer`]: dirty-flag gated vertex/index writes
//! - [`texcoord`]: texture transform and planar projection

pub mod buffer;
pub mod manager;
pub mod texcoord;
pub mod writer;

pub use buffer::{
    align_vertices, GeometryBuffer, VertexDataMask, DEGENERATE_INDEX_COUNT,
    DEGENERATE_VERTEX_CAPACITY, VERTEX_ALIGNMENT,
};
pub use manager::{BufferStats, EnsureOutcome, GeometryManager};
pub use texcoord::{planar_projection, transform_texcoords, transform_texcoords_scalar};
pub use writer::{write_geometry, SkinInputs, WriteCounters};
