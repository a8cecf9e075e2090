//! Error Types
//!
//! This module defines the error types used throughout the rigged pipeline.
//!
//! # Overview
//!
//! The main error type [`RiggedError`] covers the failure modes that can
//! occur *inside* a frame:
//! - Malformed face geometry (negative, zero or oversized counts, bad indices)
//! - Geometry buffer budget exhaustion (the "out of GPU memory" case)
//! - Misuse of the face bucket registry
//! - Stale instance / face keys and invalid settings
//!
//! None of these cross the frame boundary. The pass scheduler recovers from
//! geometry errors with a degenerate buffer and from registry misuse with a
//! no-op; callers only see [`Result`] from the scene-facing API.

use thiserror::Error;

/// The main error type for the rigged pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiggedError {
    // ========================================================================
    // Geometry Errors
    // ========================================================================
    /// The reported vertex/index counts cannot be turned into a valid buffer.
    #[error("Malformed geometry ({vertex_count} vertices, {index_count} indices): {reason}")]
    MalformedGeometry {
        /// Vertex count as reported by the asset
        vertex_count: i64,
        /// Index count as reported by the asset
        index_count: i64,
        /// Human readable cause
        reason: &'static str,
    },

    /// An index references a vertex outside the face's vertex range.
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// The offending (base-offset) index
        index: u32,
        /// Number of vertices in the face
        vertex_count: u32,
    },

    /// Allocating or growing a geometry buffer would exceed the memory budget.
    #[error("Geometry buffer budget exceeded: requested {requested} bytes, {available} available")]
    BufferBudgetExceeded {
        /// Bytes the allocation needs
        requested: u64,
        /// Bytes left in the budget
        available: u64,
    },

    // ========================================================================
    // Scene & Registry Errors
    // ========================================================================
    /// The mesh instance key is stale or was never issued.
    #[error("Unknown mesh instance")]
    UnknownInstance,

    /// The face key is stale or was never issued.
    #[error("Unknown mesh face")]
    UnknownFace,

    /// The face is already a member of a bucket.
    #[error("Face is already registered in bucket {0}")]
    AlreadyRegistered(&'static str),

    /// The face is not a member of any bucket.
    #[error("Face is not registered in any bucket")]
    NotRegistered,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Alias for `Result<T, RiggedError>`.
pub type Result<T> = std::result::Result<T, RiggedError>;
