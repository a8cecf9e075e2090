//! Utility Module
//!
//! - [`interner`]: joint-name interning for cheap pose lookups
//!
//! ```rust,ignore
//! use myth_rigged::utils::interner;
//!
//! let a = interner::intern("mPelvis");
//! let b = interner::intern("mPelvis");
//! assert_eq!(a, b); // O(1) comparison
//! ```

pub mod interner;

pub use interner::Symbol;
