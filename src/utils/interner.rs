//! Global joint-name interner.
//!
//! Skeleton poses and skin bindings refer to joints by name. Names are
//! interned once into compact [`Symbol`]s so that per-frame palette building
//! hashes and compares integers instead of strings.

use lasso::{Spur, ThreadedRodeo};
use once_cell::sync::Lazy;

static INTERNER: Lazy<ThreadedRodeo> = Lazy::new(ThreadedRodeo::new);

/// Compact integer identifier of an interned string.
pub type Symbol = Spur;

/// Interns a string, returning its symbol.
///
/// Returns the existing symbol if the string was interned before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the symbol of an already interned string without allocating.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the standard avatar skeleton joint names.
///
/// Called once when the renderer is created so that the first frame does not
/// pay for interning on the hot path.
pub fn preload_avatar_joints() {
    let common = [
        "mPelvis",
        "mTorso",
        "mChest",
        "mNeck",
        "mHead",
        "mSkull",
        "mEyeLeft",
        "mEyeRight",
        "mCollarLeft",
        "mShoulderLeft",
        "mElbowLeft",
        "mWristLeft",
        "mCollarRight",
        "mShoulderRight",
        "mElbowRight",
        "mWristRight",
        "mHipLeft",
        "mKneeLeft",
        "mAnkleLeft",
        "mFootLeft",
        "mToeLeft",
        "mHipRight",
        "mKneeRight",
        "mAnkleRight",
        "mFootRight",
        "mToeRight",
    ];

    for name in common {
        intern(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let s1 = intern("mPelvis");
        let s2 = intern("mPelvis");
        let s3 = intern("mTorso");

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);

        assert_eq!(resolve(s1), "mPelvis");
        assert_eq!(resolve(s3), "mTorso");
    }

    #[test]
    fn test_get() {
        let _ = intern("mHead");

        assert!(get("mHead").is_some());
        assert!(get("mNotAJoint_xyz").is_none());
    }
}
