use std::sync::atomic::{AtomicU64, Ordering};

/// Global monotonic stamp source.
///
/// Pose changes and topology changes both draw from the same counter, so two
/// different changes can never share a stamp value.
static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

/// A monotonic change stamp. `Stamp::NEVER` sorts before every issued stamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(u64);

impl Stamp {
    /// The stamp of something that has never changed (or never been built).
    pub const NEVER: Self = Self(0);

    /// Issues a fresh stamp, strictly greater than every stamp issued before.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_STAMP.fetch_add(1, Ordering::Relaxed))
    }
}

/// Change tracker: remembers the stamp of the latest modification.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeTracker {
    stamp: Stamp,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { stamp: Stamp::next() }
    }

    /// Marks as modified, issuing a new stamp.
    pub fn changed(&mut self) {
        self.stamp = Stamp::next();
    }

    /// Stamp of the latest modification.
    #[must_use]
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_strictly_increase() {
        let a = Stamp::next();
        let b = Stamp::next();
        assert!(b > a);
        assert!(a > Stamp::NEVER);
    }

    #[test]
    fn tracker_changes_stamp() {
        let mut tracker = ChangeTracker::new();
        let before = tracker.stamp();
        tracker.changed();
        assert!(tracker.stamp() > before);
    }
}
