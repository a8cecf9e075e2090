/// Counters of one rendered frame (or one shadow render).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub passes: u32,
    pub draw_calls: u32,
    pub triangles: u64,
    pub faces_drawn: u32,
    /// Faces skipped because their instance was gone, hidden, quarantined
    /// or impostored.
    pub faces_skipped: u32,
    pub software_bakes: u32,
    pub palettes_built: u32,
    pub palette_uploads: u32,
    pub buffers_allocated: u32,
    pub buffers_resized: u32,
    pub degenerate_substitutions: u32,
    /// Instances handed to the quarantine sink this frame.
    pub quarantined: u32,
}

impl FrameStats {
    pub(crate) fn log(&self, label: &str) {
        log::trace!(
            "{label}: {} passes, {} draws, {} tris, {} faces drawn, {} skipped, {} bakes, {} palettes ({} uploads), {} alloc, {} resize, {} degenerate, {} quarantined",
            self.passes,
            self.draw_calls,
            self.triangles,
            self.faces_drawn,
            self.faces_skipped,
            self.software_bakes,
            self.palettes_built,
            self.palette_uploads,
            self.buffers_allocated,
            self.buffers_resized,
            self.degenerate_substitutions,
            self.quarantined,
        );
    }
}
