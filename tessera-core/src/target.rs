//! Compilation target description.

/// Describes the machine the pipeline compiles for.
///
/// The vectorizer accepts a target so that target-specific widening policy
/// (for example a maximum lane width) has a place to live; the current
/// rewrite rules do not consult it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    /// Widest SIMD lane count the target supports, when known.
    pub max_lanes: Option<u32>,
}

impl Target {
    /// The host target, with no lane-width constraint.
    pub fn host() -> Self {
        Target::default()
    }
}
