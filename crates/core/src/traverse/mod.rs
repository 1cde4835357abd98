// Closure and ordering walks over a RecordGraph.

pub mod ancestors;
pub mod descendants;
pub mod sort;

pub use ancestors::AncestorClosure;
pub use descendants::DescendantClosure;
pub use sort::{sequence, sequence_from, CycleReport, Sequence};

/// Maximum number of parent/offspring edges followed from each seed.
///
/// The seed sits at depth 0. An individual reached at the cap depth is
/// recorded but not expanded. A cap of 0 means unbounded.
///
/// Closures remember the [`GenerationCap::remaining`] budget each member
/// was expanded with, and expand it again when a later path reaches it
/// with more budget left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationCap(usize);

impl GenerationCap {
    pub fn new(generations: usize) -> Self {
        Self(generations)
    }

    pub fn unbounded() -> Self {
        Self(0)
    }

    pub fn generations(self) -> usize {
        self.0
    }

    pub fn is_bounded(self) -> bool {
        self.0 > 0
    }

    /// Generations still allowed below an individual at `depth`;
    /// `usize::MAX` when unbounded, 0 when it must not be expanded.
    pub fn remaining(self, depth: usize) -> usize {
        if self.is_bounded() {
            self.0.saturating_sub(depth)
        } else {
            usize::MAX
        }
    }
}
