//! Compute targets and the explicit retarget capability.
//!
//! Collaborators can own state (lookup tables, staging buffers) that no
//! generic traversal knows about, so moving a pipeline to another target
//! is an explicit call that each collaborator implements for itself.

use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ComputeTarget {
    #[default]
    Cpu,
    /// An accelerator, identified by backend ordinal.
    Device { ordinal: u32 },
}

impl fmt::Display for ComputeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Device { ordinal } => write!(f, "device:{ordinal}"),
        }
    }
}

/// Move everything a component owns to `target`.
pub trait Retarget {
    fn retarget(&mut self, target: &ComputeTarget);
}

impl<T: Retarget + ?Sized> Retarget for Box<T> {
    fn retarget(&mut self, target: &ComputeTarget) {
        (**self).retarget(target);
    }
}

// ===================================================================
// Tests
// ===================================================================
