//! Posture evaluation.
//!
//! Landmark extraction and classification are external models; this module
//! holds their seams, the feature-vector contract, and the mapping from a
//! reading to a [`PostureVerdict`].

pub mod classifier;
pub mod extractor;
pub mod types;

pub use classifier::*;
pub use extractor::*;
pub use types::*;
