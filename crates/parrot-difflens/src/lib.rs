//! Patch normalization for branch overlap scoring.
//!
//! Turns provider patch text into the ordered list of added lines a
//! [`parrot_core::FileDiff`] carries, and drops excluded files (manifests,
//! lockfiles, READMEs, configured patterns) before they reach the scorer.

pub mod filter;
pub mod patch;
