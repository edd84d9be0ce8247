//! Core types, configuration, and error handling for Parrot.
//!
//! This crate provides the shared foundation used by all other Parrot crates:
//! - [`ParrotError`]: unified error type using `thiserror` and `miette`
//! - [`ParrotConfig`]: configuration loaded from `.parrot.toml`
//! - Shared types: [`BranchDiff`], [`FileDiff`], [`BranchComparison`],
//!   [`RepoCoordinates`], [`MatchMode`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    CohortConfig, CompareConfig, GitHubConfig, ParrotConfig, ReportConfig, RetryConfig,
};
pub use error::ParrotError;
pub use types::{
    BranchComparison, BranchDiff, FileDiff, FileOverlap, MatchMode, OutputFormat,
    RepoCoordinates,
};

/// A convenience `Result` type for Parrot operations.
pub type Result<T> = std::result::Result<T, ParrotError>;
