//! Diff acquisition from git hosting providers.
//!
//! Provides the [`provider::GitProvider`] seam, the GitHub implementation in
//! [`client`], and the [`fetch::DiffFetcher`] that turns a provider
//! comparison into a normalized [`parrot_core::BranchDiff`], waiting out
//! secondary rate limits under a bounded retry policy.

pub mod client;
pub mod fetch;
pub mod provider;
