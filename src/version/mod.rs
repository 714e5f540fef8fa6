//! Version layer for container image update detection
//!
//! This module provides tag comparison, registry access and response caching.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│    Cache    │────▶│   Scanner   │
//! │  (fetch)    │     │ (TTL store) │     │ (crate::    │
//! └─────────────┘     └─────────────┘     │  scanner)   │
//!                                         └──────┬──────┘
//!                                                ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │   Suffix    │◀────│   SemVer    │
//!                     │ (-alpine..) │     │  (compare)  │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`semver`]: Tag normalization, tolerant parsing and update classification
//! - [`suffix`]: Base-image suffix detection (`-alpine`, `-slim`, ...)
//! - [`prerelease`]: Pre-release tag detection and filtering
//! - [`select`]: Tag ordering and best update candidate selection
//! - [`filter`]: Update filtering by severity, pre-release status and patterns
//! - [`registry`]: Registry client trait and registry lookup
//! - [`cache`]: In-memory TTL cache and the caching registry client
//! - [`error`]: Error types for registry and configuration

pub mod cache;
pub mod error;
pub mod filter;
pub mod prerelease;
pub mod registry;
pub mod select;
pub mod semver;
pub mod suffix;
