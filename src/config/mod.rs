//! # Configuration Module
//!
//! Centralizes every tunable constant in leafdb. Constants are grouped by
//! subsystem, and values that depend on each other live next to their
//! compile-time consistency checks instead of being scattered across the
//! modules that consume them.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency
//!   documentation and `const` assertions.

pub mod constants;
pub use constants::*;
